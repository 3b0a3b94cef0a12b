//! `Sorted` executor (`spec.md` §4.7): a two-comparator sort over an
//! already-partially-ordered cursor. The inner stream is grouped by
//! `handled_ordering` (possibly empty); only runs with equal handled keys
//! need the remainder comparator.

use async_trait::async_trait;
use filter::FilterValues;
use futures::{stream, StreamExt};
use std::sync::Arc;

use super::{indent_str, sorted_compare, Executor};
use crate::error::PlanError;
use crate::ordering::OrderingList;
use crate::storage::{RecordStream, StorageError};
use crate::types::OrderingEntry;

/// Anything the sort stage can read ordering keys off of, to compare two
/// records without knowing their concrete type ahead of time.
pub trait Orderable {
    fn ordering_key(&self, path: &filter::PropertyPath) -> Option<filter::Value>;
}

pub struct Sorted<S> {
    inner: Arc<dyn Executor<S>>,
    handled_ordering: Vec<OrderingEntry>,
    remainder_ordering: Vec<OrderingEntry>,
}

impl<S> Sorted<S> {
    pub fn new(inner: Arc<dyn Executor<S>>, handled_ordering: Vec<OrderingEntry>, remainder_ordering: Vec<OrderingEntry>) -> Self {
        Self { inner, handled_ordering, remainder_ordering }
    }
}

#[async_trait]
impl<S> Executor<S> for Sorted<S>
where
    S: Orderable + Send + Sync + 'static,
{
    fn ordering(&self) -> OrderingList {
        let mut entries = self.handled_ordering.clone();
        entries.extend(self.remainder_ordering.iter().cloned());
        OrderingList::of(self.inner.ordering().type_name().to_string(), entries)
    }

    fn filter(&self) -> filter::Filter { self.inner.filter() }

    async fn fetch(&self, values: &FilterValues) -> Result<RecordStream<S>, PlanError<StorageError>> {
        let inner = self.inner.fetch(values).await?;
        let mut buffer: Vec<S> = Vec::new();
        let mut items = inner;
        while let Some(item) = items.next().await {
            buffer.push(item.map_err(|e| PlanError::Storage(e))?);
        }
        // The inner stream is already grouped by `handled_ordering`; folding
        // it back into the comparator (ahead of `remainder_ordering`) keeps
        // that grouping intact instead of relying on sort stability across
        // groups the remainder comparator alone can't see (`spec.md` §4.7:
        // "only runs with equal handled keys are sorted by the remainder
        // comparator").
        let mut entries = self.handled_ordering.clone();
        entries.extend(self.remainder_ordering.iter().cloned());
        buffer.sort_by(|a, b| sorted_compare(a, b, &entries));
        Ok(stream::iter(buffer.into_iter().map(Ok)).boxed())
    }

    async fn count(&self, values: &FilterValues) -> Result<Option<u64>, PlanError<StorageError>> { self.inner.count(values).await }

    fn print_plan(&self, indent: usize) -> String {
        let label = if self.handled_ordering.is_empty() { "full sort" } else { "sort" };
        format!("{}{}: \n{}", indent_str(indent), label, self.inner.print_plan(indent + 1))
    }
}
