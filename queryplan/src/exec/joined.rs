//! `Joined` executor (`spec.md` §4.7): a nested-loop join over an outer
//! executor on the referenced type. For each outer row, the internal-key
//! values of the join property are bound into the inner executor's
//! parameterized filter and fetched; outer and inner rows are merged into a
//! single target record by the embedder-supplied [`JoinAdapter`].

use async_trait::async_trait;
use filter::{Filter, FilterValues};
use futures::{stream, StreamExt};
use std::sync::Arc;

use super::{indent_str, Executor};
use crate::error::PlanError;
use crate::ordering::OrderingList;
use crate::storage::{RecordStream, StorageError};

/// Bridges the outer (referenced) and inner (target) record types across a
/// join property. Implemented by the embedder: this crate has no concrete
/// record model of its own (`spec.md` §1 "the concrete record model" is out
/// of scope).
pub trait JoinAdapter<Outer, Inner, Target>: Send + Sync {
    /// Bind the outer row's external-key values onto `base` at the
    /// parameter positions the inner executor's filter expects, producing
    /// the values vector for this outer row's inner fetch.
    fn bind_inner_values(&self, outer: &Outer, base: &FilterValues) -> FilterValues;

    /// Merge one outer row and one matching inner row into a target
    /// record. `spec.md` §4.7: "If the target type's join property is
    /// writable, the join stage stashes the active outer record into the
    /// target record so downstream consumers observe a fully populated
    /// graph" — `outer` is passed by reference so an adapter can stash a
    /// clone into each combined record.
    fn combine(&self, outer: &Outer, inner: Inner) -> Target;
}

pub struct Joined<S, Outer, Inner> {
    target_type_name: String,
    join_prop: String,
    outer: Arc<dyn Executor<Outer>>,
    inner: Arc<dyn Executor<Inner>>,
    adapter: Arc<dyn JoinAdapter<Outer, Inner, S>>,
    /// Precomputed by the analyzer: the rewritten outer ordering, optionally
    /// concatenated with the inner ordering when the outer is known to
    /// yield at most one row per bind (`spec.md` §4.7 "Final ordering").
    ordering: OrderingList,
}

impl<S, Outer, Inner> Joined<S, Outer, Inner> {
    pub fn new(
        target_type_name: impl Into<String>,
        join_prop: impl Into<String>,
        outer: Arc<dyn Executor<Outer>>,
        inner: Arc<dyn Executor<Inner>>,
        adapter: Arc<dyn JoinAdapter<Outer, Inner, S>>,
        ordering: OrderingList,
    ) -> Self {
        Self { target_type_name: target_type_name.into(), join_prop: join_prop.into(), outer, inner, adapter, ordering }
    }
}

#[async_trait]
impl<S, Outer, Inner> Executor<S> for Joined<S, Outer, Inner>
where
    S: Send + Sync + 'static,
    Outer: Clone + Send + Sync + 'static,
    Inner: Send + Sync + 'static,
{
    fn ordering(&self) -> OrderingList { self.ordering.clone() }

    fn filter(&self) -> Filter { Filter::Open }

    async fn fetch(&self, values: &FilterValues) -> Result<RecordStream<S>, PlanError<StorageError>> {
        let mut outer_rows = Vec::new();
        let mut outer_stream = self.outer.fetch(values).await?;
        while let Some(row) = outer_stream.next().await {
            outer_rows.push(row.map_err(PlanError::Storage)?);
        }

        let mut combined = Vec::new();
        for outer_row in outer_rows {
            let inner_values = self.adapter.bind_inner_values(&outer_row, values);
            let mut inner_stream = self.inner.fetch(&inner_values).await?;
            while let Some(inner_row) = inner_stream.next().await {
                let inner_row = inner_row.map_err(PlanError::Storage)?;
                combined.push(Ok(self.adapter.combine(&outer_row, inner_row)));
            }
        }
        Ok(stream::iter(combined).boxed())
    }

    async fn count(&self, _values: &FilterValues) -> Result<Option<u64>, PlanError<StorageError>> { Ok(None) }

    fn print_plan(&self, indent: usize) -> String {
        let pad = indent_str(indent);
        format!(
            "{pad}join: {}\n{pad}...via property: {}\n{pad}...outer loop\n{}\n{pad}...inner loop:\n{}",
            self.target_type_name,
            self.join_prop,
            self.outer.print_plan(indent + 1),
            self.inner.print_plan(indent + 1)
        )
    }
}
