//! `Union` executor (`spec.md` §4.7): merges already-sorted children on a
//! shared total ordering, suppressing duplicates.

use async_trait::async_trait;
use filter::FilterValues;
use futures::{stream, StreamExt};
use std::sync::Arc;

use super::sorted::Orderable;
use super::{indent_str, Executor};
use crate::error::PlanError;
use crate::ordering::OrderingList;
use crate::storage::{RecordStream, StorageError};

pub struct Union<S> {
    children: Vec<Arc<dyn Executor<S>>>,
    total_ordering: OrderingList,
}

impl<S> Union<S> {
    /// Fails (`spec.md` §4.7 "All children must expose the same `ordering`,
    /// else constructor fails") if the children disagree on ordering.
    pub fn new(children: Vec<Arc<dyn Executor<S>>>, total_ordering: OrderingList) -> Result<Self, crate::error::PlanError> {
        if !children.iter().all(|c| c.ordering() == total_ordering) {
            return Err(crate::error::PlanError::MismatchedUnionOrdering);
        }
        Ok(Self { children, total_ordering })
    }
}

#[async_trait]
impl<S> Executor<S> for Union<S>
where
    S: Orderable + Eq + Clone + Send + Sync + 'static,
{
    fn ordering(&self) -> OrderingList { self.total_ordering.clone() }

    fn filter(&self) -> filter::Filter {
        self.children.iter().skip(1).fold(self.children[0].filter(), |acc, c| acc.or(c.filter()))
    }

    async fn fetch(&self, values: &FilterValues) -> Result<RecordStream<S>, PlanError<StorageError>> {
        // Sequential merge: drain each child fully into a buffer (children
        // are themselves cheap-to-fetch index scans), sort by the total
        // ordering, then suppress adjacent duplicates. `spec.md` §5: "Union
        // cursors pull from their children strictly sequentially."
        let entries = self.total_ordering.entries();
        let mut merged: Vec<S> = Vec::new();
        for child in &self.children {
            let mut stream = child.fetch(values).await?;
            while let Some(item) = stream.next().await {
                merged.push(item.map_err(PlanError::Storage)?);
            }
        }
        merged.sort_by(|a, b| super::sorted_compare(a, b, &entries));
        merged.dedup();
        Ok(stream::iter(merged.into_iter().map(Ok)).boxed())
    }

    async fn count(&self, _values: &FilterValues) -> Result<Option<u64>, PlanError<StorageError>> { Ok(None) }

    fn print_plan(&self, indent: usize) -> String {
        let mut lines = vec![format!("{}union", indent_str(indent))];
        for child in &self.children {
            lines.push(child.print_plan(indent + 1));
        }
        lines.join("\n")
    }
}
