//! `Key` executor (`spec.md` §4.7): exact lookup on a unique, fully
//! identity-matched index.

use async_trait::async_trait;
use filter::{Filter, FilterValues};
use futures::StreamExt;
use std::sync::Arc;

use super::{indent_str, Executor};
use crate::error::PlanError;
use crate::ordering::OrderingList;
use crate::score::FilteringScore;
use crate::storage::{Boundary, StorageAccess, StorageError};
use crate::storage::RecordStream;
use crate::types::IndexDescriptor;

pub struct Key<S> {
    type_name: String,
    index: IndexDescriptor,
    score: FilteringScore,
    support: Arc<dyn StorageAccess<S>>,
}

impl<S> Key<S> {
    pub fn new(type_name: impl Into<String>, index: IndexDescriptor, score: FilteringScore, support: Arc<dyn StorageAccess<S>>) -> Self {
        debug_assert!(score.key_match, "Key executor requires a key-match score");
        Self { type_name: type_name.into(), index, score, support }
    }
}

#[async_trait]
impl<S: Send + Sync + 'static> Executor<S> for Key<S> {
    fn ordering(&self) -> OrderingList { OrderingList::empty(self.type_name.clone()) }

    fn filter(&self) -> Filter {
        self.score.identity.iter().fold(Filter::Open, |acc, pf| acc.and(Filter::Compare(pf.filter.clone())))
    }

    async fn fetch(&self, values: &FilterValues) -> Result<RecordStream<S>, PlanError<StorageError>> {
        let resolved = self
            .score
            .identity
            .iter()
            .map(|pf| {
                let expr = pf.filter.expr.as_ref().expect("identity atom always carries a value expression");
                values.resolve(expr).map(Clone::clone)
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(PlanError::Filter)?;
        let identity_values = FilterValues::new(resolved);
        let stream = self
            .support
            .fetch_subset(&self.index, &identity_values, Boundary::Inclusive, None, Boundary::Inclusive, None, false, false)
            .await
            .map_err(PlanError::Storage)?;
        Ok(stream.take(1).boxed())
    }

    async fn count(&self, values: &FilterValues) -> Result<Option<u64>, PlanError<StorageError>> {
        let mut stream = self.fetch(values).await?;
        Ok(Some(if stream.next().await.is_some() { 1 } else { 0 }))
    }

    fn print_plan(&self, indent: usize) -> String {
        format!("{}index key: {}\n{}...index: {}", indent_str(indent), self.type_name, indent_str(indent), self.index.name)
    }
}
