//! `Empty` executor: the always-empty plan for a filter that reduces to
//! `Closed` (`spec.md` §8 "Filter that evaluates closed ⇒ plan is the
//! always-empty executor and count() is 0").

use async_trait::async_trait;
use filter::{Filter, FilterValues};
use futures::{stream, StreamExt};

use super::{indent_str, Executor};
use crate::error::PlanError;
use crate::ordering::OrderingList;
use crate::storage::{RecordStream, StorageError};

pub struct Empty {
    type_name: String,
}

impl Empty {
    pub fn new(type_name: impl Into<String>) -> Self { Self { type_name: type_name.into() } }
}

#[async_trait]
impl<S: Send + Sync + 'static> Executor<S> for Empty {
    fn ordering(&self) -> OrderingList { OrderingList::empty(self.type_name.clone()) }

    fn filter(&self) -> Filter { Filter::Closed }

    async fn fetch(&self, _values: &FilterValues) -> Result<RecordStream<S>, PlanError<StorageError>> {
        Ok(stream::empty().boxed())
    }

    async fn count(&self, _values: &FilterValues) -> Result<Option<u64>, PlanError<StorageError>> { Ok(Some(0)) }

    fn print_plan(&self, indent: usize) -> String { format!("{}empty: {}", indent_str(indent), self.type_name) }
}
