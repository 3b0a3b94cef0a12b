//! `Filtered` executor (`spec.md` §4.7): applies a remainder filter to an
//! upstream cursor.

use async_trait::async_trait;
use filter::selection::{evaluate, Filterable};
use filter::{Filter, FilterValues};
use futures::StreamExt;
use std::sync::Arc;

use super::{indent_str, Executor};
use crate::error::PlanError;
use crate::ordering::OrderingList;
use crate::storage::{RecordStream, StorageError};

pub struct Filtered<S> {
    inner: Arc<dyn Executor<S>>,
    remainder: Filter,
}

impl<S> Filtered<S> {
    /// Panics (a bug, not a user error — `spec.md` §4.7 failure table) if
    /// `remainder` is open or closed: those must be collapsed before a
    /// `Filtered` wrapper is ever constructed.
    pub fn new(inner: Arc<dyn Executor<S>>, remainder: Filter) -> Self {
        assert!(!remainder.is_open() && !remainder.is_closed(), "Filtered must wrap a non-trivial remainder filter");
        Self { inner, remainder }
    }
}

#[async_trait]
impl<S> Executor<S> for Filtered<S>
where
    S: Filterable + Send + Sync + 'static,
{
    fn ordering(&self) -> OrderingList { self.inner.ordering() }

    fn filter(&self) -> Filter { self.inner.filter().and(self.remainder.clone()) }

    async fn fetch(&self, values: &FilterValues) -> Result<RecordStream<S>, PlanError<StorageError>> {
        let stream = self.inner.fetch(values).await?;
        let remainder = self.remainder.clone();
        let values = values.clone();
        Ok(stream
            .filter_map(move |item| {
                let remainder = remainder.clone();
                let values = values.clone();
                async move {
                    match item {
                        Err(e) => Some(Err(e)),
                        Ok(record) => match evaluate(&record, &remainder, &values) {
                            Ok(true) => Some(Ok(record)),
                            Ok(false) => None,
                            Err(e) => Some(Err(Box::new(e) as StorageError)),
                        },
                    }
                }
            })
            .boxed())
    }

    async fn count(&self, _values: &FilterValues) -> Result<Option<u64>, PlanError<StorageError>> { Ok(None) }

    fn print_plan(&self, indent: usize) -> String {
        format!("{}filter: {:?}\n{}", indent_str(indent), self.remainder, self.inner.print_plan(indent + 1))
    }
}
