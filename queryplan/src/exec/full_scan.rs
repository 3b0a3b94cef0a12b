//! `FullScan` / `FullScanIndexed` (`spec.md` §4.7).

use async_trait::async_trait;
use filter::{Filter, FilterValues};
use std::sync::Arc;

use super::{indent_str, Executor};
use crate::error::PlanError;
use crate::ordering::OrderingList;
use crate::storage::{RecordStream, StorageAccess, StorageError};
use crate::types::IndexDescriptor;

/// Scans every record of `S` in storage-native order.
pub struct FullScan<S> {
    type_name: String,
    support: Arc<dyn StorageAccess<S>>,
}

impl<S> FullScan<S> {
    pub fn new(type_name: impl Into<String>, support: Arc<dyn StorageAccess<S>>) -> Self { Self { type_name: type_name.into(), support } }
}

#[async_trait]
impl<S: Send + Sync + 'static> Executor<S> for FullScan<S> {
    fn ordering(&self) -> OrderingList { OrderingList::empty(self.type_name.clone()) }

    fn filter(&self) -> Filter { Filter::Open }

    async fn fetch(&self, _values: &FilterValues) -> Result<RecordStream<S>, PlanError<StorageError>> {
        self.support.fetch_all().await.map_err(PlanError::Storage)
    }

    async fn count(&self, _values: &FilterValues) -> Result<Option<u64>, PlanError<StorageError>> {
        self.support.count_all().await.map_err(PlanError::Storage)
    }

    fn print_plan(&self, indent: usize) -> String { format!("{}full scan: {}", indent_str(indent), self.type_name) }
}

/// Scans index `I` in its natural order, without any filter applied — used
/// when an ordering is fully satisfied by an index but no part of the
/// conjunct matched it (`spec.md` §8 scenario 5).
pub struct FullScanIndexed<S> {
    type_name: String,
    index: IndexDescriptor,
    reverse_order: bool,
    support: Arc<dyn StorageAccess<S>>,
}

impl<S> FullScanIndexed<S> {
    pub fn new(type_name: impl Into<String>, index: IndexDescriptor, reverse_order: bool, support: Arc<dyn StorageAccess<S>>) -> Self {
        Self { type_name: type_name.into(), index, reverse_order, support }
    }
}

#[async_trait]
impl<S: Send + Sync + 'static> Executor<S> for FullScanIndexed<S> {
    fn ordering(&self) -> OrderingList {
        let mut list = OrderingList::of(self.type_name.clone(), self.index.properties.clone());
        if self.reverse_order {
            list = list.reversed();
        }
        list
    }

    fn filter(&self) -> Filter { Filter::Open }

    async fn fetch(&self, _values: &FilterValues) -> Result<RecordStream<S>, PlanError<StorageError>> {
        // No filter applied — an unbounded scan of the index in its natural
        // order, so there are no identity values to bind.
        self.support
            .fetch_subset(
                &self.index,
                &FilterValues::new(vec![]),
                crate::storage::Boundary::Open,
                None,
                crate::storage::Boundary::Open,
                None,
                false,
                self.reverse_order,
            )
            .await
            .map_err(PlanError::Storage)
    }

    async fn count(&self, _values: &FilterValues) -> Result<Option<u64>, PlanError<StorageError>> {
        self.support.count_all().await.map_err(PlanError::Storage)
    }

    fn print_plan(&self, indent: usize) -> String {
        format!("{}full index scan: {}\n{}...index: {}", indent_str(indent), self.type_name, indent_str(indent), self.index.name)
    }
}
