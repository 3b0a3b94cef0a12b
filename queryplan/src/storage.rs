//! `StorageAccess<S>` — the embedder-supplied interface the executor tree
//! drives to actually read records (`spec.md` §6). Planning itself never
//! touches this trait; only executor nodes do, and only at fetch time.
//!
//! Object-safe by design (no associated types) so the executor tree can
//! hold `Arc<dyn StorageAccess<S>>` the way the storage layer this crate
//! was grounded on holds `Arc<dyn StorageBucket>` — generic only over the
//! record type `S`, never over the concrete backend.

use async_trait::async_trait;
use filter::{Filter, FilterValues, PropertyPath};
use futures::stream::BoxStream;
use std::any::Any;

use crate::types::IndexDescriptor;

/// A range-scan bound. `Open` means the scan starts/ends at the index's
/// natural extreme; `Inclusive`/`Exclusive` bound by a folded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Open,
    Inclusive,
    Exclusive,
}

/// Closed hint enumeration the caller may attach to a query (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryHint {
    /// The caller will apply `from`/`to` itself; bias the plan toward
    /// ordering-friendly indexes even when that costs a filtering tie-break.
    ConsumeSlice,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct QueryHints(Vec<QueryHint>);

impl QueryHints {
    pub fn none() -> Self { Self(Vec::new()) }
    pub fn with(hints: Vec<QueryHint>) -> Self { Self(hints) }
    pub fn contains(&self, hint: QueryHint) -> bool { self.0.contains(&hint) }
}

pub type StorageError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type RecordStream<S> = BoxStream<'static, Result<S, StorageError>>;

/// Opaque storage-native boundary query built by `index_entry_query` and
/// re-submitted via `fetch_from_index_entry_query` (covering-index access).
pub struct IndexEntryQuery(pub Box<dyn Any + Send>);

/// Opaque sort-buffer handle (`spec.md` §9: "Sort buffer strategy is
/// chosen by the support object — array-in-memory or external merge-sort").
pub struct SortBuffer(pub Box<dyn Any + Send>);

/// Storage for a record type's tuples, queried by whatever index the
/// planner selected. Implemented by the embedder; this crate only calls
/// it, never implements it (`spec.md` §6 `StorageAccess<S>`).
#[async_trait]
pub trait StorageAccess<S>: Send + Sync {
    fn storable_type(&self) -> &str;

    fn all_indexes(&self) -> &[IndexDescriptor];

    /// If storage can answer this index directly (plan passthrough), this
    /// returns a handle the `create_executor` step installs instead of the
    /// generic `Indexed` executor. The default has no passthrough.
    fn storage_delegate(&self, _index: &IndexDescriptor) -> Option<()> { None }

    /// `None` if storage cannot report a count without a scan.
    async fn count_all(&self) -> Result<Option<u64>, StorageError>;

    async fn fetch_all(&self) -> Result<RecordStream<S>, StorageError>;

    #[allow(clippy::too_many_arguments)]
    async fn fetch_subset(
        &self,
        index: &IndexDescriptor,
        identity_values: &FilterValues,
        start_boundary: Boundary,
        start_value: Option<filter::Value>,
        end_boundary: Boundary,
        end_value: Option<filter::Value>,
        reverse_range: bool,
        reverse_order: bool,
    ) -> Result<RecordStream<S>, StorageError>;

    /// Covering-index access: `Some` if `index`'s tuples carry enough data
    /// to check the remainder filter without fetching the base record.
    /// `identity_values`/the range pair are the same bound values
    /// `fetch_subset` would receive; `covering_filter` is the covering-index
    /// atoms (`spec.md` §4.7's "covering-filter atoms") with every `Param`
    /// already resolved to a `Const` — storage binds all three into the
    /// opaque query it hands back so `fetch_from_index_entry_query` alone
    /// fully determines which records are returned, never relying on the
    /// caller to re-check identity/range/covering atoms downstream. The
    /// default reports no covering-index support.
    #[allow(clippy::too_many_arguments)]
    fn index_entry_query(
        &self,
        _index: &IndexDescriptor,
        _identity_values: &FilterValues,
        _start_boundary: Boundary,
        _start_value: Option<filter::Value>,
        _end_boundary: Boundary,
        _end_value: Option<filter::Value>,
        _covering_filter: &Filter,
    ) -> Option<IndexEntryQuery> {
        None
    }

    async fn fetch_from_index_entry_query(
        &self,
        index: &IndexDescriptor,
        bound_query: IndexEntryQuery,
    ) -> Result<RecordStream<S>, StorageError>;

    fn create_sort_buffer(&self) -> SortBuffer;
}

/// Part of an index path beyond a join hop, used when scoring a foreign
/// index against a virtual (cross-reference) index shape.
pub fn covering_properties(index: &IndexDescriptor) -> Vec<PropertyPath> { index.properties.iter().map(|e| e.path.clone()).collect() }
