//! The executor tree: stateless operators composed by the analyzers into a
//! plan, each exposing `fetch`, `count`, `filter`, `ordering`, and
//! `print_plan` (`spec.md` §4.7).

pub mod empty;
pub mod filtered;
pub mod full_scan;
pub mod indexed;
pub mod joined;
pub mod key;
pub mod sorted;
pub mod union;

pub use empty::Empty;
pub use filtered::Filtered;
pub use full_scan::{FullScan, FullScanIndexed};
pub use indexed::Indexed;
pub use joined::Joined;
pub use key::Key;
pub use sorted::Sorted;
pub use union::Union;

use async_trait::async_trait;
use filter::{Filter, FilterValues};

use crate::error::PlanError;
use crate::ordering::OrderingList;
use crate::storage::{RecordStream, StorageError};

/// A plan node. Immutable after construction; per-invocation state lives
/// entirely in the returned stream (`spec.md` §5).
#[async_trait]
pub trait Executor<S>: Send + Sync {
    /// The ordering this node's output is already known to satisfy.
    fn ordering(&self) -> OrderingList;

    /// The filter this node's output is known to satisfy (identity/range
    /// atoms folded into a scan contribute here too, not just explicit
    /// `Filtered` wrappers) — used to assert the "open filter invariant"
    /// (`spec.md` §4.7 failure table).
    fn filter(&self) -> Filter;

    async fn fetch(&self, values: &FilterValues) -> Result<RecordStream<S>, PlanError<StorageError>>;

    /// `None` when the node has no cheaper way to answer than draining
    /// `fetch` (the caller falls back to a drain-and-count).
    async fn count(&self, values: &FilterValues) -> Result<Option<u64>, PlanError<StorageError>>;

    fn print_plan(&self, indent: usize) -> String;
}

pub(crate) fn indent_str(indent: usize) -> String { "  ".repeat(indent) }

/// Compare two items by an ordering entry sequence, used by both `Sorted`
/// (remainder comparator) and `Union` (total-ordering merge comparator).
pub(crate) fn sorted_compare(a: &impl sorted::Orderable, b: &impl sorted::Orderable, entries: &[crate::types::OrderingEntry]) -> std::cmp::Ordering {
    use crate::types::Direction;
    use filter::collation::Collatable;
    use std::cmp::Ordering;
    for entry in entries {
        let (av, bv) = (a.ordering_key(&entry.path), b.ordering_key(&entry.path));
        let ord = match (av, bv) {
            (Some(av), Some(bv)) => av.compare(&bv),
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
        };
        let ord = if entry.direction == Direction::Descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
