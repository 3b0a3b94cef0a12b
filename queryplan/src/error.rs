//! Errors raised by the planner and executor tree (`spec.md` §7).
//!
//! Three kinds, matching the spec's categories: usage errors (category 1,
//! synchronous and non-retryable), planning limitations (category 2,
//! surfaced at plan-build time), and storage errors (category 3, passed
//! through verbatim via the `Storage` variant's type parameter).

use thiserror::Error;

/// Errors raised while building or executing a plan. Generic over `E`, the
/// embedder's own storage error type, which this crate never interprets —
/// it only relays it (`spec.md` §7 category 3: "propagated verbatim from
/// storage").
#[derive(Debug, Error)]
pub enum PlanError<E = std::convert::Infallible> {
    #[error("filter passed to the planner is not bound")]
    Unbound,

    #[error("OR node found where an AND-only conjunct was expected")]
    OrInConjunct,

    #[error("property not found on record type: {0}")]
    UnknownProperty(String),

    #[error("slice arguments out of range: from={from}, to={to:?}")]
    InvalidSlice { from: i64, to: Option<i64> },

    #[error("no executable plan for the given filter/ordering combination")]
    UnsupportedFilter,

    #[error("union of executors requires matching orderings")]
    MismatchedUnionOrdering,

    #[error("load_one found no matching record")]
    NotFound,

    #[error("load_one found more than one matching record")]
    Multiple,

    #[error("filter evaluation error: {0}")]
    Filter(#[from] filter::FilterError),

    #[error("storage error: {0}")]
    Storage(E),
}

impl PlanError<std::convert::Infallible> {
    /// Lifts a planning-phase error (no storage error ever constructed) to
    /// whichever `PlanError<E>` the caller's `StorageAccess` impl uses. The
    /// analyzers never touch storage, so `Storage(_)` can't occur here.
    pub fn widen<E>(self) -> PlanError<E> {
        match self {
            PlanError::Unbound => PlanError::Unbound,
            PlanError::OrInConjunct => PlanError::OrInConjunct,
            PlanError::UnknownProperty(s) => PlanError::UnknownProperty(s),
            PlanError::InvalidSlice { from, to } => PlanError::InvalidSlice { from, to },
            PlanError::UnsupportedFilter => PlanError::UnsupportedFilter,
            PlanError::MismatchedUnionOrdering => PlanError::MismatchedUnionOrdering,
            PlanError::NotFound => PlanError::NotFound,
            PlanError::Multiple => PlanError::Multiple,
            PlanError::Filter(e) => PlanError::Filter(e),
            PlanError::Storage(never) => match never {},
        }
    }
}
