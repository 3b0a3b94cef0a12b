//! `JoinResolver` — the embedder extension point for turning a foreign
//! `AnalysisResult` into an executor (`spec.md` §4.5 `createExecutor`:
//! "For foreign results, wrap in a Join built from the outer executor on
//! the referenced type"). This crate has no concrete record model for the
//! referenced type (`spec.md` §1 lists "the concrete record model" as out
//! of scope), so it can only describe the shape of the join it chose —
//! assembling `Joined<Target, Outer, Inner>` from a real outer executor, a
//! real inner executor, and a `JoinAdapter` is left to the embedder, which
//! does know both record types.

use std::sync::Arc;

use crate::analyzer::result::AnalysisResult;
use crate::error::PlanError;
use crate::exec::Executor;
use crate::storage::StorageError;

/// Builds the executor for one foreign `AnalysisResult`. A `QueryEngine`
/// holds one resolver per record type it plans for.
pub trait JoinResolver<S>: Send + Sync {
    fn build(&self, result: &AnalysisResult) -> Result<Arc<dyn Executor<S>>, PlanError<StorageError>>;
}

/// A `JoinResolver` for record types with no reference properties: the
/// `IndexedQueryAnalyzer` never produces a `ChosenIndex::Foreign` for such
/// a type, so reaching this is a planner bug, not a runtime condition to
/// recover from.
pub struct NoJoins;

impl<S> JoinResolver<S> for NoJoins {
    fn build(&self, result: &AnalysisResult) -> Result<Arc<dyn Executor<S>>, PlanError<StorageError>> {
        debug_assert!(result.is_foreign(), "NoJoins.build called on a local result");
        Err(PlanError::UnsupportedFilter)
    }
}
