//! Query planning: from one bound predicate to a scored, executable plan.
//!
//! `indexed` is `IndexedQueryAnalyzer` (`spec.md` §4.5): the best local or
//! foreign index for a single OR-free conjunct. `union` is
//! `UnionQueryAnalyzer` (`spec.md` §4.6): the DNF split, remainder-merge,
//! and full-scan-collapse pass that turns a possibly-disjunctive filter
//! into one or several `indexed` results, plus total-ordering enforcement
//! across them. `result` is the `AnalysisResult` (`spec.md` §4.5 "Result")
//! both of them produce and hand off to the executor tree. `join` is the
//! embedder extension point for assembling a foreign result's executor.

pub mod indexed;
pub mod join;
pub mod result;
pub mod union;

pub use indexed::{ForeignCatalog, IndexedQueryAnalyzer};
pub use join::{JoinResolver, NoJoins};
pub use result::{AnalysisResult, ChosenIndex};
pub use union::{UnionPlan, UnionQueryAnalyzer};
