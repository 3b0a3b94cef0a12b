use thiserror::Error;

/// Errors raised while constructing, binding, or evaluating a [`crate::ast::Filter`].
///
/// These are all usage errors (`spec.md` §7 category 1): synchronous,
/// descriptive, non-retryable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("filter contains an OR node where only an AND-only conjunct is allowed")]
    OrNotAllowed,

    #[error("property not found: {0}")]
    PropertyNotFound(String),

    #[error("unbound parameter at index {0}")]
    UnboundParameter(usize),

    #[error("unsupported operator {op:?} for EXISTS-less comparison")]
    UnsupportedOperator { op: crate::ast::ComparisonOperator },

    #[error("cannot negate {op:?}: it has no single inverse comparison operator")]
    UnsupportedNegation { op: crate::ast::ComparisonOperator },

    #[error("value type mismatch comparing {left} and {right}")]
    TypeMismatch { left: String, right: String },
}
