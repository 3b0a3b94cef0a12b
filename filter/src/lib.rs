//! `filter` is the predicate AST and evaluation layer consumed by the
//! query planning core (`queryplan`). It owns the typed `Filter` tree, its
//! algebraic reduction to DNF/CNF, parameter binding, and a reference
//! in-memory evaluator — nothing about indexes, storage, or plan shapes
//! lives here.

pub mod ast;
pub mod bound;
pub mod collation;
pub mod error;
pub mod reduce;
pub mod selection;
pub mod value;
pub mod visitor;

pub use ast::{ComparisonOperator, Expr, Filter, PropertyFilter, PropertyPath};
pub use bound::{param_count, BoundFilter, FilterValues};
pub use error::FilterError;
pub use value::{Value, ValueType};
