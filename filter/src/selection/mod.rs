pub mod filter;

pub use filter::{evaluate, evaluate_property_filter, FilterIterator, Filterable};
