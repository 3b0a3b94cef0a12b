//! Parameter binding. `spec.md` §3: "A filter is bound once associated
//! with a parameter-binding vector; only bound filters may be planned."

use crate::ast::{Expr, Filter};
use crate::error::FilterError;
use crate::value::Value;

/// The concrete argument vector for a filter's `Param(i)` placeholders, in
/// the order the executor expects them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterValues {
    values: Vec<Value>,
}

impl FilterValues {
    pub fn new(values: Vec<Value>) -> Self { Self { values } }

    pub fn empty() -> Self { Self { values: Vec::new() } }

    pub fn get(&self, index: usize) -> Option<&Value> { self.values.get(index) }

    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Unwraps to the raw value vector, e.g. to splice into a freshly built
    /// `FilterValues` for a combined filter.
    pub fn into_vec(self) -> Vec<Value> { self.values }

    /// Resolve an [`Expr`] (a constant or a `Param` index) to its concrete value.
    pub fn resolve<'a>(&'a self, expr: &'a Expr) -> Result<&'a Value, FilterError> {
        match expr {
            Expr::Const(v) => Ok(v),
            Expr::Param(i) => self.get(*i).ok_or(FilterError::UnboundParameter(*i)),
        }
    }
}

/// A filter paired with the values that bind its placeholders. Only a
/// `BoundFilter` may be handed to the planner.
#[derive(Debug, Clone)]
pub struct BoundFilter {
    pub filter: Filter,
    pub values: FilterValues,
}

impl BoundFilter {
    pub fn new(filter: Filter, values: FilterValues) -> Self { Self { filter, values } }

    /// A filter with no parameters is trivially bound.
    pub fn constant(filter: Filter) -> Self { Self { filter, values: FilterValues::empty() } }

    pub fn is_bound(&self) -> bool { max_param_index(&self.filter).map_or(true, |max| max < self.values.len()) }

    /// `initialFilterValues()` from the consumed Filter API: a values
    /// vector sized to every placeholder this filter actually references,
    /// pre-populated with whatever this filter already carries bound.
    pub fn initial_filter_values(&self) -> FilterValues { self.values.clone() }
}

/// The number of distinct `Param` slots `filter` references, i.e. the
/// minimum `FilterValues` length a `BoundFilter` over it needs. Used by the
/// planner to pick a collision-free parameter slot for synthetic atoms it
/// injects (e.g. a join's internal-key binding) beyond every real one.
pub fn param_count(filter: &Filter) -> usize { max_param_index(filter).map_or(0, |max| max + 1) }

fn max_param_index(filter: &Filter) -> Option<usize> {
    match filter {
        Filter::Open | Filter::Closed => None,
        Filter::Compare(pf) => match &pf.expr {
            Some(Expr::Param(i)) => Some(*i),
            _ => None,
        },
        Filter::And(l, r) | Filter::Or(l, r) => {
            match (max_param_index(l), max_param_index(r)) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (Some(a), None) => Some(a),
                (None, Some(b)) => Some(b),
                (None, None) => None,
            }
        }
        Filter::Not(f) => max_param_index(f),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ComparisonOperator, PropertyFilter};

    #[test]
    fn unbound_param_rejected() {
        let f = Filter::Compare(PropertyFilter::param("age", ComparisonOperator::Eq, 0));
        let bound = BoundFilter::new(f, FilterValues::empty());
        assert!(!bound.is_bound());
    }

    #[test]
    fn bound_param_accepted() {
        let f = Filter::Compare(PropertyFilter::param("age", ComparisonOperator::Eq, 0));
        let bound = BoundFilter::new(f, FilterValues::new(vec![Value::I32(30)]));
        assert!(bound.is_bound());
    }

    #[test]
    fn param_count_is_one_past_the_highest_slot() {
        let f = Filter::Compare(PropertyFilter::param("age", ComparisonOperator::Gt, 0))
            .and(Filter::Compare(PropertyFilter::param("name", ComparisonOperator::Eq, 2)));
        assert_eq!(param_count(&f), 3);
    }

    #[test]
    fn param_count_of_constant_filter_is_zero() {
        let f = Filter::Compare(PropertyFilter::eq("age", 30));
        assert_eq!(param_count(&f), 0);
    }
}
