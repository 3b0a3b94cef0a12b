//! Filter items based on a predicate. This is necessary for cases where we
//! are scanning over a set of data which has not been pre-filtered by an
//! index search — or to supplement/validate an index search with additional
//! filtering (`spec.md`: the `Filtered` executor node wraps an upstream
//! iterator and re-checks the remainder against the filter).

use crate::ast::{ComparisonOperator, Filter, PropertyFilter};
use crate::bound::FilterValues;
use crate::error::FilterError;
use crate::value::Value;

/// Anything the evaluator can read properties off of — a record, a row, a
/// decoded storage tuple. Property paths with more than one hop are resolved
/// hop by hop through [`Filterable::reference`].
pub trait Filterable {
    fn value(&self, name: &str) -> Option<Value>;

    /// Resolve a reference (join) property to the referenced item, if any.
    /// The default returns `None`, meaning any multi-hop path fails with
    /// `PropertyNotFound` — implementors that expose references override this.
    fn reference(&self, _name: &str) -> Option<Box<dyn Filterable + '_>> { None }
}

fn resolve_path<I: Filterable + ?Sized>(item: &I, path: &crate::ast::PropertyPath) -> Result<Value, FilterError> {
    let first = path.0.first().expect("PropertyPath is never empty");
    if path.is_direct() {
        return item.value(first).ok_or_else(|| FilterError::PropertyNotFound(path.to_string()));
    }
    let hops = &path.0[1..];
    let mut current = item
        .reference(first)
        .ok_or_else(|| FilterError::PropertyNotFound(path.to_string()))?;
    for (i, hop) in hops.iter().enumerate() {
        if i == hops.len() - 1 {
            return current.value(hop).ok_or_else(|| FilterError::PropertyNotFound(path.to_string()));
        }
        current = current
            .reference(hop)
            .ok_or_else(|| FilterError::PropertyNotFound(path.to_string()))?;
    }
    unreachable!("a path with more than one hop always has at least one intermediate hop")
}

fn compare_values(left: &Value, op: ComparisonOperator, right: &Value) -> Result<bool, FilterError> {
    use std::cmp::Ordering;
    let ord = left.partial_cmp_typed(right).ok_or_else(|| FilterError::TypeMismatch {
        left: format!("{:?}", left.type_of()),
        right: format!("{:?}", right.type_of()),
    })?;
    Ok(match op {
        ComparisonOperator::Eq => ord == Ordering::Equal,
        ComparisonOperator::Ne => ord != Ordering::Equal,
        ComparisonOperator::Lt => ord == Ordering::Less,
        ComparisonOperator::Le => ord != Ordering::Greater,
        ComparisonOperator::Gt => ord == Ordering::Greater,
        ComparisonOperator::Ge => ord != Ordering::Less,
        ComparisonOperator::Exists => unreachable!("Exists is handled before value comparison"),
    })
}

pub fn evaluate_property_filter<I: Filterable + ?Sized>(
    item: &I,
    pf: &PropertyFilter,
    values: &FilterValues,
) -> Result<bool, FilterError> {
    if pf.op == ComparisonOperator::Exists {
        return Ok(resolve_path(item, &pf.path).is_ok());
    }
    let left = resolve_path(item, &pf.path)?;
    let expr = pf.expr.as_ref().ok_or(FilterError::UnsupportedOperator { op: pf.op })?;
    let right = values.resolve(expr)?;
    compare_values(&left, pf.op, right)
}

/// Evaluate a full filter tree against `item`, short-circuiting `And`/`Or`.
pub fn evaluate<I: Filterable + ?Sized>(item: &I, filter: &Filter, values: &FilterValues) -> Result<bool, FilterError> {
    match filter {
        Filter::Open => Ok(true),
        Filter::Closed => Ok(false),
        Filter::Compare(pf) => evaluate_property_filter(item, pf, values),
        Filter::And(l, r) => Ok(evaluate(item, l, values)? && evaluate(item, r, values)?),
        Filter::Or(l, r) => Ok(evaluate(item, l, values)? || evaluate(item, r, values)?),
        Filter::Not(inner) => Ok(!evaluate(item, inner, values)?),
    }
}

/// An iterator adapter that filters an upstream item iterator by a bound
/// filter, surfacing evaluation errors rather than silently dropping items.
pub struct FilterIterator<'f, 'v, I> {
    inner: I,
    filter: &'f Filter,
    values: &'v FilterValues,
}

impl<'f, 'v, I> FilterIterator<'f, 'v, I> {
    pub fn new(inner: I, filter: &'f Filter, values: &'v FilterValues) -> Self { Self { inner, filter, values } }
}

impl<'f, 'v, I, T> Iterator for FilterIterator<'f, 'v, I>
where
    I: Iterator<Item = T>,
    T: Filterable,
{
    type Item = Result<T, FilterError>;

    fn next(&mut self) -> Option<Self::Item> {
        for candidate in self.inner.by_ref() {
            match evaluate(&candidate, self.filter, self.values) {
                Ok(true) => return Some(Ok(candidate)),
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
