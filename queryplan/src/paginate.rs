//! "Fetch after" keyset pagination (`spec.md` §9): given a last-seen record
//! and the ordering a query is running under, builds the diagonal OR-of-
//! ANDs filter that continues the cursor past it, and binds it.
//!
//! For ordering `o1,…,on` and last-seen values `v1,…,vn`:
//! `(o1≷v1) OR (o1=v1 AND o2≷v2) OR … OR (o1=v1 AND … AND on≷vn)`, where
//! `≷` is `>`/`Ge` flipped to `<`/`Le` on a descending entry. Each `vi` is
//! bound once per diagonal it appears on, at its own `Param` slot — the
//! atoms can't share a slot since `FilterValues` has no notion of "this
//! slot equals that one", only positional binding.

use filter::{BoundFilter, ComparisonOperator, Filter, FilterValues, PropertyFilter, Value};

use crate::types::{Direction, OrderingEntry};

/// Builds the standalone "continue past `last_seen`" filter for `ordering`.
/// `last_seen[i]` is the value of `ordering[i].path` on the last record the
/// caller saw. Panics if the lengths disagree — a pagination cursor is
/// always built from the same ordering it was handed.
pub fn fetch_after(ordering: &[OrderingEntry], last_seen: &[Value]) -> BoundFilter {
    assert_eq!(ordering.len(), last_seen.len(), "fetch_after needs one value per ordering entry");

    let mut next_param = 0usize;
    let mut values = Vec::new();
    let mut branches: Vec<Filter> = Vec::new();

    for i in 0..ordering.len() {
        let mut conjunct = Filter::Open;
        for j in 0..i {
            let param = alloc(&mut next_param, &mut values, last_seen[j].clone());
            conjunct = conjunct.and(Filter::Compare(PropertyFilter::param(ordering[j].path.clone(), ComparisonOperator::Eq, param)));
        }
        let strict_op = if ordering[i].direction == Direction::Descending { ComparisonOperator::Lt } else { ComparisonOperator::Gt };
        let param = alloc(&mut next_param, &mut values, last_seen[i].clone());
        conjunct = conjunct.and(Filter::Compare(PropertyFilter::param(ordering[i].path.clone(), strict_op, param)));
        branches.push(conjunct);
    }

    let filter = branches.into_iter().fold(Filter::Closed, |acc, branch| acc.or(branch));
    BoundFilter::new(filter, FilterValues::new(values))
}

/// Combines an existing bound filter with the `fetch_after` continuation
/// for the same query, AND-ing the two and renumbering the continuation's
/// `Param` slots past every slot `existing` already uses.
pub fn fetch_after_combined(existing: &BoundFilter, ordering: &[OrderingEntry], last_seen: &[Value]) -> BoundFilter {
    let continuation = fetch_after(ordering, last_seen);
    let offset = filter::param_count(&existing.filter);
    let shifted = shift_params(continuation.filter, offset);

    let mut values = existing.values.clone().into_vec();
    values.extend(continuation.values.into_vec());

    BoundFilter::new(existing.filter.clone().and(shifted), FilterValues::new(values))
}

fn alloc(next_param: &mut usize, values: &mut Vec<Value>, value: Value) -> usize {
    let slot = *next_param;
    *next_param += 1;
    values.push(value);
    slot
}

fn shift_params(filter: Filter, offset: usize) -> Filter {
    match filter {
        Filter::Open | Filter::Closed => filter,
        Filter::Compare(mut pf) => {
            if let Some(filter::Expr::Param(i)) = &pf.expr {
                pf.expr = Some(filter::Expr::Param(i + offset));
            }
            Filter::Compare(pf)
        }
        Filter::And(l, r) => shift_params(*l, offset).and(shift_params(*r, offset)),
        Filter::Or(l, r) => shift_params(*l, offset).or(shift_params(*r, offset)),
        Filter::Not(f) => Filter::Not(Box::new(shift_params(*f, offset))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_entry_is_a_plain_strict_comparison() {
        let ordering = vec![OrderingEntry::asc("id")];
        let bound = fetch_after(&ordering, &[Value::I64(5)]);
        assert_eq!(bound.values.len(), 1);
        match &bound.filter {
            Filter::Compare(pf) => assert_eq!(pf.op, ComparisonOperator::Gt),
            other => panic!("expected a single comparison, got {other:?}"),
        }
    }

    #[test]
    fn two_entries_build_an_or_of_two_branches() {
        let ordering = vec![OrderingEntry::asc("age"), OrderingEntry::desc("name")];
        let bound = fetch_after(&ordering, &[Value::I64(30), Value::from("alice")]);
        assert!(matches!(bound.filter, Filter::Or(_, _)));
        // age > 30 (1 value) OR (age = 30 AND name < "alice") (2 values): 3 total.
        assert_eq!(bound.values.len(), 3);
    }

    #[test]
    fn descending_entry_flips_to_strict_less_than() {
        let ordering = vec![OrderingEntry::desc("score")];
        let bound = fetch_after(&ordering, &[Value::I64(10)]);
        match &bound.filter {
            Filter::Compare(pf) => assert_eq!(pf.op, ComparisonOperator::Lt),
            other => panic!("expected a single comparison, got {other:?}"),
        }
    }

    #[test]
    fn combined_renumbers_past_the_existing_filters_params() {
        let existing = BoundFilter::new(
            Filter::Compare(PropertyFilter::param("active", ComparisonOperator::Eq, 0)),
            FilterValues::new(vec![Value::Bool(true)]),
        );
        let ordering = vec![OrderingEntry::asc("id")];
        let combined = fetch_after_combined(&existing, &ordering, &[Value::I64(5)]);
        assert!(combined.is_bound());
        assert_eq!(combined.values.len(), 2);
    }
}
