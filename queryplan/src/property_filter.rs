//! `PropertyFilterList` — flattens an AND-only conjunct into its atomic
//! property filters, ordered EQ-first, then range atoms in source order,
//! then NE last (`spec.md` §4.1). Memoized per filter identity: the scoring
//! routines call `PropertyFilterList::of` once per conjunct per plan build,
//! and repeat calls on the same filter must return a structurally equal
//! list (`spec.md` §8 "PropertyFilterList stability").

use dashmap::DashMap;
use filter::{ComparisonOperator, Filter, PropertyFilter};
use once_cell::sync::Lazy;

/// One atom plus the position it held in the filter's own source order,
/// before the EQ/range/NE reordering — used to compute the preference
/// score in `FilteringScore` (`spec.md` §4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedFilter {
    pub filter: PropertyFilter,
    pub original_position: usize,
}

/// The flattened, reordered view of a conjunct's atoms, plus its EXISTS
/// atoms kept separate (they never participate in identity/range matching).
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilterList {
    pub atoms: Vec<PositionedFilter>,
    pub exists: Vec<PositionedFilter>,
    /// Total atom count including EXISTS, for preference-score bit width.
    pub total_count: usize,
}

impl PropertyFilterList {
    /// Build (or return the memoized build of) the ordered atom list for an
    /// AND-only filter. Fails if `filter` contains an `Or` node.
    pub fn of(filter: &Filter) -> Result<PropertyFilterList, crate::error::PlanError> {
        static MEMO: Lazy<DashMap<Filter, PropertyFilterList>> = Lazy::new(DashMap::new);
        if let Some(existing) = MEMO.get(filter) {
            return Ok(existing.clone());
        }
        let built = Self::build(filter)?;
        MEMO.insert(filter.clone(), built.clone());
        Ok(built)
    }

    fn build(filter: &Filter) -> Result<PropertyFilterList, crate::error::PlanError> {
        let mut positioned = Vec::new();
        collect(filter, &mut positioned)?;
        let total_count = positioned.len();

        let (exists, mut comparisons): (Vec<_>, Vec<_>) =
            positioned.into_iter().partition(|p| p.filter.op == ComparisonOperator::Exists);

        comparisons.sort_by_key(|p| rank(p.filter.op));

        Ok(PropertyFilterList { atoms: comparisons, exists, total_count })
    }
}

fn rank(op: ComparisonOperator) -> u8 {
    match op {
        ComparisonOperator::Eq => 0,
        ComparisonOperator::Lt | ComparisonOperator::Le | ComparisonOperator::Gt | ComparisonOperator::Ge => 1,
        ComparisonOperator::Ne => 2,
        ComparisonOperator::Exists => unreachable!("EXISTS is partitioned out before ranking"),
    }
}

fn collect(filter: &Filter, out: &mut Vec<PositionedFilter>) -> Result<(), crate::error::PlanError> {
    match filter {
        Filter::Open | Filter::Closed => Ok(()),
        Filter::Compare(pf) => {
            out.push(PositionedFilter { filter: pf.clone(), original_position: out.len() });
            Ok(())
        }
        Filter::And(l, r) => {
            collect(l, out)?;
            collect(r, out)
        }
        Filter::Or(_, _) => Err(crate::error::PlanError::OrInConjunct),
        Filter::Not(_) => Err(crate::error::PlanError::OrInConjunct),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filter::ComparisonOperator;

    #[test]
    fn eq_sorts_before_range_and_ne() {
        let f = Filter::Compare(PropertyFilter::cmp("age", ComparisonOperator::Gt, 18))
            .and(Filter::Compare(PropertyFilter::eq("status", "active")))
            .and(Filter::Compare(PropertyFilter::cmp("name", ComparisonOperator::Ne, "bob")));
        let list = PropertyFilterList::of(&f).unwrap();
        assert_eq!(list.atoms[0].filter.op, ComparisonOperator::Eq);
        assert_eq!(list.atoms[1].filter.op, ComparisonOperator::Gt);
        assert_eq!(list.atoms[2].filter.op, ComparisonOperator::Ne);
    }

    #[test]
    fn exists_kept_separate() {
        let f = Filter::Compare(filter::PropertyFilter::exists("email")).and(Filter::Compare(PropertyFilter::eq("age", 1)));
        let list = PropertyFilterList::of(&f).unwrap();
        assert_eq!(list.exists.len(), 1);
        assert_eq!(list.atoms.len(), 1);
    }

    #[test]
    fn or_node_is_rejected() {
        let f = Filter::Compare(PropertyFilter::eq("a", 1)).or(Filter::Compare(PropertyFilter::eq("b", 2)));
        assert!(PropertyFilterList::of(&f).is_err());
    }

    #[test]
    fn repeated_build_is_structurally_stable() {
        let f = Filter::Compare(PropertyFilter::eq("a", 1)).and(Filter::Compare(PropertyFilter::cmp("b", ComparisonOperator::Lt, 5)));
        let first = PropertyFilterList::of(&f).unwrap();
        let second = PropertyFilterList::of(&f).unwrap();
        assert_eq!(first, second);
    }
}
