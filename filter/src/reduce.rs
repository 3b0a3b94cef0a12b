//! Algebraic simplification and normal-form splitting of [`Filter`] trees.
//!
//! The planner's DNF split (`spec.md` §4.6 `UnionQueryAnalyzer`) requires a
//! `Not`-free tree of OR-of-ANDs; `reduce` and `disjunctive_normal_form_split`
//! get it there. The join-split helpers implement the `notJoinedFrom` /
//! `asJoinedFrom` operations from the consumed Filter API (`spec.md` §6):
//! partitioning an AND-only conjunct into the part that does not cross a
//! given reference hop and the part that does, re-rooted in the referenced
//! type's namespace.

use crate::ast::{Filter, PropertyFilter};
use crate::error::FilterError;

/// Push `Not` to the leaves (De Morgan's), absorb `Open`/`Closed` wherever
/// an `And`/`Or` makes them redundant, and fold a negated leaf comparison
/// into its inverse operator via [`crate::ast::ComparisonOperator::negate`]
/// (e.g. `Not(Compare(Eq))` becomes `Compare(Ne)`). `Exists` has no single
/// inverse operator, so `Not(Compare(Exists))` is the one shape this pass
/// can't eliminate; it's left as-is and rejected later, at the DNF/CNF
/// split, with a proper error instead of reaching the planner unreduced.
pub fn reduce(filter: Filter) -> Filter {
    match filter {
        Filter::Not(inner) => match *inner {
            Filter::Open => Filter::Closed,
            Filter::Closed => Filter::Open,
            Filter::Not(doubly_inner) => reduce(*doubly_inner),
            Filter::And(l, r) => reduce(Filter::Or(Box::new(Filter::Not(l)), Box::new(Filter::Not(r)))),
            Filter::Or(l, r) => reduce(Filter::And(Box::new(Filter::Not(l)), Box::new(Filter::Not(r)))),
            Filter::Compare(pf) => match pf.op.negate() {
                Some(negated) => Filter::Compare(PropertyFilter { path: pf.path, op: negated, expr: pf.expr }),
                None => Filter::Not(Box::new(Filter::Compare(pf))),
            },
        },
        Filter::And(l, r) => reduce(*l).and(reduce(*r)),
        Filter::Or(l, r) => reduce(*l).or(reduce(*r)),
        leaf => leaf,
    }
}

/// Split a reduced (`Not`-free) filter into its OR branches, each itself
/// flattened into a list of AND-only atoms. An all-AND filter yields a
/// single-element outer list. Fails if `filter` still contains a `Not` node
/// (only possible for `Not(Compare(Exists))`, which [`reduce`] can't fold).
pub fn disjunctive_normal_form_split(filter: &Filter) -> Result<Vec<Vec<PropertyFilter>>, FilterError> {
    match filter {
        Filter::Open => Ok(vec![vec![]]),
        Filter::Closed => Ok(vec![]),
        Filter::Compare(pf) => Ok(vec![vec![pf.clone()]]),
        Filter::Or(l, r) => {
            let mut branches = disjunctive_normal_form_split(l)?;
            branches.extend(disjunctive_normal_form_split(r)?);
            Ok(branches)
        }
        Filter::And(l, r) => {
            let left = disjunctive_normal_form_split(l)?;
            let right = disjunctive_normal_form_split(r)?;
            let mut out = Vec::with_capacity(left.len() * right.len());
            for lb in &left {
                for rb in &right {
                    let mut conjunct = lb.clone();
                    conjunct.extend(rb.iter().cloned());
                    out.push(conjunct);
                }
            }
            Ok(out)
        }
        Filter::Not(inner) => Err(unsupported_negation(inner)),
    }
}

/// The CNF dual of [`disjunctive_normal_form_split`]: a list of OR-only
/// clauses whose conjunction is equivalent to `filter`.
pub fn conjunctive_normal_form_split(filter: &Filter) -> Result<Vec<Vec<PropertyFilter>>, FilterError> {
    match filter {
        Filter::Open => Ok(vec![]),
        Filter::Closed => Ok(vec![vec![]]),
        Filter::Compare(pf) => Ok(vec![vec![pf.clone()]]),
        Filter::And(l, r) => {
            let mut clauses = conjunctive_normal_form_split(l)?;
            clauses.extend(conjunctive_normal_form_split(r)?);
            Ok(clauses)
        }
        Filter::Or(l, r) => {
            let left = conjunctive_normal_form_split(l)?;
            let right = conjunctive_normal_form_split(r)?;
            let mut out = Vec::with_capacity(left.len() * right.len());
            for lc in &left {
                for rc in &right {
                    let mut clause = lc.clone();
                    clause.extend(rc.iter().cloned());
                    out.push(clause);
                }
            }
            Ok(out)
        }
        Filter::Not(inner) => Err(unsupported_negation(inner)),
    }
}

fn unsupported_negation(inner: &Filter) -> FilterError {
    match inner {
        Filter::Compare(pf) => FilterError::UnsupportedNegation { op: pf.op },
        _ => unreachable!("reduce() only ever leaves Not wrapping a Compare node"),
    }
}

/// The part of an AND-only conjunct that does *not* traverse `hop`.
pub fn not_joined_from(conjunct: &[PropertyFilter], hop: &str) -> Vec<PropertyFilter> {
    conjunct.iter().filter(|pf| !pf.path.starts_with_hop(hop)).cloned().collect()
}

/// The part of an AND-only conjunct that traverses `hop`, re-rooted in the
/// referenced type's property namespace (the leading hop stripped).
pub fn as_joined_from(conjunct: &[PropertyFilter], hop: &str) -> Vec<PropertyFilter> {
    conjunct
        .iter()
        .filter(|pf| pf.path.starts_with_hop(hop))
        .map(|pf| {
            let mut rerooted = pf.clone();
            rerooted.path = pf.path.strip_first_hop().expect("filtered by starts_with_hop");
            rerooted
        })
        .collect()
}
