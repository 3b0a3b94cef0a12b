//! `UnionQueryAnalyzer` (`spec.md` §4.6): reduces a filter to disjunctive
//! normal form, analyzes each disjunct with `IndexedQueryAnalyzer`, fuses
//! mergeable subplans to a fixed point, collapses into a single full scan
//! when one subplan handles nothing, and enforces a total ordering across
//! whatever subplans remain.

use std::sync::Arc;

use filter::{reduce, Filter, PropertyPath};
use tracing::debug;

use super::indexed::IndexedQueryAnalyzer;
use super::result::{has_joined_atom, AnalysisResult, ChosenIndex};
use crate::error::PlanError;
use crate::ordering::OrderingList;
use crate::storage::QueryHints;
use crate::types::{OrderingEntry, TypeInfo};

/// The union analyzer's output (`spec.md` §4.6).
pub enum UnionPlan {
    /// The filter reduced to `Closed`: no records can match.
    Empty,
    /// A single subplan covers the whole filter — no union needed.
    Single(AnalysisResult),
    /// More than one subplan survived the merge/collapse passes; they must
    /// be executed as a duplicate-suppressing union over `total_ordering`
    /// (`spec.md` §4.6 step 5).
    Union { subplans: Vec<AnalysisResult>, total_ordering: Vec<OrderingEntry> },
}

pub struct UnionQueryAnalyzer {
    type_info: Arc<dyn TypeInfo>,
    indexed: IndexedQueryAnalyzer,
}

impl UnionQueryAnalyzer {
    pub fn new(type_info: Arc<dyn TypeInfo>, indexed: IndexedQueryAnalyzer) -> Self { Self { type_info, indexed } }

    /// `spec.md` §4.6 steps 1-5. `total_params` is the bound filter's own
    /// parameter count, forwarded unchanged to every disjunct's
    /// `IndexedQueryAnalyzer::analyze` call (`spec.md` §4.5 step 3's
    /// synthetic join-binding atom needs a slot past every real one in the
    /// *whole* filter, not just this disjunct).
    pub fn analyze(
        &self,
        filter: &Filter,
        ordering: &[OrderingEntry],
        hints: &QueryHints,
        total_params: usize,
    ) -> Result<UnionPlan, PlanError> {
        let reduced = reduce::reduce(filter.clone());
        let branches = reduce::disjunctive_normal_form_split(&reduced)?;
        if branches.is_empty() {
            return Ok(UnionPlan::Empty);
        }

        let type_name = self.type_info.type_name();
        debug!(type_name, disjuncts = branches.len(), "dnf split");

        let mut results = Vec::with_capacity(branches.len());
        for atoms in &branches {
            let conjunct = super::result::atoms_to_filter(atoms);
            results.push(self.indexed.analyze(&conjunct, ordering, hints, total_params)?);
        }

        let before_merge = results.len();
        let merged = merge_fixed_point(results);
        if merged.len() < before_merge {
            debug!(type_name, before = before_merge, after = merged.len(), "merged subplans on matching indexes");
        }

        let before_collapse = merged.len();
        let collapsed = full_scan_collapse(merged);
        if collapsed.len() < before_collapse {
            debug!(type_name, "collapsed into a full scan: one disjunct matched no index");
        }

        if collapsed.len() == 1 {
            return Ok(UnionPlan::Single(collapsed.into_iter().next().expect("len checked above")));
        }

        let total_ordering = self.enforce_total_ordering(ordering, &collapsed);
        Ok(UnionPlan::Union { subplans: collapsed, total_ordering })
    }

    /// `spec.md` §4.6 step 5: if the requested ordering already contains
    /// some key of the record type, it is already a total order. Otherwise
    /// append the key whose properties best align with the *worst*-scored
    /// surviving subplan's chosen index, in that index's own order
    /// (`spec.md` §9: "optimize its access pattern" for the bottleneck).
    fn enforce_total_ordering(&self, ordering: &[OrderingEntry], subplans: &[AnalysisResult]) -> Vec<OrderingEntry> {
        let list = OrderingList::of(self.type_info.type_name().to_string(), ordering.to_vec());
        if self.type_info.keys().iter().any(|k| list.contains_key(k)) {
            return list.entries();
        }

        let worst = subplans.iter().min_by_key(|r| quality_rank(r)).expect("UnionPlan::Union always has subplans");
        let worst_properties: Vec<PropertyPath> = match &worst.chosen {
            ChosenIndex::Local(index) => index.properties.iter().map(|e| e.path.clone()).collect(),
            ChosenIndex::Foreign { inner_index, .. } => inner_index.properties.iter().map(|e| e.path.clone()).collect(),
        };

        let key = self
            .type_info
            .keys()
            .iter()
            .max_by_key(|k| k.properties.iter().filter(|p| worst_properties.contains(p)).count())
            .unwrap_or_else(|| self.type_info.primary_key());

        // Key properties in the worst index's order first (consistent with
        // its access pattern), then whatever key properties it doesn't
        // cover, in the key's own declared order.
        let mut key_order: Vec<PropertyPath> = worst_properties.iter().filter(|p| key.properties.contains(p)).cloned().collect();
        for p in &key.properties {
            if !key_order.contains(p) {
                key_order.push(p.clone());
            }
        }

        let mut entries = list.entries();
        for path in key_order {
            if !entries.iter().any(|e| e.path == path) {
                entries.push(OrderingEntry::asc(path));
            }
        }
        entries
    }
}

/// Smaller is worse. Ties break in `min_by_key`'s favor of the first
/// element, which is fine: the spec doesn't otherwise order same-quality
/// subplans.
fn quality_rank(r: &AnalysisResult) -> (usize, usize, i64) {
    let matches = r.score.filtering.identity_count() + usize::from(r.score.filtering.has_range_match());
    (usize::from(r.handles_anything()), matches, -(r.score.filtering.remainder_count() as i64))
}

/// `spec.md` §4.6 step 3: fuse every pair whose results use the same index
/// in the same way, until no more fusions are possible.
fn merge_fixed_point(mut results: Vec<AnalysisResult>) -> Vec<AnalysisResult> {
    loop {
        let mut merged_pair = None;
        'search: for i in 0..results.len() {
            for j in (i + 1)..results.len() {
                if results[i].can_merge_remainder(&results[j]) {
                    merged_pair = Some((i, j));
                    break 'search;
                }
            }
        }
        let Some((i, j)) = merged_pair else { return results };
        let fused = results[i].merge_remainder(&results[j]);
        // Remove the higher index first so the lower index stays valid.
        results.remove(j);
        results.remove(i);
        results.push(fused);
    }
}

/// `spec.md` §4.6 step 4: if any subplan handles nothing, fold every other
/// subplan's filter into it as an OR'd remainder, except subplans that both
/// have a filtering match and cross a reference (their joins would
/// otherwise explode into the full scan).
fn full_scan_collapse(results: Vec<AnalysisResult>) -> Vec<AnalysisResult> {
    let Some(sink_idx) = results.iter().position(|r| !r.handles_anything()) else {
        return results;
    };

    let mut sink = results[sink_idx].clone();
    let mut kept = Vec::with_capacity(results.len());
    for (i, r) in results.into_iter().enumerate() {
        if i == sink_idx {
            continue;
        }
        let exempt = r.score.filtering.has_any_match() && has_joined_atom(&r.conjunct);
        if exempt {
            kept.push(r);
        } else {
            sink = sink.merge_remainder(&r);
        }
    }
    kept.push(sink);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::indexed::IndexedQueryAnalyzer;
    use crate::score::{CompositeScore, FilteringScore, OrderingScore};
    use crate::types::{Direction, IndexDescriptor, Key, ReferenceProperty};
    use filter::PropertyFilter as PF;

    struct FakeType {
        name: &'static str,
        indexes: Vec<IndexDescriptor>,
        keys: Vec<Key>,
    }

    impl TypeInfo for FakeType {
        fn type_name(&self) -> &str { self.name }
        fn has_property(&self, _path: &PropertyPath) -> bool { true }
        fn keys(&self) -> &[Key] { &self.keys }
        fn indexes(&self) -> &[IndexDescriptor] { &self.indexes }
        fn reference_properties(&self) -> &[ReferenceProperty] { &[] }
    }

    struct NoCatalog;
    impl super::super::indexed::ForeignCatalog for NoCatalog {
        fn type_info(&self, _type_name: &str) -> Option<Arc<dyn TypeInfo>> { None }
    }

    fn user_type() -> Arc<dyn TypeInfo> {
        Arc::new(FakeType {
            name: "User",
            indexes: vec![
                IndexDescriptor::new("id", vec![OrderingEntry::asc("id")], true, true),
                IndexDescriptor::new("name", vec![OrderingEntry::asc("name")], false, false),
                IndexDescriptor::new("age_name", vec![OrderingEntry::asc("age"), OrderingEntry::asc("name")], false, false),
            ],
            keys: vec![Key::new("id", vec![PropertyPath::direct("id")])],
        })
    }

    fn analyzer() -> UnionQueryAnalyzer {
        let type_info = user_type();
        let indexed = IndexedQueryAnalyzer::new(type_info.clone(), Arc::new(NoCatalog));
        UnionQueryAnalyzer::new(type_info, indexed)
    }

    #[test]
    fn single_conjunct_is_a_single_plan() {
        let f = Filter::Compare(PF::eq("age", 30));
        let plan = analyzer().analyze(&f, &[OrderingEntry::asc("name")], &QueryHints::none(), 0).unwrap();
        assert!(matches!(plan, UnionPlan::Single(_)));
    }

    #[test]
    fn closed_filter_is_empty_plan() {
        let plan = analyzer().analyze(&Filter::Closed, &[], &QueryHints::none(), 0).unwrap();
        assert!(matches!(plan, UnionPlan::Empty));
    }

    #[test]
    fn mergeable_disjuncts_on_the_same_index_collapse_to_one_plan() {
        // name = "alice" OR name = "bob": both hit the {name} index the
        // same way, so the merge pass should fuse them into one subplan.
        let f = Filter::Compare(PF::eq("name", "alice")).or(Filter::Compare(PF::eq("name", "bob")));
        let plan = analyzer().analyze(&f, &[], &QueryHints::none(), 0).unwrap();
        assert!(matches!(plan, UnionPlan::Single(_)));
    }

    #[test]
    fn unmergeable_disjuncts_on_different_indexes_stay_separate() {
        // age = 30 OR name = "alice": different index shapes, no merge.
        let f = Filter::Compare(PF::eq("age", 30)).or(Filter::Compare(PF::eq("name", "alice")));
        let plan = analyzer().analyze(&f, &[], &QueryHints::none(), 0).unwrap();
        match plan {
            UnionPlan::Union { subplans, total_ordering } => {
                assert_eq!(subplans.len(), 2);
                // Ordering wasn't a total order (empty), so the primary key
                // must have been appended.
                assert!(total_ordering.iter().any(|e| e.path.to_string() == "id"));
            }
            other => panic!("expected a union plan, got a {}", match other {
                UnionPlan::Empty => "empty plan",
                UnionPlan::Single(_) => "single plan",
                UnionPlan::Union { .. } => unreachable!(),
            }),
        }
    }

    #[test]
    fn total_ordering_already_present_is_left_alone() {
        let f = Filter::Compare(PF::eq("age", 30)).or(Filter::Compare(PF::eq("name", "alice")));
        let plan = analyzer().analyze(&f, &[OrderingEntry::asc("id")], &QueryHints::none(), 0).unwrap();
        match plan {
            UnionPlan::Union { total_ordering, .. } => assert_eq!(total_ordering, vec![OrderingEntry::asc("id")]),
            _ => panic!("expected a union plan"),
        }
    }

    #[test]
    fn full_scan_collapse_folds_unmatched_disjunct_into_one_plan() {
        // age = 30 OR description EXISTS: the EXISTS branch matches no
        // index, so it becomes the full-scan sink and the whole thing
        // collapses to one plan.
        let f = Filter::Compare(PF::eq("age", 30)).or(Filter::Compare(PF::exists("description")));
        let plan = analyzer().analyze(&f, &[], &QueryHints::none(), 0).unwrap();
        assert!(matches!(plan, UnionPlan::Single(_)));
    }

    #[test]
    fn quality_rank_orders_worse_subplans_lower() {
        let idx_a = IndexDescriptor::new("a", vec![OrderingEntry::asc("a")], false, false);
        let conjunct = Filter::Compare(PF::eq("a", 1));
        let full = CompositeScore::new(FilteringScore::evaluate(&idx_a, &conjunct).unwrap(), OrderingScore::evaluate(&idx_a, Some(&conjunct), &[]).unwrap());
        let no_match = CompositeScore::new(
            FilteringScore::evaluate(&idx_a, &Filter::Open).unwrap(),
            OrderingScore::evaluate(&idx_a, Some(&Filter::Open), &[]).unwrap(),
        );
        let matched_result = AnalysisResult {
            conjunct: conjunct.clone(),
            score: full,
            chosen: ChosenIndex::Local(idx_a.clone()),
            remainder_filter: Filter::Open,
            remainder_ordering: vec![],
            merged_unbound: false,
        };
        let unmatched_result = AnalysisResult {
            conjunct: Filter::Open,
            score: no_match,
            chosen: ChosenIndex::Local(idx_a),
            remainder_filter: Filter::Open,
            remainder_ordering: vec![],
            merged_unbound: false,
        };
        assert!(quality_rank(&unmatched_result) < quality_rank(&matched_result));
    }
}
