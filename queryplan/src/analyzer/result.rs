//! The `IndexedQueryAnalyzer`'s `Result` (`spec.md` §4.5): the chosen
//! index (local or foreign), the composite score that won it, and the
//! remainder filter/ordering an executor must still apply.

use std::sync::Arc;

use filter::{ComparisonOperator, Filter, PropertyFilter, PropertyPath};

use crate::exec::{Executor, Filtered, FullScan, FullScanIndexed, Indexed, Key, Sorted};
use crate::ordering::OrderingList;
use crate::score::{CompositeScore, FilteringScore};
use crate::storage::{QueryHints, StorageAccess, StorageError};
use crate::types::{IndexDescriptor, OrderingEntry};
use crate::PlanError;

/// `IndexDescriptor::new`'s name for `IndexedQueryAnalyzer::finish_full_scan`'s
/// sentinel — no index matched anything, so `base_executor_for` routes it to
/// a genuine storage-native [`FullScan`] rather than any real index.
pub(crate) const FULL_SCAN_SENTINEL: &str = "__full_scan__";

/// The index a `Result` resolved to use.
#[derive(Debug, Clone)]
pub enum ChosenIndex {
    Local(IndexDescriptor),
    /// `spec.md` §4.5 step 3: a virtual index reached by joining through
    /// `hop`. `outer_index`/`outer_filtering` score the atoms that cross
    /// the hop, in the referenced type's own namespace — an embedder's
    /// `JoinResolver` uses them to build the outer executor, since this
    /// crate has no storage handle for the referenced type. `inner_index`
    /// is the best local index on the *target* type for what's left,
    /// including a synthetic identity atom binding the internal key
    /// (`join_param_base` documents where that synthetic parameter lives —
    /// see `DESIGN.md` "Join parameter binding").
    Foreign {
        hop: String,
        referenced_type: String,
        outer_index: IndexDescriptor,
        outer_filtering: FilteringScore,
        inner_index: IndexDescriptor,
        join_param_base: usize,
        internal_keys: Vec<PropertyPath>,
        external_keys: Vec<PropertyPath>,
    },
}

/// One conjunct's chosen access path (`spec.md` §4.5 "Result").
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// The conjunct's full filter — handled atoms AND remainder atoms —
    /// exactly as passed to the analyzer. Used unmodified by
    /// `merge_remainder`/the full-scan collapse to rebuild a safe
    /// superset filter when individual atoms can no longer be told apart.
    pub conjunct: Filter,
    pub score: CompositeScore,
    pub chosen: ChosenIndex,
    /// Overrides the score's embedded remainder after a merge (`spec.md`
    /// §4.5 Result API: "the applicable remainder filter/ordering... which
    /// overrides the score's embedded remainder after merges").
    pub remainder_filter: Filter,
    pub remainder_ordering: Vec<OrderingEntry>,
    /// Set by `merge_remainder`: once true, the chosen index's identity/
    /// range atoms may no longer be bound to a literal value (two merged
    /// disjuncts can disagree on that value), so `create_executor` falls
    /// back to an unbounded scan of the same index and relies entirely on
    /// `remainder_filter` for correctness. See `DESIGN.md` "Merged result
    /// identity binding".
    pub merged_unbound: bool,
}

impl AnalysisResult {
    pub fn handles_anything(&self) -> bool { self.score.filtering.has_any_match() || !self.score.ordering.handled.is_empty() }

    pub fn is_foreign(&self) -> bool { matches!(self.chosen, ChosenIndex::Foreign { .. }) }

    /// `spec.md` §4.5: "true iff both results use the same index in the
    /// same way (same clustered/unique/propertyCount/arrangement/
    /// preference/reverse/handled-atoms/orderings). The only allowed
    /// difference is the remainder." Handled-atom *shape* (which
    /// properties/operators were consumed), not the bound literal value,
    /// is what must agree — see `DESIGN.md` for why.
    pub fn can_merge_remainder(&self, other: &AnalysisResult) -> bool {
        same_index_identity(&self.chosen, &other.chosen)
            && same_filtering_shape(&self.score.filtering, &other.score.filtering)
            && same_ordering_shape(&self.score.ordering, &other.score.ordering)
    }

    /// `spec.md` §4.5: "the handled part is unchanged and... the remainder
    /// is `this.remainder OR other.remainder`". We instead OR the two
    /// full conjuncts together (see `DESIGN.md`): safe whenever the two
    /// sides bound a shared identity/range position to different literal
    /// values, which `can_merge_remainder`'s shape-only check permits.
    pub fn merge_remainder(&self, other: &AnalysisResult) -> AnalysisResult {
        let mut remainder_ordering = self.remainder_ordering.clone();
        for entry in &other.remainder_ordering {
            if !remainder_ordering.iter().any(|e| e.path == entry.path) {
                remainder_ordering.push(entry.clone());
            }
        }
        AnalysisResult {
            conjunct: self.conjunct.clone().or(other.conjunct.clone()),
            score: self.score.clone(),
            chosen: self.chosen.clone(),
            remainder_filter: self.conjunct.clone().or(other.conjunct.clone()),
            remainder_ordering,
            merged_unbound: true,
        }
    }

    /// Builds the executor tree for a *local* result (`spec.md` §4.5
    /// `createExecutor`). Foreign results are built by the embedder via a
    /// `JoinResolver` (`analyzer::JoinResolver`) since this crate has no
    /// concrete record model for the referenced type.
    pub fn create_executor<S>(
        &self,
        type_name: &str,
        support: Arc<dyn StorageAccess<S>>,
    ) -> Result<Arc<dyn Executor<S>>, PlanError<StorageError>>
    where
        S: filter::selection::Filterable + crate::exec::sorted::Orderable + Send + Sync + 'static,
    {
        let ChosenIndex::Local(index) = &self.chosen else {
            return Err(PlanError::UnsupportedFilter);
        };

        let base = base_executor_for(type_name, index.clone(), &self.score.filtering, &self.score.ordering, self.merged_unbound, support);
        Ok(wrap_with_remainder(base, &self.remainder_filter, &self.score.ordering.handled, &self.remainder_ordering))
    }

    /// The ordering this result's executor tree will advertise, before any
    /// plan-level union/total-ordering wrapper is applied.
    pub fn advertised_ordering(&self, type_name: &str) -> OrderingList {
        let mut entries = self.score.ordering.handled.clone();
        entries.extend(self.remainder_ordering.iter().cloned());
        OrderingList::of(type_name.to_string(), entries)
    }
}

/// Picks the executor primitive for one index given its filtering and
/// ordering scores — shared between a local result's `create_executor` and a
/// `JoinResolver` building the inner side of a foreign result (`spec.md`
/// §4.5 `createExecutor`: "storage-delegate passthrough when available, else
/// FullScan / Key / Indexed executor").
pub fn base_executor_for<S: Send + Sync + 'static>(
    type_name: &str,
    index: IndexDescriptor,
    filtering: &FilteringScore,
    ordering: &crate::score::OrderingScore,
    unbound: bool,
    support: Arc<dyn StorageAccess<S>>,
) -> Arc<dyn Executor<S>> {
    // A range atom on a descending index position and an ordering request
    // that conflicts with an ascending one both mean "iterate this index
    // backwards" — independent reasons, same storage-level flag.
    let reverse_order = filtering.should_reverse_range || ordering.should_reverse_order;
    if index.name == FULL_SCAN_SENTINEL {
        Arc::new(FullScan::new(type_name.to_string(), support))
    } else if unbound {
        Arc::new(FullScanIndexed::new(type_name.to_string(), index, reverse_order, support))
    } else if filtering.key_match {
        Arc::new(Key::new(type_name.to_string(), index, filtering.clone(), support))
    } else if filtering.has_any_match() {
        Arc::new(Indexed::new(type_name.to_string(), index, filtering.clone(), reverse_order, support))
    } else {
        Arc::new(FullScanIndexed::new(type_name.to_string(), index, reverse_order, support))
    }
}

/// Wraps `base` in `Filtered`/`Sorted` stages for whatever remainder is
/// left, in that order (`spec.md` §4.5 `createExecutor`).
pub fn wrap_with_remainder<S>(
    base: Arc<dyn Executor<S>>,
    remainder_filter: &Filter,
    handled_ordering: &[OrderingEntry],
    remainder_ordering: &[OrderingEntry],
) -> Arc<dyn Executor<S>>
where
    S: filter::selection::Filterable + crate::exec::sorted::Orderable + Send + Sync + 'static,
{
    let with_filter: Arc<dyn Executor<S>> =
        if remainder_filter.is_open() { base } else { Arc::new(Filtered::new(base, remainder_filter.clone())) };

    if remainder_ordering.is_empty() {
        with_filter
    } else {
        Arc::new(Sorted::new(with_filter, handled_ordering.to_vec(), remainder_ordering.to_vec()))
    }
}

fn same_index_identity(a: &ChosenIndex, b: &ChosenIndex) -> bool {
    match (a, b) {
        (ChosenIndex::Local(a), ChosenIndex::Local(b)) => a.name == b.name,
        (ChosenIndex::Foreign { hop: ha, inner_index: ia, .. }, ChosenIndex::Foreign { hop: hb, inner_index: ib, .. }) => {
            ha == hb && ia.name == ib.name
        }
        _ => false,
    }
}

fn same_filtering_shape(a: &crate::score::FilteringScore, b: &crate::score::FilteringScore) -> bool {
    a.clustered == b.clustered
        && a.unique == b.unique
        && a.index_property_count == b.index_property_count
        && a.arrangement_score == b.arrangement_score
        && a.preference == b.preference
        && a.should_reverse_range == b.should_reverse_range
        && a.identity.len() == b.identity.len()
        && a.identity.iter().zip(&b.identity).all(|(x, y)| x.filter.path == y.filter.path && x.filter.op == y.filter.op)
        && a.range_start.as_ref().map(|p| &p.filter.path) == b.range_start.as_ref().map(|p| &p.filter.path)
        && a.range_end.as_ref().map(|p| &p.filter.path) == b.range_end.as_ref().map(|p| &p.filter.path)
}

fn same_ordering_shape(a: &crate::score::OrderingScore, b: &crate::score::OrderingScore) -> bool {
    a.handled.len() == b.handled.len() && a.handled.iter().zip(&b.handled).all(|(x, y)| x == y)
}

/// AND together a conjunct's flattened atoms (the shape produced by
/// `filter::reduce::disjunctive_normal_form_split`'s inner branches).
pub fn atoms_to_filter(atoms: &[PropertyFilter]) -> Filter {
    atoms.iter().cloned().fold(Filter::Open, |acc, pf| acc.and(Filter::Compare(pf)))
}

/// True if any atom in `filter` crosses a reference hop — used by the
/// union analyzer's full-scan-collapse exemption (`spec.md` §4.6 step 4).
pub fn has_joined_atom(filter: &Filter) -> bool {
    match filter {
        Filter::Open | Filter::Closed => false,
        Filter::Compare(pf) => !pf.path.is_direct(),
        Filter::And(l, r) | Filter::Or(l, r) => has_joined_atom(l) || has_joined_atom(r),
        Filter::Not(f) => has_joined_atom(f),
    }
}

/// The remainder atoms of a `FilteringScore` plus its `EXISTS` atoms,
/// rendered back into a `Filter` tree for the `Result`'s own remainder.
pub fn remainder_as_filter(score: &crate::score::FilteringScore) -> Filter { atoms_to_filter(&score.remainder) }

/// `spec.md` §4.3's ordering remainder, rendered as a fresh `OrderingList`
/// convenience; kept here since both analyzers need it.
pub fn eq_atom(path: PropertyPath, param_index: usize) -> PropertyFilter {
    PropertyFilter::param(path, ComparisonOperator::Eq, param_index)
}
