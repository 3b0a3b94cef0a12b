//! `IndexedQueryAnalyzer` (`spec.md` §4.5): picks the best local or foreign
//! index for one OR-free conjunct.

use std::sync::Arc;

use dashmap::DashMap;
use filter::{Filter, PropertyPath};
use tracing::debug;

use super::result::{atoms_to_filter, eq_atom, remainder_as_filter, AnalysisResult, ChosenIndex, FULL_SCAN_SENTINEL};
use crate::error::PlanError;
use crate::score::{CompositeScore, FilteringScore, OrderingScore};
use crate::storage::QueryHints;
use crate::types::{IndexDescriptor, OrderingEntry, TypeInfo};

/// Looks up a record type's `TypeInfo` by name, for virtual-index
/// construction across a reference (join) property (`spec.md` §4.5 step
/// 3). Implemented by the embedder — this crate has no catalog of its own.
pub trait ForeignCatalog: Send + Sync {
    fn type_info(&self, type_name: &str) -> Option<Arc<dyn TypeInfo>>;
}

struct ForeignPath {
    hop: String,
    referenced_type: String,
    outer_index: IndexDescriptor,
    outer_score: FilteringScore,
    internal_keys: Vec<PropertyPath>,
    external_keys: Vec<PropertyPath>,
}

/// The requested ordering's entries that cross `hop`, re-rooted in the
/// referenced type's own namespace — the ordering an outer index must
/// satisfy for the join to come back already sorted (`spec.md` §4.5 step 3:
/// "score virtual indexes against the conjunct and ordering").
fn ordering_for_hop(ordering: &[OrderingEntry], hop: &str) -> Vec<OrderingEntry> {
    ordering
        .iter()
        .filter(|e| e.path.starts_with_hop(hop))
        .map(|e| OrderingEntry::new(e.path.strip_first_hop().expect("filtered by starts_with_hop"), e.direction))
        .collect()
}

pub struct IndexedQueryAnalyzer {
    type_info: Arc<dyn TypeInfo>,
    catalog: Arc<dyn ForeignCatalog>,
    /// "Analyzer foreign-index caches are per-analyzer and also
    /// synchronized" (`spec.md` §5) — memoizes, per hop, whether a proper
    /// (non-outer-join) reference exists and its referenced `TypeInfo`.
    foreign_cache: DashMap<String, Option<Arc<dyn TypeInfo>>>,
}

impl IndexedQueryAnalyzer {
    pub fn new(type_info: Arc<dyn TypeInfo>, catalog: Arc<dyn ForeignCatalog>) -> Self {
        Self { type_info, catalog, foreign_cache: DashMap::new() }
    }

    fn referenced_type(&self, hop: &str) -> Option<Arc<dyn TypeInfo>> {
        if let Some(cached) = self.foreign_cache.get(hop) {
            return cached.clone();
        }
        let resolved = self.type_info.reference_property(hop).filter(|r| !r.outer_join).and_then(|r| self.catalog.type_info(&r.referenced_type));
        self.foreign_cache.insert(hop.to_string(), resolved.clone());
        resolved
    }

    /// `spec.md` §4.5 "Procedure". `total_params` is the bound filter's
    /// own parameter count (`BoundFilter::initial_filter_values().len()`),
    /// used to pick a collision-free parameter slot for the synthetic
    /// join-binding atom (see `DESIGN.md` "Join parameter binding").
    pub fn analyze(
        &self,
        conjunct: &Filter,
        ordering: &[OrderingEntry],
        hints: &QueryHints,
        total_params: usize,
    ) -> Result<AnalysisResult, PlanError> {
        let type_name = self.type_info.type_name();
        let best_local = self.best_local(conjunct, ordering, hints)?;

        if let Some((index, score)) = &best_local {
            if score.filtering.key_match {
                debug!(type_name, index = index.name.as_str(), "index selection: key match on local index");
                return Ok(self.finish_local(conjunct, index.clone(), score.clone()));
            }
        }

        let best_foreign = self.best_foreign(conjunct, ordering, hints, total_params)?;

        match (best_local, best_foreign) {
            (Some((index, local_score)), Some(foreign)) => {
                if local_score.compare_local_vs_foreign(&foreign.1, hints) == std::cmp::Ordering::Less {
                    debug!(type_name, hop = foreign.2.hop.as_str(), outer_index = foreign.2.outer_index.name.as_str(), "index selection: foreign index beats local");
                    Ok(self.finish_foreign(conjunct, foreign, total_params))
                } else {
                    debug!(type_name, index = index.name.as_str(), "index selection: local index beats foreign");
                    Ok(self.finish_local(conjunct, index, local_score))
                }
            }
            (Some((index, local_score)), None) => {
                debug!(type_name, index = index.name.as_str(), "index selection: only local candidate");
                Ok(self.finish_local(conjunct, index, local_score))
            }
            (None, Some(foreign)) => {
                debug!(type_name, hop = foreign.2.hop.as_str(), "index selection: only foreign candidate");
                Ok(self.finish_foreign(conjunct, foreign, total_params))
            }
            (None, None) => {
                debug!(type_name, "index selection: no index matched, falling back to full scan");
                self.finish_full_scan(conjunct, ordering)
            }
        }
    }

    fn best_local(
        &self,
        conjunct: &Filter,
        ordering: &[OrderingEntry],
        hints: &QueryHints,
    ) -> Result<Option<(IndexDescriptor, CompositeScore)>, PlanError> {
        let mut best: Option<(IndexDescriptor, CompositeScore)> = None;
        for index in self.type_info.indexes() {
            let filtering = FilteringScore::evaluate(index, conjunct)?;
            let ordering_score = OrderingScore::evaluate(index, Some(conjunct), ordering)?;
            if !filtering.has_any_match() && ordering_score.handled.is_empty() {
                continue;
            }
            let composite = CompositeScore::new(filtering, ordering_score);
            best = match best {
                None => Some((index.clone(), composite)),
                Some((best_index, best_composite)) => {
                    if composite.compare_full(&best_composite, hints) == std::cmp::Ordering::Greater {
                        Some((index.clone(), composite))
                    } else {
                        Some((best_index, best_composite))
                    }
                }
            };
        }
        Ok(best)
    }

    /// `spec.md` §4.5 step 3: for every hop present among the conjunct's
    /// atoms, score the referenced type's own indexes against the
    /// cross-hop atoms (in the referenced type's namespace — no prefix
    /// needed there, since the outer executor runs directly against the
    /// referenced type's storage).
    fn best_foreign(
        &self,
        conjunct: &Filter,
        ordering: &[OrderingEntry],
        hints: &QueryHints,
        total_params: usize,
    ) -> Result<Option<(IndexDescriptor, CompositeScore, ForeignPath)>, PlanError> {
        let atoms = crate::property_filter::PropertyFilterList::of(conjunct)?;
        let flat: Vec<_> = atoms.atoms.iter().chain(atoms.exists.iter()).map(|pf| pf.filter.clone()).collect();
        let mut hops: Vec<String> = Vec::new();
        for pf in &flat {
            if let Some(hop) = pf.path.first_hop() {
                if !hops.contains(&hop.to_string()) {
                    hops.push(hop.to_string());
                }
            }
        }

        let mut best: Option<(IndexDescriptor, CompositeScore, ForeignPath)> = None;
        for hop in hops {
            let Some(referenced) = self.referenced_type(&hop) else { continue };
            let Some(reference) = self.type_info.reference_property(&hop) else { continue };

            let joined_atoms = filter::reduce::as_joined_from(&flat, &hop);
            if joined_atoms.is_empty() {
                continue;
            }
            let foreign_conjunct = atoms_to_filter(&joined_atoms);

            let hop_ordering = ordering_for_hop(ordering, &hop);
            let mut hop_best: Option<(IndexDescriptor, FilteringScore, CompositeScore)> = None;
            for index in referenced.indexes() {
                let filtering = FilteringScore::evaluate(index, &foreign_conjunct)?;
                if !filtering.has_any_match() {
                    continue;
                }
                let ordering_score = OrderingScore::evaluate(index, Some(&foreign_conjunct), &hop_ordering)?;
                let composite = CompositeScore::new(filtering.clone(), ordering_score);
                hop_best = match hop_best {
                    None => Some((index.clone(), filtering, composite)),
                    Some((bi, bf, bc)) => {
                        if composite.compare_full(&bc, hints) == std::cmp::Ordering::Greater {
                            Some((index.clone(), filtering, composite))
                        } else {
                            Some((bi, bf, bc))
                        }
                    }
                };
            }
            let Some((outer_index, outer_score, _)) = hop_best else { continue };

            // The inner plan: atoms of this conjunct that don't cross the
            // hop, plus a synthetic identity atom binding the internal key
            // (the value is supplied per outer row by the `JoinResolver`,
            // not known at analysis time).
            let local_atoms = filter::reduce::not_joined_from(&flat, &hop);
            let mut inner_conjunct = atoms_to_filter(&local_atoms);
            for (i, internal_key) in reference.internal_keys.iter().enumerate() {
                inner_conjunct = inner_conjunct.and(Filter::Compare(eq_atom(internal_key.clone(), total_params + i)));
            }

            let mut inner_best: Option<(IndexDescriptor, CompositeScore)> = None;
            for index in self.type_info.indexes() {
                let filtering = FilteringScore::evaluate(index, &inner_conjunct)?;
                let ordering_score = OrderingScore::evaluate(index, Some(&inner_conjunct), ordering)?;
                let composite = CompositeScore::new(filtering, ordering_score);
                inner_best = match inner_best {
                    None => Some((index.clone(), composite)),
                    Some((bi, bc)) => {
                        if composite.compare_full(&bc, hints) == std::cmp::Ordering::Greater {
                            Some((index.clone(), composite))
                        } else {
                            Some((bi, bc))
                        }
                    }
                };
            }
            let Some((inner_index, inner_composite)) = inner_best else { continue };

            let path = ForeignPath {
                hop: hop.clone(),
                referenced_type: reference.referenced_type.clone(),
                outer_index,
                outer_score,
                internal_keys: reference.internal_keys.clone(),
                external_keys: reference.external_keys.clone(),
            };

            best = match best {
                None => Some((inner_index, inner_composite, path)),
                Some((bi, bc, bp)) => {
                    if inner_composite.compare_full(&bc, hints) == std::cmp::Ordering::Greater {
                        Some((inner_index, inner_composite, path))
                    } else {
                        Some((bi, bc, bp))
                    }
                }
            };
        }
        Ok(best)
    }

    fn finish_local(&self, conjunct: &Filter, index: IndexDescriptor, score: CompositeScore) -> AnalysisResult {
        let remainder_filter = remainder_as_filter(&score.filtering);
        let remainder_ordering = score.ordering.remainder.clone();
        AnalysisResult {
            conjunct: conjunct.clone(),
            score,
            chosen: ChosenIndex::Local(index),
            remainder_filter,
            remainder_ordering,
            merged_unbound: false,
        }
    }

    fn finish_foreign(&self, conjunct: &Filter, foreign: (IndexDescriptor, CompositeScore, ForeignPath), total_params: usize) -> AnalysisResult {
        let (inner_index, inner_composite, path) = foreign;
        let remainder_filter = remainder_as_filter(&inner_composite.filtering);
        let remainder_ordering = inner_composite.ordering.remainder.clone();
        AnalysisResult {
            conjunct: conjunct.clone(),
            score: inner_composite,
            chosen: ChosenIndex::Foreign {
                hop: path.hop,
                referenced_type: path.referenced_type,
                outer_index: path.outer_index,
                outer_filtering: path.outer_score,
                inner_index,
                join_param_base: total_params,
                internal_keys: path.internal_keys,
                external_keys: path.external_keys,
            },
            remainder_filter,
            remainder_ordering,
            merged_unbound: false,
        }
    }

    /// `spec.md` §8: "Empty filter + empty ordering ⇒ plan is a single
    /// FullScan." No index matched anything, so the chosen index is the
    /// `FULL_SCAN_SENTINEL` marker `base_executor_for` special-cases into a
    /// genuine `FullScan`, and the entire conjunct is re-checked as remainder.
    fn finish_full_scan(&self, conjunct: &Filter, ordering: &[OrderingEntry]) -> Result<AnalysisResult, PlanError> {
        let sentinel = IndexDescriptor::new(FULL_SCAN_SENTINEL, vec![], false, false);
        let score = CompositeScore::new(FilteringScore::evaluate(&sentinel, conjunct)?, OrderingScore::evaluate(&sentinel, Some(conjunct), ordering)?);
        Ok(AnalysisResult {
            conjunct: conjunct.clone(),
            score,
            chosen: ChosenIndex::Local(sentinel),
            remainder_filter: conjunct.clone(),
            remainder_ordering: ordering.to_vec(),
            merged_unbound: true,
        })
    }
}
