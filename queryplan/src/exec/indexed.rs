//! `Indexed` executor (`spec.md` §4.7): a range/identity scan over a
//! non-key index, with optional covering-index (index-entry-query) access.

use async_trait::async_trait;
use dashmap::DashMap;
use filter::{Filter, FilterValues, PropertyFilter};
use std::sync::Arc;

use super::{indent_str, Executor};
use crate::error::PlanError;
use crate::ordering::OrderingList;
use crate::score::FilteringScore;
use crate::storage::{Boundary, IndexEntryQuery, RecordStream, StorageAccess, StorageError};
use crate::types::IndexDescriptor;

/// The folded (start, end) boundary pair an `Indexed` scan issues, after
/// tightening across every GT/GE/LT/LE atom on the index's range position
/// (`spec.md` §4.7: "the *tighter* bound wins").
#[derive(Debug, Clone)]
pub struct FoldedRange {
    pub start_boundary: Boundary,
    pub start_value: Option<filter::Value>,
    pub end_boundary: Boundary,
    pub end_value: Option<filter::Value>,
}

fn fold_bound(atom: &PropertyFilter, values: &FilterValues) -> Result<(Boundary, filter::Value), PlanError<StorageError>> {
    let expr = atom.expr.as_ref().expect("range atom always carries a value expression");
    let value = values.resolve(expr).map_err(PlanError::Filter)?.clone();
    let boundary = if atom.op.is_inclusive() { Boundary::Inclusive } else { Boundary::Exclusive };
    Ok((boundary, value))
}

/// The 9 slots correspond to the `(start_boundary, end_boundary)` product
/// (`Open`/`Inclusive`/`Exclusive` × `Open`/`Inclusive`/`Exclusive`) —
/// `spec.md` §4.7's "composed filter... cached per start/end-boundary
/// permutation (9 slots)" for covering-index access.
type IndexEntrySlotKey = (Boundary, Boundary);

pub struct Indexed<S> {
    type_name: String,
    index: IndexDescriptor,
    score: FilteringScore,
    /// Whether the final output must run opposite the index's declared
    /// direction — either because a range atom sits on a descending
    /// position, or because the requested ordering conflicted with an
    /// ascending one (`score::OrderingScore::should_reverse_order`). Kept
    /// separate from `score.should_reverse_range`, which only governs how a
    /// folded range bound maps onto `fetch_subset`'s start/end pair.
    reverse_order: bool,
    support: Arc<dyn StorageAccess<S>>,
    index_entry_cache: DashMap<IndexEntrySlotKey, ()>,
}

impl<S> Indexed<S> {
    pub fn new(
        type_name: impl Into<String>,
        index: IndexDescriptor,
        score: FilteringScore,
        reverse_order: bool,
        support: Arc<dyn StorageAccess<S>>,
    ) -> Self {
        Self { type_name: type_name.into(), index, score, reverse_order, support, index_entry_cache: DashMap::new() }
    }

    /// The identity atoms' bound values, in index-position order — the
    /// `identityValues` the executor contract hands to `fetch_subset`
    /// (`spec.md` §4.7 `Indexed`: "computes identityValues plus...").
    fn identity_values(&self, values: &FilterValues) -> Result<FilterValues, PlanError<StorageError>> {
        let resolved = self
            .score
            .identity
            .iter()
            .map(|pf| {
                let expr = pf.filter.expr.as_ref().expect("identity atom always carries a value expression");
                values.resolve(expr).map(Clone::clone)
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(PlanError::Filter)?;
        Ok(FilterValues::new(resolved))
    }

    fn folded_range(&self, values: &FilterValues) -> Result<FoldedRange, PlanError<StorageError>> {
        let start = self.score.range_start.as_ref().map(|pf| fold_bound(&pf.filter, values)).transpose()?;
        let end = self.score.range_end.as_ref().map(|pf| fold_bound(&pf.filter, values)).transpose()?;
        let (start_boundary, start_value) = start.map(|(b, v)| (b, Some(v))).unwrap_or((Boundary::Open, None));
        let (end_boundary, end_value) = end.map(|(b, v)| (b, Some(v))).unwrap_or((Boundary::Open, None));
        Ok(FoldedRange { start_boundary, start_value, end_boundary, end_value })
    }

    /// Handled index position count: identity matches plus one more if a
    /// range was produced.
    fn handled_count(&self) -> usize { self.score.identity.len() + usize::from(self.score.has_range_match()) }

    fn handled_ordering(&self) -> OrderingList {
        let entries = self.index.properties[..self.handled_count().min(self.index.properties.len())].to_vec();
        let mut list = OrderingList::of(self.type_name.clone(), entries);
        if self.reverse_order {
            list = list.reversed();
        }
        list
    }

    /// The covering-index atoms (`spec.md` §4.7), bound against `values` so
    /// storage receives concrete constants rather than `Param` slots it has
    /// no binding vector for.
    fn bound_covering_filter(&self, values: &FilterValues) -> Result<Filter, PlanError<StorageError>> {
        let mut f = Filter::Open;
        for pf in &self.score.covering {
            let expr = pf.expr.as_ref().expect("covering atom always carries a value expression");
            let value = values.resolve(expr).map_err(PlanError::Filter)?.clone();
            f = f.and(Filter::Compare(PropertyFilter { path: pf.path.clone(), op: pf.op, expr: Some(filter::Expr::Const(value)) }));
        }
        Ok(f)
    }

    fn covering_index_entry_query(&self, range: &FoldedRange, identity_values: &FilterValues, covering_filter: &Filter) -> Option<IndexEntryQuery> {
        if self.score.covering.is_empty() {
            return None;
        }
        let slot = (self.folded_slot_boundary(true), self.folded_slot_boundary(false));
        self.index_entry_cache.entry(slot).or_insert(());
        self.support.index_entry_query(
            &self.index,
            identity_values,
            range.start_boundary,
            range.start_value.clone(),
            range.end_boundary,
            range.end_value.clone(),
            covering_filter,
        )
    }

    fn folded_slot_boundary(&self, start: bool) -> Boundary {
        let pf = if start { &self.score.range_start } else { &self.score.range_end };
        match pf {
            Some(pf) if pf.filter.op.is_inclusive() => Boundary::Inclusive,
            Some(_) => Boundary::Exclusive,
            None => Boundary::Open,
        }
    }
}

#[async_trait]
impl<S: Send + Sync + 'static> Executor<S> for Indexed<S> {
    fn ordering(&self) -> OrderingList { self.handled_ordering() }

    fn filter(&self) -> Filter {
        let mut f = Filter::Open;
        for pf in &self.score.identity {
            f = f.and(Filter::Compare(pf.filter.clone()));
        }
        if let Some(pf) = &self.score.range_start {
            f = f.and(Filter::Compare(pf.filter.clone()));
        }
        if let Some(pf) = &self.score.range_end {
            f = f.and(Filter::Compare(pf.filter.clone()));
        }
        f
    }

    async fn fetch(&self, values: &FilterValues) -> Result<RecordStream<S>, PlanError<StorageError>> {
        let range = self.folded_range(values)?;
        let identity_values = self.identity_values(values)?;
        if !self.score.covering.is_empty() {
            let covering_filter = self.bound_covering_filter(values)?;
            if let Some(query) = self.covering_index_entry_query(&range, &identity_values, &covering_filter) {
                return self.support.fetch_from_index_entry_query(&self.index, query).await.map_err(PlanError::Storage);
            }
        }
        self.support
            .fetch_subset(
                &self.index,
                &identity_values,
                range.start_boundary,
                range.start_value,
                range.end_boundary,
                range.end_value,
                self.score.should_reverse_range,
                self.reverse_order,
            )
            .await
            .map_err(PlanError::Storage)
    }

    async fn count(&self, _values: &FilterValues) -> Result<Option<u64>, PlanError<StorageError>> { Ok(None) }

    fn print_plan(&self, indent: usize) -> String {
        let pad = indent_str(indent);
        let mut lines = vec![format!(
            "{pad}{}: {}",
            if self.index.clustered { "clustered index scan" } else { "index scan" },
            self.type_name
        )];
        lines.push(format!("{pad}...index: {}", self.index.name));
        if !self.score.identity.is_empty() {
            let atoms: Vec<String> = self.score.identity.iter().map(|pf| format!("{}", pf.filter.path)).collect();
            lines.push(format!("{pad}...identity filter: {}", atoms.join(", ")));
        }
        if self.score.has_range_match() {
            lines.push(format!("{pad}...range filter: {}", self.index.properties[self.score.identity.len()].path));
        }
        if !self.score.covering.is_empty() {
            let atoms: Vec<String> = self.score.covering.iter().map(|pf| format!("{}", pf.path)).collect();
            lines.push(format!("{pad}...covering filter: {}", atoms.join(", ")));
        }
        lines.join("\n")
    }
}
