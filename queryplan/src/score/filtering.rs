//! `FilteringScore` — how well one index matches a conjunct's atomic
//! filters (`spec.md` §4.2).

use filter::{ComparisonOperator, PropertyFilter};
use std::cmp::Ordering;

use crate::property_filter::{PositionedFilter, PropertyFilterList};
use crate::score::PreferenceScore;
use crate::types::{Direction, IndexDescriptor};

#[derive(Debug, Clone)]
pub struct FilteringScore {
    pub identity: Vec<PositionedFilter>,
    pub range_start: Option<PositionedFilter>,
    pub range_end: Option<PositionedFilter>,
    pub should_reverse_range: bool,
    pub arrangement_score: usize,
    pub preference: PreferenceScore,
    /// Atoms not consumed by identity or range matching, plus all EXISTS
    /// atoms — the part a downstream `Filtered` stage must re-check.
    pub remainder: Vec<PropertyFilter>,
    /// Remainder atoms whose property also appears in the index, checkable
    /// from the index tuple without fetching the base record.
    pub covering: Vec<PropertyFilter>,
    pub key_match: bool,
    pub index_property_count: usize,
    pub unique: bool,
    pub clustered: bool,
}

impl FilteringScore {
    pub fn identity_count(&self) -> usize { self.identity.len() }
    pub fn has_range_match(&self) -> bool { self.range_start.is_some() || self.range_end.is_some() }
    pub fn has_any_match(&self) -> bool { self.identity_count() > 0 || self.has_range_match() }
    pub fn remainder_count(&self) -> usize { self.remainder.len() }
    pub fn covering_count(&self) -> usize { self.covering.len() }

    /// Evaluate this index against a conjunct (`spec.md` §4.2 "Matching
    /// algorithm"). `conjunct` must be OR-free.
    pub fn evaluate(index: &IndexDescriptor, conjunct: &filter::Filter) -> Result<FilteringScore, crate::error::PlanError> {
        let list = PropertyFilterList::of(conjunct)?;
        let total = list.total_count;

        // `consumed[i]` tracks whether `list.atoms[i]` has been matched away.
        let mut consumed = vec![false; list.atoms.len()];
        let mut identity = Vec::new();
        let mut range_start = None;
        let mut range_end = None;
        let mut should_reverse_range = false;
        let mut arrangement_score = 0usize;
        let mut preference = PreferenceScore::empty(total);
        let mut previous_list_pos: Option<usize> = None;
        let mut index_pos = 0usize;

        // Identity phase: walk index positions left to right matching EQ atoms.
        while index_pos < index.properties.len() {
            let entry = &index.properties[index_pos];
            let found = list
                .atoms
                .iter()
                .enumerate()
                .find(|(i, pf)| !consumed[*i] && pf.filter.op == ComparisonOperator::Eq && pf.filter.path == entry.path);
            match found {
                Some((list_idx, positioned)) => {
                    consumed[list_idx] = true;
                    identity.push(positioned.clone());
                    preference.set(positioned.original_position);
                    if previous_list_pos.map_or(true, |p| list_idx >= p) {
                        arrangement_score += 1;
                    }
                    previous_list_pos = Some(list_idx);
                    index_pos += 1;
                }
                None => break,
            }
        }

        // Range phase: atoms on the index position immediately after the
        // last identity match.
        if index_pos < index.properties.len() {
            let entry = &index.properties[index_pos];
            let mut terminated_by_ne = false;
            for (i, pf) in list.atoms.iter().enumerate() {
                if consumed[i] || pf.filter.path != entry.path {
                    continue;
                }
                match pf.filter.op {
                    ComparisonOperator::Gt | ComparisonOperator::Ge if range_start.is_none() => {
                        consumed[i] = true;
                        preference.set(pf.original_position);
                        range_start = Some(pf.clone());
                    }
                    ComparisonOperator::Lt | ComparisonOperator::Le if range_end.is_none() => {
                        consumed[i] = true;
                        preference.set(pf.original_position);
                        range_end = Some(pf.clone());
                    }
                    ComparisonOperator::Ne => {
                        terminated_by_ne = true;
                    }
                    _ => {}
                }
            }
            let _ = terminated_by_ne;
            if (range_start.is_some() || range_end.is_some()) && entry.direction == Direction::Descending {
                should_reverse_range = true;
            }
        }

        let remainder_atoms: Vec<PropertyFilter> = list
            .atoms
            .iter()
            .enumerate()
            .filter(|(i, _)| !consumed[*i])
            .map(|(_, pf)| pf.filter.clone())
            .chain(list.exists.iter().map(|pf| pf.filter.clone()))
            .collect();

        let has_any_preliminary_match = !identity.is_empty() || range_start.is_some() || range_end.is_some();
        let covering = if has_any_preliminary_match {
            remainder_atoms
                .iter()
                .filter(|pf| index.properties.iter().any(|e| e.path == pf.path))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        let key_match = index.unique && identity.len() == index.properties.len();

        Ok(FilteringScore {
            identity,
            range_start,
            range_end,
            should_reverse_range,
            arrangement_score,
            preference,
            remainder: remainder_atoms,
            covering,
            key_match,
            index_property_count: index.properties.len(),
            unique: index.unique,
            clustered: index.clustered,
        })
    }
}

/// `spec.md` §4.2 "Partial comparator (range-only)": the seed comparator
/// reused by `CompositeScore`'s full comparator. `Ordering::Greater` means
/// `a` is the preferred index.
pub fn range_comparator(a: Option<&FilteringScore>, b: Option<&FilteringScore>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (Some(a), Some(b)) => {
            let by_identity = a.identity_count().cmp(&b.identity_count());
            if by_identity != Ordering::Equal {
                return by_identity;
            }
            let by_range_presence = a.has_range_match().cmp(&b.has_range_match());
            if by_range_presence != Ordering::Equal {
                return by_range_presence;
            }
            if a.has_range_match() && b.has_range_match() {
                return a.clustered.cmp(&b.clustered);
            }
            if a.identity_count() > 0 || b.identity_count() > 0 {
                return a.clustered.cmp(&b.clustered);
            }
            Ordering::Equal
        }
    }
}

/// `spec.md` §4.2 "Full comparator". `Greater` means `a` wins.
pub fn full_filtering_comparator(a: &FilteringScore, b: &FilteringScore) -> Ordering {
    range_comparator(Some(a), Some(b))
        .then_with(|| a.has_any_match().cmp(&b.has_any_match()))
        .then_with(|| a.arrangement_score.cmp(&b.arrangement_score))
        .then_with(|| a.clustered.cmp(&b.clustered))
        .then_with(|| b.remainder_count().cmp(&a.remainder_count()))
        .then_with(|| a.covering_count().cmp(&b.covering_count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderingEntry;
    use filter::{ComparisonOperator as Op, Filter, PropertyFilter as PF};

    fn idx(name: &str, props: Vec<OrderingEntry>, unique: bool, clustered: bool) -> IndexDescriptor {
        IndexDescriptor::new(name, props, unique, clustered)
    }

    #[test]
    fn single_eq_against_composite_index_is_identity_match() {
        let index = idx("age_name", vec![OrderingEntry::asc("age"), OrderingEntry::asc("name")], false, false);
        let conjunct = Filter::Compare(PF::eq("age", 30));
        let score = FilteringScore::evaluate(&index, &conjunct).unwrap();
        assert_eq!(score.identity_count(), 1);
        assert!(score.remainder.is_empty());
    }

    #[test]
    fn range_pair_on_same_property_yields_start_and_end() {
        let index = idx("age", vec![OrderingEntry::asc("age")], false, false);
        let conjunct = Filter::Compare(PF::cmp("age", Op::Gt, 18)).and(Filter::Compare(PF::cmp("age", Op::Lt, 65)));
        let score = FilteringScore::evaluate(&index, &conjunct).unwrap();
        assert!(score.range_start.is_some());
        assert!(score.range_end.is_some());
        assert!(score.remainder.is_empty());
    }

    #[test]
    fn unmatched_atom_becomes_remainder() {
        let index = idx("age", vec![OrderingEntry::asc("age")], false, false);
        let conjunct = Filter::Compare(PF::eq("age", 30)).and(Filter::Compare(PF::eq("name", "alice")));
        let score = FilteringScore::evaluate(&index, &conjunct).unwrap();
        assert_eq!(score.identity_count(), 1);
        assert_eq!(score.remainder.len(), 1);
        assert_eq!(score.remainder[0].path.to_string(), "name");
    }

    #[test]
    fn unique_index_fully_matched_is_key_match() {
        let index = idx("id", vec![OrderingEntry::asc("id")], true, true);
        let conjunct = Filter::Compare(PF::eq("id", 7));
        let score = FilteringScore::evaluate(&index, &conjunct).unwrap();
        assert!(score.key_match);
    }

    #[test]
    fn descending_range_position_sets_reverse_flag() {
        let index = idx("age", vec![OrderingEntry::desc("age")], false, false);
        let conjunct = Filter::Compare(PF::cmp("age", Op::Gt, 18));
        let score = FilteringScore::evaluate(&index, &conjunct).unwrap();
        assert!(score.should_reverse_range);
    }
}
