//! `CompositeScore` — the (FilteringScore, OrderingScore) pair and its two
//! comparators (`spec.md` §4.4).

use std::cmp::Ordering;

use super::filtering::{full_filtering_comparator, range_comparator};
use super::ordering::full_ordering_comparator;
use super::{FilteringScore, OrderingScore};
use crate::storage::{QueryHint, QueryHints};

#[derive(Debug, Clone)]
pub struct CompositeScore {
    pub filtering: FilteringScore,
    pub ordering: OrderingScore,
}

impl CompositeScore {
    pub fn new(filtering: FilteringScore, ordering: OrderingScore) -> Self { Self { filtering, ordering } }

    fn ordering_worth_considering(&self, hints: &QueryHints) -> bool {
        hints.contains(QueryHint::ConsumeSlice)
            || self.filtering.clustered
            || self.filtering.identity_count() > 0
            || self.filtering.has_range_match()
    }

    /// `spec.md` §4.4 "Full" comparator, used when comparing indexes on a
    /// single record type. `Greater` means `self` is the preferred index.
    pub fn compare_full(&self, other: &CompositeScore, hints: &QueryHints) -> Ordering {
        if hints.contains(QueryHint::ConsumeSlice) {
            let oc = full_ordering_comparator(&self.ordering, &other.ordering);
            if oc != Ordering::Equal {
                return oc;
            }
        }

        let rc = range_comparator(Some(&self.filtering), Some(&other.filtering));
        if rc != Ordering::Equal {
            let handled_diff = self.ordering.handled.len().cmp(&other.ordering.handled.len());
            if handled_diff == rc || handled_diff == Ordering::Equal {
                return rc; // "double win", or ordering doesn't disagree
            }
            // Directions conflict: defer to the preference score.
            return self.filtering.preference.cmp(&other.filtering.preference);
        }

        if self.filtering.identity_count() + (self.filtering.has_range_match() as usize)
            == other.filtering.identity_count() + (other.filtering.has_range_match() as usize)
        {
            if self.ordering_worth_considering(hints) || other.ordering_worth_considering(hints) {
                let oc = full_ordering_comparator(&self.ordering, &other.ordering);
                if oc != Ordering::Equal {
                    return oc;
                }
            }
            return Ordering::Equal;
        }

        let fc = full_filtering_comparator(&self.filtering, &other.filtering);
        if fc != Ordering::Equal {
            return fc;
        }
        let oc = full_ordering_comparator(&self.ordering, &other.ordering);
        if oc != Ordering::Equal {
            return oc;
        }
        other.filtering.index_property_count.cmp(&self.filtering.index_property_count)
    }

    /// `spec.md` §4.4 "Local-vs-foreign": same sequence, but stops before
    /// the final tie-breaks that would otherwise overly favor the foreign
    /// (joined) path.
    pub fn compare_local_vs_foreign(&self, other: &CompositeScore, hints: &QueryHints) -> Ordering {
        if hints.contains(QueryHint::ConsumeSlice) {
            let oc = full_ordering_comparator(&self.ordering, &other.ordering);
            if oc != Ordering::Equal {
                return oc;
            }
        }

        let rc = range_comparator(Some(&self.filtering), Some(&other.filtering));
        if rc != Ordering::Equal {
            let handled_diff = self.ordering.handled.len().cmp(&other.ordering.handled.len());
            if handled_diff == rc || handled_diff == Ordering::Equal {
                return rc;
            }
            return self.filtering.preference.cmp(&other.filtering.preference);
        }

        if self.filtering.identity_count() + (self.filtering.has_range_match() as usize)
            == other.filtering.identity_count() + (other.filtering.has_range_match() as usize)
        {
            if self.ordering_worth_considering(hints) || other.ordering_worth_considering(hints) {
                return full_ordering_comparator(&self.ordering, &other.ordering);
            }
            return Ordering::Equal;
        }

        full_filtering_comparator(&self.filtering, &other.filtering)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IndexDescriptor, OrderingEntry};
    use filter::{Filter, PropertyFilter as PF};

    #[test]
    fn key_match_beats_partial_index() {
        let key_index = IndexDescriptor::new("id", vec![OrderingEntry::asc("id")], true, true);
        let other_index = IndexDescriptor::new("name", vec![OrderingEntry::asc("name")], false, false);
        let conjunct = Filter::Compare(PF::eq("id", 1));

        let key_score = CompositeScore::new(
            FilteringScore::evaluate(&key_index, &conjunct).unwrap(),
            OrderingScore::evaluate(&key_index, Some(&conjunct), &[]).unwrap(),
        );
        let other_score = CompositeScore::new(
            FilteringScore::evaluate(&other_index, &conjunct).unwrap(),
            OrderingScore::evaluate(&other_index, Some(&conjunct), &[]).unwrap(),
        );

        assert_eq!(key_score.compare_full(&other_score, &QueryHints::none()), Ordering::Greater);
    }
}
