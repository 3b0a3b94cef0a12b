//! `OrderingScore` — how much of a requested ordering an index satisfies,
//! given an optional conjunct supplying EQ-bound ("constant") properties
//! (`spec.md` §4.3).

use filter::{ComparisonOperator, Filter, PropertyPath};
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::property_filter::PropertyFilterList;
use crate::types::{Direction, IndexDescriptor, OrderingEntry};

#[derive(Debug, Clone)]
pub struct OrderingScore {
    pub handled: Vec<OrderingEntry>,
    pub remainder: Vec<OrderingEntry>,
    /// Index positions left over after the handled prefix, available for a
    /// cheap downstream ordering.
    pub free: Vec<OrderingEntry>,
    /// Index positions skipped because their property was already pinned
    /// by an EQ atom ("identity gap bridging").
    pub unused: Vec<PropertyPath>,
    pub should_reverse_order: bool,
    pub clustered: bool,
    pub index_property_count: usize,
}

impl OrderingScore {
    pub fn handled_ratio(&self) -> Option<f64> {
        let total = self.handled.len() + self.remainder.len();
        if total == 0 {
            None
        } else {
            Some(self.handled.len() as f64 / total as f64)
        }
    }

    pub fn evaluate(
        index: &IndexDescriptor,
        conjunct: Option<&Filter>,
        ordering: &[OrderingEntry],
    ) -> Result<OrderingScore, crate::error::PlanError> {
        let identity_set: HashSet<PropertyPath> = match conjunct {
            Some(f) => PropertyFilterList::of(f)?
                .atoms
                .iter()
                .filter(|pf| pf.filter.op == ComparisonOperator::Eq)
                .map(|pf| pf.filter.path.clone())
                .collect(),
            None => HashSet::new(),
        };

        if index.unique && index.properties.iter().all(|e| identity_set.contains(&e.path)) {
            return Ok(OrderingScore {
                handled: Vec::new(),
                remainder: Vec::new(),
                free: Vec::new(),
                unused: index.properties.iter().map(|e| e.path.clone()).collect(),
                should_reverse_order: false,
                clustered: index.clustered,
                index_property_count: index.properties.len(),
            });
        }

        let mut seen = HashSet::new();
        let mut handled: Vec<OrderingEntry> = Vec::new();
        let mut remainder = Vec::new();
        let mut unused = Vec::new();
        let mut should_reverse_order = false;
        let mut idx_pos = 0usize;
        let mut gap_closed = false;

        for entry in ordering {
            if !seen.insert(entry.path.clone()) {
                continue;
            }
            if identity_set.contains(&entry.path) {
                continue;
            }
            if gap_closed {
                remainder.push(entry.clone());
                continue;
            }

            loop {
                let Some(ip) = index.properties.get(idx_pos) else {
                    gap_closed = true;
                    remainder.push(entry.clone());
                    break;
                };
                if identity_set.contains(&ip.path) {
                    unused.push(ip.path.clone());
                    idx_pos += 1;
                    continue;
                }
                if ip.path != entry.path {
                    gap_closed = true;
                    remainder.push(entry.clone());
                    break;
                }

                let mut direction = entry.direction;
                if direction == Direction::Unspecified {
                    direction = ip.direction;
                } else if ip.direction != Direction::Unspecified && direction != ip.direction {
                    if !should_reverse_order {
                        should_reverse_order = true;
                        for h in handled.iter_mut() {
                            h.direction = h.direction.reversed();
                        }
                    } else if direction != ip.direction.reversed() {
                        gap_closed = true;
                        remainder.push(entry.clone());
                        idx_pos += 1;
                        break;
                    }
                }
                handled.push(OrderingEntry::new(entry.path.clone(), direction));
                idx_pos += 1;
                break;
            }
        }

        let free = index.properties[idx_pos.min(index.properties.len())..]
            .iter()
            .filter(|e| !identity_set.contains(&e.path))
            .cloned()
            .collect();

        Ok(OrderingScore {
            handled,
            remainder,
            free,
            unused,
            should_reverse_order,
            clustered: index.clustered,
            index_property_count: index.properties.len(),
        })
    }
}

/// `spec.md` §4.3 "Full comparator". `Greater` means `a` wins.
pub fn full_ordering_comparator(a: &OrderingScore, b: &OrderingScore) -> Ordering {
    let ratio = |s: &OrderingScore| s.handled_ratio().unwrap_or(1.0);
    ratio(a)
        .partial_cmp(&ratio(b))
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.clustered.cmp(&b.clustered))
        .then_with(|| b.index_property_count.cmp(&a.index_property_count))
        .then_with(|| (!a.should_reverse_order).cmp(&!b.should_reverse_order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filter::PropertyFilter as PF;

    fn idx(name: &str, props: Vec<OrderingEntry>, unique: bool, clustered: bool) -> IndexDescriptor {
        IndexDescriptor::new(name, props, unique, clustered)
    }

    #[test]
    fn unique_fully_bound_index_needs_no_ordering() {
        let index = idx("id", vec![OrderingEntry::asc("id")], true, true);
        let conjunct = Filter::Compare(PF::eq("id", 1));
        let ordering = [OrderingEntry::asc("name")];
        let score = OrderingScore::evaluate(&index, Some(&conjunct), &ordering).unwrap();
        assert!(score.handled.is_empty());
        assert!(score.remainder.is_empty());
    }

    #[test]
    fn matching_prefix_is_fully_handled() {
        let index = idx("age_name", vec![OrderingEntry::asc("age"), OrderingEntry::asc("name")], false, false);
        let conjunct = Filter::Compare(PF::eq("age", 30));
        let ordering = [OrderingEntry::asc("name")];
        let score = OrderingScore::evaluate(&index, Some(&conjunct), &ordering).unwrap();
        assert_eq!(score.handled.len(), 1);
        assert!(score.remainder.is_empty());
    }

    #[test]
    fn direction_conflict_sets_reverse_flag() {
        let index = idx("name", vec![OrderingEntry::asc("name")], false, false);
        let ordering = [OrderingEntry::desc("name")];
        let score = OrderingScore::evaluate(&index, None, &ordering).unwrap();
        assert!(score.should_reverse_order);
        assert_eq!(score.handled[0].direction, Direction::Descending);
    }

    #[test]
    fn unrelated_ordering_is_entirely_remainder() {
        let index = idx("age", vec![OrderingEntry::asc("age")], false, false);
        let ordering = [OrderingEntry::asc("name")];
        let score = OrderingScore::evaluate(&index, None, &ordering).unwrap();
        assert_eq!(score.remainder.len(), 1);
        assert!(score.handled.is_empty());
    }
}
