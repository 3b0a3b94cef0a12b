//! Scoring: how well one index matches one conjunct's filtering and the
//! query's requested ordering (`spec.md` §4.2-§4.4).

pub mod composite;
pub mod filtering;
pub mod ordering;

pub use composite::CompositeScore;
pub use filtering::FilteringScore;
pub use ordering::OrderingScore;

/// `spec.md` §9 "Big-integer preference score": bit `N-1-pos` is set for
/// each atom this index consumed, where `pos` is the atom's position in
/// the conjunct's own source order. Representing it as a `Vec<bool>`
/// indexed by `pos` (not by bit) gives the same lexicographic comparison
/// (earliest atoms are most significant) without needing real bitset
/// arithmetic — comparison is just `Vec<bool>`'s derived, MSB-first `Ord`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct PreferenceScore(pub Vec<bool>);

impl PreferenceScore {
    pub fn empty(total_atoms: usize) -> Self { Self(vec![false; total_atoms]) }

    pub fn set(&mut self, original_position: usize) {
        if original_position < self.0.len() {
            self.0[original_position] = true;
        }
    }
}
