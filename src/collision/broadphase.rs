use crate::core::entry::EntryId;

/// Candidate pair enumeration for the collision pass.
///
/// Pairs come out in a fixed order so that resolution is deterministic for a
/// given registration order. Nothing here looks at shapes or positions.
pub struct BroadPhase;

impl BroadPhase {
    /// Every unordered pair of ids sharing one quadrant, in slot order.
    pub fn quadrant_pairs(ids: &[EntryId]) -> Vec<(EntryId, EntryId)> {
        let mut pairs = Vec::with_capacity(ids.len() * ids.len().saturating_sub(1) / 2);
        for (i, lhs) in ids.iter().enumerate() {
            for rhs in &ids[i + 1..] {
                pairs.push((*lhs, *rhs));
            }
        }
        pairs
    }

    /// Exhaustive pairing used outside the quadtree.
    ///
    /// Each non-indexed id is paired with every indexed id, then with the
    /// non-indexed ids registered after it. Indexed-with-indexed pairs are only
    /// produced when the quadtree is switched off.
    pub fn brute_force_pairs(
        non_indexed: &[EntryId],
        indexed: &[EntryId],
        include_indexed_pairs: bool,
    ) -> Vec<(EntryId, EntryId)> {
        let mut pairs = Vec::new();
        for (i, lhs) in non_indexed.iter().enumerate() {
            pairs.extend(indexed.iter().map(|rhs| (*lhs, *rhs)));
            pairs.extend(non_indexed[i + 1..].iter().map(|rhs| (*lhs, *rhs)));
        }
        if include_indexed_pairs {
            pairs.extend(Self::quadrant_pairs(indexed));
        }
        pairs
    }
}
