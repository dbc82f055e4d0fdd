//! Topology maintenance: incrementally keeping parent-way/relation sets
//! in sync with way/relation node and member lists.
//!
//! On every mutation affecting a way or relation, `removed`/`added` child
//! refs are computed against the entity's previous version, and each
//! affected child id's parent set is cloned-then-patched into the local
//! overlay (local replaces base *in full*, not as a delta, once touched —
//! this is what makes local-wins-base lookups O(1) instead of a merge).

use crate::entity::{EntityId, EntityKind};
use std::collections::BTreeSet;

/// Which parent index a delta applies to: `parentWays` (keyed by node id)
/// or `parentRelations` (keyed by member id of any type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentIndexKind {
    Ways,
    Relations,
}

impl ParentIndexKind {
    pub fn of(kind: EntityKind) -> Option<Self> {
        match kind {
            EntityKind::Way => Some(ParentIndexKind::Ways),
            EntityKind::Relation => Some(ParentIndexKind::Relations),
            EntityKind::Node => None,
        }
    }
}

/// Computes the set of child ids whose parent-set entry needs touching:
/// `removed ∪ added` between the previous and current child-ref sets.
pub fn child_ref_delta(
    prev: Option<&BTreeSet<EntityId>>,
    curr: Option<&BTreeSet<EntityId>>,
) -> (BTreeSet<EntityId>, BTreeSet<EntityId>) {
    let empty = BTreeSet::new();
    let prev = prev.unwrap_or(&empty);
    let curr = curr.unwrap_or(&empty);
    let removed: BTreeSet<EntityId> = prev.difference(curr).cloned().collect();
    let added: BTreeSet<EntityId> = curr.difference(prev).cloned().collect();
    (removed, added)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<EntityId> {
        items.iter().map(|s| EntityId::new(*s)).collect()
    }

    #[test]
    fn delta_finds_removed_and_added() {
        let prev = set(&["a", "b", "c"]);
        let curr = set(&["b", "c", "d"]);
        let (removed, added) = child_ref_delta(Some(&prev), Some(&curr));
        assert_eq!(removed, set(&["a"]));
        assert_eq!(added, set(&["d"]));
    }

    #[test]
    fn delta_against_absent_prev_is_all_added() {
        let curr = set(&["a", "b"]);
        let (removed, added) = child_ref_delta(None, Some(&curr));
        assert!(removed.is_empty());
        assert_eq!(added, set(&["a", "b"]));
    }
}
