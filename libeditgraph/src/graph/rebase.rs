//! Rebase: merge freshly downloaded baseline data underneath an existing
//! stack of local edits without disturbing them.
//!
//! Infallible and idempotent on the same inputs without `force`; with
//! `force=true` it overwrites baseline entities. Never raised as an error —
//! transient inconsistencies it fixes up are exactly its job.

use super::topology::{child_ref_delta, ParentIndexKind};
use super::Graph;
use crate::entity::{Entity, EntityId, EntityKind, LocalValue};
use log::debug;
use std::collections::BTreeSet;

/// What a rebase call changed, for the `merge(idSet)` event.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RebaseReport {
    pub new_ids: BTreeSet<EntityId>,
    pub restored_ids: BTreeSet<EntityId>,
}

pub fn rebase(mut new_entities: Vec<Entity>, stack: &mut [&mut Graph], force: bool) -> RebaseReport {
    let mut report = RebaseReport::default();
    if stack.is_empty() {
        return report;
    }

    new_entities.sort_by_key(|e| match e.kind() {
        EntityKind::Node => 0,
        EntityKind::Way => 1,
        EntityKind::Relation => 2,
    });

    // Step 1-2: write into the shared base layer.
    let mut new_ways: Vec<Entity> = Vec::new();
    {
        let base = stack[0].base.clone();
        for g in stack.iter() {
            debug_assert!(std::sync::Arc::ptr_eq(&g.base, &base));
        }
        let mut base = base.write();
        for e in new_entities {
            if !e.visible() {
                continue;
            }
            let id = e.id().clone();
            if !force && base.entities.contains_key(&id) {
                continue;
            }
            let prev = base.entities.get(&id).cloned();
            let prev_refs = prev.as_ref().and_then(|p| p.child_refs());
            let new_refs = e.child_refs();
            if let Some(which) = ParentIndexKind::of(e.kind()) {
                let (removed, added) = child_ref_delta(prev_refs.as_ref(), new_refs.as_ref());
                let map = match which {
                    ParentIndexKind::Ways => &mut base.parent_ways,
                    ParentIndexKind::Relations => &mut base.parent_rels,
                };
                for child in removed.iter().chain(added.iter()) {
                    let set = map.entry(child.clone()).or_default();
                    if removed.contains(child) {
                        set.remove(&id);
                    }
                    if added.contains(child) {
                        set.insert(id.clone());
                    }
                }
            }
            if e.kind() == EntityKind::Way {
                new_ways.push(e.clone());
            }
            base.entities.insert(id.clone(), e);
            report.new_ids.insert(id);
        }
    }

    // Step 3: deleted-node resurrection. Walk newly added ways, looking for
    // node ids tombstoned in the stack's last (head) graph.
    let head_idx = stack.len() - 1;
    let mut restore_ids = BTreeSet::new();
    for way in &new_ways {
        if let Some(refs) = way.child_refs() {
            for child in refs {
                if matches!(
                    stack[head_idx].local.entities.get(&child),
                    Some(LocalValue::Tombstone)
                ) {
                    restore_ids.insert(child);
                }
            }
        }
    }
    report.restored_ids = restore_ids.clone();

    // Step 4: for each graph on the stack, remove resurrected tombstones
    // and reconcile local parent sets against the enlarged base.
    for g in stack.iter_mut() {
        let g: &mut Graph = &mut **g;
        for id in &restore_ids {
            if matches!(g.local.entities.get(id), Some(LocalValue::Tombstone)) {
                g.local.entities.remove(id);
            }
        }
        reconcile_parent_sets(g, ParentIndexKind::Ways);
        reconcile_parent_sets(g, ParentIndexKind::Relations);
    }

    // Step 5: recompute geometry of newIDs on the stack's head graph.
    if !report.new_ids.is_empty() {
        let ids: Vec<EntityId> = report.new_ids.iter().cloned().collect();
        stack[head_idx].local.touched.extend(ids);
        stack[head_idx].commit();
    }

    debug!(
        "rebase: {} new, {} restored, force={force}",
        report.new_ids.len(),
        report.restored_ids.len()
    );
    report
}

/// For every child id with a materialized local parent set, union in any
/// base parent that has no local override.
fn reconcile_parent_sets(g: &mut Graph, which: ParentIndexKind) {
    let keys: Vec<EntityId> = match which {
        ParentIndexKind::Ways => g.local.parent_ways.keys().cloned().collect(),
        ParentIndexKind::Relations => g.local.parent_rels.keys().cloned().collect(),
    };
    for child in keys {
        let base_parents = g.base.read();
        let base_set = match which {
            ParentIndexKind::Ways => base_parents.parent_ways.get(&child).cloned(),
            ParentIndexKind::Relations => base_parents.parent_rels.get(&child).cloned(),
        }
        .unwrap_or_default();
        drop(base_parents);
        let local_entities = &g.local.entities;
        let additions: Vec<EntityId> = base_set
            .into_iter()
            .filter(|p| !local_entities.contains_key(p))
            .collect();
        if additions.is_empty() {
            continue;
        }
        let map = match which {
            ParentIndexKind::Ways => &mut g.local.parent_ways,
            ParentIndexKind::Relations => &mut g.local.parent_rels,
        };
        let set = map.entry(child).or_default();
        set.extend(additions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Node, Way};
    use crate::graph::Graph;

    #[test]
    fn scenario5_deleted_node_resurrection() {
        let base = Graph::new_base();
        {
            let mut b = base.base.write();
            b.entities
                .insert(EntityId::new("n"), Node::new(EntityId::new("n"), [0.0, 0.0]).into());
        }
        let mut g = base.derive();
        g.remove(vec![EntityId::new("n")]).unwrap();
        assert!(g.has_entity(&EntityId::new("n")).is_none());

        let way = Way::new(EntityId::new("w"), vec![EntityId::new("n"), EntityId::new("m")]);
        {
            let mut b_write = g.base.write();
            b_write
                .entities
                .insert(EntityId::new("m"), Node::new(EntityId::new("m"), [1.0, 0.0]).into());
        }

        let mut stack = [&mut g];
        let report = rebase(vec![way.into()], &mut stack, false);
        assert!(report.new_ids.contains(&EntityId::new("w")));
        assert!(report.restored_ids.contains(&EntityId::new("n")));

        assert!(g.has_entity(&EntityId::new("n")).is_some());
        assert!(g.parent_way_ids(&EntityId::new("n")).contains(&EntityId::new("w")));
    }

    #[test]
    fn rebase_transparency_skips_existing_ids_without_force() {
        let base = Graph::new_base();
        {
            let mut b = base.base.write();
            b.entities
                .insert(EntityId::new("a"), Node::new(EntityId::new("a"), [1.0, 1.0]).into());
        }
        let mut g = base.derive();
        // A local edit overrides the base position.
        g.replace(vec![Node::new(EntityId::new("a"), [5.0, 5.0]).into()])
            .unwrap();

        let mut stack = [&mut g];
        let report = rebase(
            vec![Node::new(EntityId::new("a"), [9.0, 9.0]).into()],
            &mut stack,
            false,
        );
        // "a" is already present in base, so the re-download is skipped.
        assert!(report.new_ids.is_empty());
        // The local edit is untouched either way.
        let a = g.entity(&EntityId::new("a")).unwrap();
        assert_eq!(a.as_node().unwrap().loc, [5.0, 5.0]);
    }
}
