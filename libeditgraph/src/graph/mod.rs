//! The layered entity store: a shared, append-only
//! `base` layer plus a per-`Edit` `local` overlay, with constant-time
//! child/parent topology lookups maintained incrementally on every
//! mutation.

mod geometry_update;
mod rebase;
mod topology;

pub use geometry_update::recompute_geometries;
pub use rebase::RebaseReport;

use crate::entity::{Entity, EntityId, EntityKind, Geometry, LocalValue};
use crate::error::GraphError;
use log::trace;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// The shared baseline layer: entities loaded from the network. `base` is
/// never downgraded — entries are only inserted or replaced with
/// same-or-newer data, never removed, and only by `rebase`.
#[derive(Debug, Default)]
pub struct BaseLayer {
    pub(crate) entities: HashMap<EntityId, Entity>,
    pub(crate) parent_ways: HashMap<EntityId, BTreeSet<EntityId>>,
    pub(crate) parent_rels: HashMap<EntityId, BTreeSet<EntityId>>,
}

/// The per-`Edit` overlay of local changes.
#[derive(Debug, Default, Clone)]
pub struct LocalLayer {
    pub(crate) entities: HashMap<EntityId, LocalValue>,
    pub(crate) parent_ways: HashMap<EntityId, BTreeSet<EntityId>>,
    pub(crate) parent_rels: HashMap<EntityId, BTreeSet<EntityId>>,
    /// Way/relation ids touched since the last `commit()`, awaiting a
    /// geometry recompute pass.
    pub(crate) touched: BTreeSet<EntityId>,
    /// Cached derived geometry, refreshed for `touched` ids on `commit()`.
    pub(crate) geometry_cache: HashMap<EntityId, Geometry>,
}

/// A layered entity graph. Cloning a `Graph` (via [`Graph::derive`]) shares
/// `base` by `Arc` and shallow-clones `local` — the "persistent-by-layer"
/// model, as opposed to rebuilding every entity on every edit.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) base: Arc<RwLock<BaseLayer>>,
    pub(crate) local: LocalLayer,
    /// Strictly increases on every mutating op.
    rev: u64,
    /// True only for `history[0]`'s graph: mutation is rejected with
    /// [`GraphError::Invariant`].
    is_base_edit: bool,
}

impl Graph {
    /// A fresh base graph: empty base and local layers. This is what backs
    /// `history[0]`, the base edit.
    pub fn new_base() -> Self {
        Graph {
            base: Arc::new(RwLock::new(BaseLayer::default())),
            local: LocalLayer::default(),
            rev: 0,
            is_base_edit: true,
        }
    }

    /// Derives a new graph sharing this graph's `base` by reference and
    /// shallow-cloning its `local` overlay.
    pub fn derive(&self) -> Self {
        Graph {
            base: self.base.clone(),
            local: self.local.clone(),
            rev: 0,
            is_base_edit: false,
        }
    }

    pub fn rev(&self) -> u64 {
        self.rev
    }

    fn bump_rev(&mut self) {
        self.rev += 1;
    }

    fn check_mutable(&self) -> Result<(), GraphError> {
        if self.is_base_edit {
            Err(GraphError::Invariant)
        } else {
            Ok(())
        }
    }

    // ---- lookup --------------------------------------------------------

    /// Local-first lookup: present (even as a tombstone) in `local` wins
    /// over `base`.
    pub fn has_entity(&self, id: &EntityId) -> Option<Entity> {
        if let Some(v) = self.local.entities.get(id) {
            return v.as_entity().cloned();
        }
        self.base.read().entities.get(id).cloned()
    }

    pub fn entity(&self, id: &EntityId) -> Result<Entity, GraphError> {
        self.has_entity(id).ok_or_else(|| GraphError::NotFound(id.clone()))
    }

    fn parent_set(&self, which: topology::ParentIndexKind, id: &EntityId) -> BTreeSet<EntityId> {
        let local_map = match which {
            topology::ParentIndexKind::Ways => &self.local.parent_ways,
            topology::ParentIndexKind::Relations => &self.local.parent_rels,
        };
        if let Some(set) = local_map.get(id) {
            return set.clone();
        }
        let base = self.base.read();
        let base_map = match which {
            topology::ParentIndexKind::Ways => &base.parent_ways,
            topology::ParentIndexKind::Relations => &base.parent_rels,
        };
        base_map.get(id).cloned().unwrap_or_default()
    }

    pub fn parent_way_ids(&self, id: &EntityId) -> BTreeSet<EntityId> {
        self.parent_set(topology::ParentIndexKind::Ways, id)
    }

    pub fn parent_relation_ids(&self, id: &EntityId) -> BTreeSet<EntityId> {
        self.parent_set(topology::ParentIndexKind::Relations, id)
    }

    /// `parentWays(entity) -> Way[]`. Fails if any referenced parent is
    /// absent from the graph.
    pub fn parent_ways(&self, id: &EntityId) -> Result<Vec<Arc<crate::entity::Way>>, GraphError> {
        self.parent_way_ids(id)
            .into_iter()
            .map(|wid| match self.entity(&wid)? {
                Entity::Way(w) => Ok(w),
                _ => Err(GraphError::NotFound(wid)),
            })
            .collect()
    }

    /// `parentRelations(entity) -> Relation[]`.
    pub fn parent_relations(
        &self,
        id: &EntityId,
    ) -> Result<Vec<Arc<crate::entity::Relation>>, GraphError> {
        self.parent_relation_ids(id)
            .into_iter()
            .map(|rid| match self.entity(&rid)? {
                Entity::Relation(r) => Ok(r),
                _ => Err(GraphError::NotFound(rid)),
            })
            .collect()
    }

    /// `childNodes(way) -> Node[]`, positional. Fails if any node is
    /// missing.
    pub fn child_nodes(
        &self,
        way: &crate::entity::Way,
    ) -> Result<Vec<Arc<crate::entity::Node>>, GraphError> {
        way.nodes
            .iter()
            .map(|nid| match self.entity(nid)? {
                Entity::Node(n) => Ok(n),
                _ => Err(GraphError::NotFound(nid.clone())),
            })
            .collect()
    }

    /// True if `id` is referenced by any parent way/relation, or appears in
    /// `selected_ids` (a non-transient edit's selection) — used by actions
    /// to decide whether deleting it would orphan something.
    pub fn is_used(&self, id: &EntityId, selected_ids: &[EntityId]) -> bool {
        !self.parent_way_ids(id).is_empty()
            || !self.parent_relation_ids(id).is_empty()
            || selected_ids.contains(id)
    }

    pub fn geometry(&self, id: &EntityId) -> Result<Geometry, GraphError> {
        if let Some(g) = self.local.geometry_cache.get(id) {
            return Ok(g.clone());
        }
        geometry_update::compute_geometry(self, &self.entity(id)?)
    }

    pub fn extent(&self, id: &EntityId) -> Result<Option<crate::entity::BBox>, GraphError> {
        let mut visited = BTreeSet::new();
        geometry_update::entity_extent(self, id, &mut visited)
    }

    // ---- mutation --------------------------------------------------------

    /// Upserts one or more entities. Way/relation inputs are sorted so
    /// nodes are processed first.
    pub fn replace<I: IntoIterator<Item = Entity>>(&mut self, entities: I) -> Result<(), GraphError> {
        self.check_mutable()?;
        let mut items: Vec<Entity> = entities.into_iter().collect();
        items.sort_by_key(|e| match e.kind() {
            EntityKind::Node => 0,
            EntityKind::Way => 1,
            EntityKind::Relation => 2,
        });
        for e in items {
            self.replace_one(e);
        }
        Ok(())
    }

    fn replace_one(&mut self, new: Entity) {
        let id = new.id().clone();
        if let Some(current) = self.has_entity(&id) {
            if entity_ptr_eq(&current, &new) {
                return;
            }
        }
        self.apply_local_change(&id, Some(LocalValue::Entity(new)));
    }

    /// Sets `local[id] = TOMBSTONE` for each id.
    pub fn remove<I: IntoIterator<Item = EntityId>>(&mut self, ids: I) -> Result<(), GraphError> {
        self.check_mutable()?;
        for id in ids {
            self.apply_local_change(&id, Some(LocalValue::Tombstone));
        }
        Ok(())
    }

    /// Deletes the local override for each id, restoring the base view.
    pub fn revert<I: IntoIterator<Item = EntityId>>(&mut self, ids: I) -> Result<(), GraphError> {
        self.check_mutable()?;
        for id in ids {
            if self.local.entities.contains_key(&id) {
                self.apply_local_change(&id, None);
            }
        }
        Ok(())
    }

    /// Bulk replace/remove, mutating in place and recomputing geometry
    /// once at the end. Leaves work in progress uncommitted; the caller
    /// commits or reverts afterward.
    pub fn load<I: IntoIterator<Item = (EntityId, Option<Entity>)>>(
        &mut self,
        entities: I,
    ) -> Result<(), GraphError> {
        self.check_mutable()?;
        let mut items: Vec<(EntityId, Option<Entity>)> = entities.into_iter().collect();
        items.sort_by_key(|(id, e)| match e.as_ref().map(|e| e.kind()) {
            Some(EntityKind::Node) | None => 0,
            Some(EntityKind::Way) => 1,
            Some(EntityKind::Relation) => 2,
            _ => 0,
        });
        for (id, e) in items {
            match e {
                Some(e) => self.replace_one(e),
                None => self.apply_local_change(&id, Some(LocalValue::Tombstone)),
            }
        }
        self.commit();
        Ok(())
    }

    /// Snapshots the current state, refreshing the cached geometry of
    /// every way/relation touched since the last commit.
    pub fn commit(&mut self) {
        if self.local.touched.is_empty() {
            return;
        }
        let touched: Vec<EntityId> = self.local.touched.iter().cloned().collect();
        trace!("recomputing geometry for {} touched ids", touched.len());
        let refreshed = geometry_update::recompute_geometries(self, &touched);
        self.local.geometry_cache.extend(refreshed);
        self.local.touched.clear();
        self.bump_rev();
    }

    /// Merges newly downloaded baseline data underneath this and every
    /// other graph in `stack` without disturbing local edits.
    pub fn rebase(
        new_entities: Vec<Entity>,
        stack: &mut [&mut Graph],
        force: bool,
    ) -> RebaseReport {
        rebase::rebase(new_entities, stack, force)
    }

    // ---- internal --------------------------------------------------------

    fn apply_local_change(&mut self, id: &EntityId, new_value: Option<LocalValue>) {
        let prev_effective = self.has_entity(id);
        match new_value {
            Some(v) => {
                self.local.entities.insert(id.clone(), v);
            }
            None => {
                self.local.entities.remove(id);
            }
        }
        let new_effective = self.has_entity(id);
        self.update_topology(id, prev_effective.as_ref(), new_effective.as_ref());
        self.mark_touched(id, prev_effective.as_ref(), new_effective.as_ref());
        self.bump_rev();
    }

    fn update_topology(&mut self, id: &EntityId, prev: Option<&Entity>, new: Option<&Entity>) {
        let kind = new.or(prev).map(|e| e.kind());
        let which = match kind.and_then(topology::ParentIndexKind::of) {
            Some(w) => w,
            None => return,
        };
        let prev_refs = prev.and_then(|e| e.child_refs());
        let new_refs = new.and_then(|e| e.child_refs());
        let (removed, added) = topology::child_ref_delta(prev_refs.as_ref(), new_refs.as_ref());
        for child in removed.iter().chain(added.iter()) {
            let mut set = self.parent_set(which, child);
            if removed.contains(child) {
                set.remove(id);
            }
            if added.contains(child) {
                set.insert(id.clone());
            }
            let local_map = match which {
                topology::ParentIndexKind::Ways => &mut self.local.parent_ways,
                topology::ParentIndexKind::Relations => &mut self.local.parent_rels,
            };
            local_map.insert(child.clone(), set);
        }
    }

    fn mark_touched(&mut self, id: &EntityId, prev: Option<&Entity>, new: Option<&Entity>) {
        match new.or(prev).map(|e| e.kind()) {
            Some(EntityKind::Way) | Some(EntityKind::Relation) => {
                self.local.touched.insert(id.clone());
            }
            Some(EntityKind::Node) => {
                // A node move/retag also invalidates geometry of any way
                // (and directly-containing relation) that references it.
                self.local.touched.extend(self.parent_way_ids(id));
                self.local.touched.extend(self.parent_relation_ids(id));
            }
            None => {}
        }
    }
}

fn entity_ptr_eq(a: &Entity, b: &Entity) -> bool {
    match (a, b) {
        (Entity::Node(a), Entity::Node(b)) => Arc::ptr_eq(a, b),
        (Entity::Way(a), Entity::Way(b)) => Arc::ptr_eq(a, b),
        (Entity::Relation(a), Entity::Relation(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Node, Way};

    fn n(id: &str, loc: [f64; 2]) -> Entity {
        Node::new(EntityId::new(id), loc).into()
    }

    fn w(id: &str, nodes: &[&str]) -> Entity {
        Way::new(
            EntityId::new(id),
            nodes.iter().map(|s| EntityId::new(*s)).collect(),
        )
        .into()
    }

    #[test]
    fn topology_symmetry_after_replace() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![n("a", [0.0, 0.0]), n("b", [1.0, 0.0])]).unwrap();
        g.replace(vec![w("w1", &["a", "b"])]).unwrap();
        assert!(g.parent_way_ids(&EntityId::new("a")).contains(&EntityId::new("w1")));
        assert!(g.parent_way_ids(&EntityId::new("b")).contains(&EntityId::new("w1")));
    }

    #[test]
    fn local_wins_base() {
        let base = Graph::new_base();
        {
            let mut b = base.base.write();
            b.entities.insert(EntityId::new("a"), n("a", [0.0, 0.0]));
        }
        let mut g = base.derive();
        assert!(g.has_entity(&EntityId::new("a")).is_some());
        g.remove(vec![EntityId::new("a")]).unwrap();
        assert!(g.has_entity(&EntityId::new("a")).is_none());
    }

    #[test]
    fn base_never_downgraded_by_local_mutation() {
        let base = Graph::new_base();
        {
            let mut b = base.base.write();
            b.entities.insert(EntityId::new("a"), n("a", [0.0, 0.0]));
        }
        let mut g = base.derive();
        g.remove(vec![EntityId::new("a")]).unwrap();
        // base layer itself must still have it.
        assert!(base.base.read().entities.contains_key(&EntityId::new("a")));
    }

    #[test]
    fn mutation_on_base_edit_graph_is_rejected() {
        let mut g = Graph::new_base();
        let err = g.replace(vec![n("a", [0.0, 0.0])]).unwrap_err();
        assert_eq!(err, GraphError::Invariant);
    }

    #[test]
    fn rev_strictly_increases() {
        let mut g = Graph::new_base().derive();
        let r0 = g.rev();
        g.replace(vec![n("a", [0.0, 0.0])]).unwrap();
        assert!(g.rev() > r0);
    }

    #[test]
    fn replace_with_identical_pointer_is_noop() {
        let mut g = Graph::new_base().derive();
        let a = n("a", [0.0, 0.0]);
        g.replace(vec![a.clone()]).unwrap();
        let r1 = g.rev();
        g.replace(vec![a]).unwrap();
        assert_eq!(g.rev(), r1);
    }
}
