//! `delete(entityId)`: removes an entity and any orphaned child nodes.

use super::{Action, DisabledReason};
use crate::entity::{Entity, EntityId, EntityKind};
use crate::graph::Graph;

#[derive(Debug, Clone)]
pub struct Delete {
    pub entity_id: EntityId,
    pub selected_ids: Vec<EntityId>,
}

impl Delete {
    pub fn new(entity_id: EntityId) -> Self {
        Delete { entity_id, selected_ids: Vec::new() }
    }

    /// Ids selected elsewhere in the host's current edit; an orphaned
    /// child node among them survives the delete instead of being swept
    /// away with its parent way.
    pub fn with_selection(mut self, selected_ids: Vec<EntityId>) -> Self {
        self.selected_ids = selected_ids;
        self
    }
}

impl Action for Delete {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        let entity = match graph.has_entity(&self.entity_id) {
            Some(e) => e,
            None => return Some(DisabledReason::NotEligible),
        };
        if entity.kind() == EntityKind::Node && !graph.parent_way_ids(&self.entity_id).is_empty() {
            return Some(DisabledReason::NotEligible);
        }
        None
    }

    fn apply(&self, graph: &Graph) -> Graph {
        let mut g = graph.derive();
        let entity = match graph.has_entity(&self.entity_id) {
            Some(e) => e,
            None => return g,
        };

        // Strip membership from every relation first, regardless of kind.
        if let Ok(rels) = graph.parent_relations(&self.entity_id) {
            let updates: Vec<Entity> = rels
                .into_iter()
                .map(|rel| {
                    let members = rel.members.iter().filter(|m| m.id != self.entity_id).cloned().collect();
                    rel.with_members(members).into()
                })
                .collect();
            if !updates.is_empty() {
                let _ = g.replace(updates);
            }
        }

        let child_ids: Vec<EntityId> = match &entity {
            Entity::Way(w) => w.nodes.iter().cloned().collect(),
            _ => Vec::new(),
        };

        let _ = g.remove(vec![self.entity_id.clone()]);

        // A way's child nodes that are now unused (no other parent way or
        // relation, and not held by a live selection) are orphaned and
        // removed along with it.
        let mut orphans = Vec::new();
        for child in child_ids {
            if !g.is_used(&child, &self.selected_ids) {
                orphans.push(child);
            }
        }
        if !orphans.is_empty() {
            let _ = g.remove(orphans);
        }

        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Node, Way};

    #[test]
    fn deleting_a_way_orphans_its_unshared_nodes() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
            Node::new(EntityId::new("b"), [1.0, 0.0]).into(),
        ])
        .unwrap();
        g.replace(vec![Way::new(EntityId::new("w1"), vec![EntityId::new("a"), EntityId::new("b")]).into()])
            .unwrap();

        let action = Delete::new(EntityId::new("w1"));
        let result = action.apply(&g);
        assert!(result.has_entity(&EntityId::new("w1")).is_none());
        assert!(result.has_entity(&EntityId::new("a")).is_none());
        assert!(result.has_entity(&EntityId::new("b")).is_none());
    }

    #[test]
    fn deleting_a_way_keeps_nodes_shared_with_another_way() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
            Node::new(EntityId::new("b"), [1.0, 0.0]).into(),
            Node::new(EntityId::new("c"), [2.0, 0.0]).into(),
        ])
        .unwrap();
        g.replace(vec![
            Way::new(EntityId::new("w1"), vec![EntityId::new("a"), EntityId::new("b")]).into(),
            Way::new(EntityId::new("w2"), vec![EntityId::new("b"), EntityId::new("c")]).into(),
        ])
        .unwrap();

        let action = Delete::new(EntityId::new("w1"));
        let result = action.apply(&g);
        assert!(result.has_entity(&EntityId::new("a")).is_none());
        assert!(result.has_entity(&EntityId::new("b")).is_some());
    }

    #[test]
    fn a_selected_orphan_node_survives_the_delete() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
            Node::new(EntityId::new("b"), [1.0, 0.0]).into(),
        ])
        .unwrap();
        g.replace(vec![Way::new(EntityId::new("w1"), vec![EntityId::new("a"), EntityId::new("b")]).into()])
            .unwrap();

        let action = Delete::new(EntityId::new("w1")).with_selection(vec![EntityId::new("a")]);
        let result = action.apply(&g);
        assert!(result.has_entity(&EntityId::new("a")).is_some());
        assert!(result.has_entity(&EntityId::new("b")).is_none());
    }

    #[test]
    fn standalone_node_that_is_a_way_vertex_cannot_be_deleted_directly() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
            Node::new(EntityId::new("b"), [1.0, 0.0]).into(),
        ])
        .unwrap();
        g.replace(vec![Way::new(EntityId::new("w1"), vec![EntityId::new("a"), EntityId::new("b")]).into()])
            .unwrap();
        let action = Delete::new(EntityId::new("a"));
        assert_eq!(action.disabled(&g), Some(DisabledReason::NotEligible));
    }
}
