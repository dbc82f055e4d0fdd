//! `merge(entityIds)`: dispatches to [`super::Join`] for
//! ways or [`super::Connect`] for nodes.

use super::{Action, Connect, DisabledReason, Join};
use crate::entity::{EntityId, EntityKind};
use crate::graph::Graph;

#[derive(Debug, Clone)]
pub struct Merge {
    pub entity_ids: Vec<EntityId>,
}

impl Merge {
    pub fn new(entity_ids: Vec<EntityId>) -> Self {
        Merge { entity_ids }
    }

    fn dominant_kind(&self, graph: &Graph) -> Option<EntityKind> {
        let mut kinds = self.entity_ids.iter().filter_map(|id| graph.has_entity(id).map(|e| e.kind()));
        let first = kinds.next()?;
        if kinds.all(|k| k == first) {
            Some(first)
        } else {
            None
        }
    }
}

impl Action for Merge {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        match self.dominant_kind(graph) {
            Some(EntityKind::Way) => Join::new(self.entity_ids.clone()).disabled(graph),
            Some(EntityKind::Node) => Connect::new(self.entity_ids.clone()).disabled(graph),
            _ => Some(DisabledReason::NotEligible),
        }
    }

    fn apply(&self, graph: &Graph) -> Graph {
        match self.dominant_kind(graph) {
            Some(EntityKind::Way) => Join::new(self.entity_ids.clone()).apply(graph),
            Some(EntityKind::Node) => Connect::new(self.entity_ids.clone()).apply(graph),
            _ => graph.derive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Node, Way};

    #[test]
    fn merge_of_mixed_kinds_is_not_eligible() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
            Way::new(EntityId::new("w1"), vec![EntityId::new("a")]).into(),
        ])
        .unwrap();
        let action = Merge::new(vec![EntityId::new("a"), EntityId::new("w1")]);
        assert_eq!(action.disabled(&g), Some(DisabledReason::NotEligible));
    }

    #[test]
    fn merge_of_nodes_dispatches_to_connect() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
            Node::new(EntityId::new("b"), [1.0, 0.0]).into(),
        ])
        .unwrap();
        let action = Merge::new(vec![EntityId::new("a"), EntityId::new("b")]);
        assert!(action.disabled(&g).is_none());
        let result = action.apply(&g);
        assert!(result.has_entity(&EntityId::new("a")).is_none());
    }
}
