//! `move(entityIds, delta)`: translates node locations by a world-space delta.

use super::{Action, DisabledReason};
use crate::entity::{Entity, EntityId};
use crate::graph::Graph;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct Move {
    pub entity_ids: Vec<EntityId>,
    pub delta: [f64; 2],
}

impl Move {
    pub fn new(entity_ids: Vec<EntityId>, delta: [f64; 2]) -> Self {
        Move { entity_ids, delta }
    }

    fn affected_node_ids(&self, graph: &Graph) -> Option<BTreeSet<EntityId>> {
        let mut out = BTreeSet::new();
        for id in &self.entity_ids {
            match graph.has_entity(id)? {
                Entity::Node(n) => {
                    out.insert(n.id.clone());
                }
                Entity::Way(w) => out.extend(w.nodes.iter().cloned()),
                Entity::Relation(r) => {
                    for m in &r.members {
                        if let Some(Entity::Node(n)) = graph.has_entity(&m.id) {
                            out.insert(n.id.clone());
                        }
                    }
                }
            }
        }
        Some(out)
    }
}

impl Action for Move {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        if self.affected_node_ids(graph).is_none() {
            return Some(DisabledReason::NotDownloaded);
        }
        None
    }

    fn apply(&self, graph: &Graph) -> Graph {
        let mut g = graph.derive();
        let ids = match self.affected_node_ids(graph) {
            Some(ids) => ids,
            None => return g,
        };
        let updates: Vec<Entity> = ids
            .into_iter()
            .filter_map(|id| match graph.has_entity(&id)? {
                Entity::Node(n) => {
                    let new_loc = [n.loc[0] + self.delta[0], n.loc[1] + self.delta[1]];
                    Some(n.moved(new_loc).into())
                }
                _ => None,
            })
            .collect();
        let _ = g.replace(updates);
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Node, Way};

    #[test]
    fn moving_a_way_translates_every_child_node() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
            Node::new(EntityId::new("b"), [1.0, 0.0]).into(),
        ])
        .unwrap();
        g.replace(vec![Way::new(EntityId::new("w1"), vec![EntityId::new("a"), EntityId::new("b")]).into()])
            .unwrap();

        let action = Move::new(vec![EntityId::new("w1")], [5.0, 5.0]);
        let result = action.apply(&g);
        assert_eq!(result.entity(&EntityId::new("a")).unwrap().as_node().unwrap().loc, [5.0, 5.0]);
        assert_eq!(result.entity(&EntityId::new("b")).unwrap().as_node().unwrap().loc, [6.0, 5.0]);
    }

    #[test]
    fn missing_entity_is_not_downloaded() {
        let g = Graph::new_base().derive();
        let action = Move::new(vec![EntityId::new("ghost")], [1.0, 0.0]);
        assert_eq!(action.disabled(&g), Some(DisabledReason::NotDownloaded));
    }
}
