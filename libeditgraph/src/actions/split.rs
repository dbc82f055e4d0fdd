//! `split(wayId, nodeIds)`: splits a way at interior nodes into multiple ways.

use super::{Action, DisabledReason};
use crate::entity::{Entity, EntityId, MemberType, Way};
use crate::graph::Graph;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct Split {
    pub way_id: EntityId,
    pub node_ids: Vec<EntityId>,
    /// Pre-allocated ids for the new ways created by the split, one per
    /// extra segment (`segments.len() - 1` of them). The ID allocator is
    /// an external collaborator; actions that mint new
    /// entities receive already-allocated ids rather than an allocator
    /// handle.
    pub new_way_ids: Vec<EntityId>,
}

impl Split {
    pub fn new(way_id: EntityId, node_ids: Vec<EntityId>, new_way_ids: Vec<EntityId>) -> Self {
        Split {
            way_id,
            node_ids,
            new_way_ids,
        }
    }

    fn way(&self, graph: &Graph) -> Option<std::sync::Arc<Way>> {
        match graph.has_entity(&self.way_id)? {
            Entity::Way(w) => Some(w),
            _ => None,
        }
    }

    /// Splits `way.nodes` into segments at every interior occurrence of a
    /// split node, each segment sharing its boundary node with the next.
    fn segments(way: &Way, split_at: &BTreeSet<EntityId>) -> Vec<Vec<EntityId>> {
        let mut segments = Vec::new();
        let mut current = vec![way.nodes[0].clone()];
        for i in 1..way.nodes.len() {
            let node = way.nodes[i].clone();
            current.push(node.clone());
            let is_interior = i != way.nodes.len() - 1;
            if is_interior && split_at.contains(&node) {
                segments.push(std::mem::replace(&mut current, vec![node]));
            }
        }
        segments.push(current);
        segments
    }
}

impl Action for Split {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        let way = match self.way(graph) {
            Some(w) => w,
            None => return Some(DisabledReason::NotEligible),
        };
        let interior: BTreeSet<EntityId> = way.nodes[1..way.nodes.len().saturating_sub(1)]
            .iter()
            .cloned()
            .collect();
        if self.node_ids.is_empty() || !self.node_ids.iter().all(|id| interior.contains(id)) {
            return Some(DisabledReason::NotEligible);
        }
        let split_at: BTreeSet<EntityId> = self.node_ids.iter().cloned().collect();
        let needed = Self::segments(&way, &split_at).len().saturating_sub(1);
        if self.new_way_ids.len() < needed {
            return Some(DisabledReason::NotEligible);
        }
        None
    }

    fn apply(&self, graph: &Graph) -> Graph {
        let mut g = graph.derive();
        let way = match self.way(graph) {
            Some(w) => w,
            None => return g,
        };
        let split_at: BTreeSet<EntityId> = self.node_ids.iter().cloned().collect();
        let segments = Self::segments(&way, &split_at);
        if segments.len() < 2 {
            return g;
        }

        let mut segment_ids = vec![self.way_id.clone()];
        segment_ids.extend(self.new_way_ids.iter().take(segments.len() - 1).cloned());

        let mut new_ways = Vec::new();
        for (seg, id) in segments.iter().zip(&segment_ids) {
            new_ways.push(
                Way {
                    id: id.clone(),
                    v: 0,
                    tags: way.tags.clone(),
                    nodes: seg.clone(),
                    visible: crate::entity::Visible(true),
                }
                .into(),
            );
        }
        let _ = g.replace(new_ways);

        // Distribute relation membership: every segment way joins the
        // relations the original way belonged to, preserving role.
        if let Ok(rels) = graph.parent_relations(&self.way_id) {
            let mut rel_updates = Vec::new();
            for rel in rels {
                let mut members = Vec::with_capacity(rel.members.len() + segment_ids.len() - 1);
                for m in &rel.members {
                    if m.id == self.way_id {
                        for seg_id in &segment_ids {
                            members.push(crate::entity::Member {
                                id: seg_id.clone(),
                                member_type: MemberType::Way,
                                role: m.role.clone(),
                            });
                        }
                    } else {
                        members.push(m.clone());
                    }
                }
                rel_updates.push(rel.with_members(members).into());
            }
            if !rel_updates.is_empty() {
                let _ = g.replace(rel_updates);
            }
        }

        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Node;

    #[test]
    fn splits_way_at_interior_node_into_two_segments() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
            Node::new(EntityId::new("b"), [1.0, 0.0]).into(),
            Node::new(EntityId::new("c"), [2.0, 0.0]).into(),
        ])
        .unwrap();
        g.replace(vec![Way::new(
            EntityId::new("w1"),
            vec![EntityId::new("a"), EntityId::new("b"), EntityId::new("c")],
        )
        .into()])
        .unwrap();

        let action = Split::new(EntityId::new("w1"), vec![EntityId::new("b")], vec![EntityId::new("w-1")]);
        assert!(action.disabled(&g).is_none());
        let result = action.apply(&g);

        let first = result.entity(&EntityId::new("w1")).unwrap();
        assert_eq!(first.as_way().unwrap().nodes, vec![EntityId::new("a"), EntityId::new("b")]);
        let second = result.entity(&EntityId::new("w-1")).unwrap();
        assert_eq!(second.as_way().unwrap().nodes, vec![EntityId::new("b"), EntityId::new("c")]);
    }

    #[test]
    fn endpoint_node_is_not_a_valid_split_point() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
            Node::new(EntityId::new("b"), [1.0, 0.0]).into(),
        ])
        .unwrap();
        g.replace(vec![Way::new(EntityId::new("w1"), vec![EntityId::new("a"), EntityId::new("b")]).into()])
            .unwrap();
        let action = Split::new(EntityId::new("w1"), vec![EntityId::new("a")], vec![]);
        assert_eq!(action.disabled(&g), Some(DisabledReason::NotEligible));
    }
}
