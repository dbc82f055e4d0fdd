//! `rotate(wayIds, pivot, angle, t?)`: rotates node locations about a pivot.

use super::{Action, DisabledReason, Transitionable};
use crate::entity::{Entity, EntityId};
use crate::graph::Graph;
use std::collections::BTreeSet;

fn rotate_point(p: [f64; 2], pivot: [f64; 2], angle_rad: f64) -> [f64; 2] {
    let (s, c) = angle_rad.sin_cos();
    let dx = p[0] - pivot[0];
    let dy = p[1] - pivot[1];
    [pivot[0] + dx * c - dy * s, pivot[1] + dx * s + dy * c]
}

#[derive(Debug, Clone)]
pub struct Rotate {
    pub way_ids: Vec<EntityId>,
    pub pivot: [f64; 2],
    pub angle_rad: f64,
}

impl Rotate {
    pub fn new(way_ids: Vec<EntityId>, pivot: [f64; 2], angle_rad: f64) -> Self {
        Rotate { way_ids, pivot, angle_rad }
    }

    fn affected_node_ids(&self, graph: &Graph) -> Option<BTreeSet<EntityId>> {
        let mut out = BTreeSet::new();
        for id in &self.way_ids {
            match graph.has_entity(id)? {
                Entity::Way(w) => out.extend(w.nodes.iter().cloned()),
                _ => return None,
            }
        }
        Some(out)
    }

    fn apply_internal(&self, graph: &Graph, t: f64) -> Graph {
        let mut g = graph.derive();
        let ids = match self.affected_node_ids(graph) {
            Some(ids) => ids,
            None => return g,
        };
        let angle = self.angle_rad * t;
        let updates: Vec<Entity> = ids
            .into_iter()
            .filter_map(|id| match graph.has_entity(&id)? {
                Entity::Node(n) => Some(n.moved(rotate_point(n.loc, self.pivot, angle)).into()),
                _ => None,
            })
            .collect();
        let _ = g.replace(updates);
        g
    }
}

impl Action for Rotate {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        if self.affected_node_ids(graph).is_none() {
            return Some(DisabledReason::NotDownloaded);
        }
        None
    }

    fn apply(&self, graph: &Graph) -> Graph {
        self.apply_internal(graph, 1.0)
    }
}

impl Transitionable for Rotate {
    fn apply_at(&self, graph: &Graph, t: f64) -> Graph {
        self.apply_internal(graph, t.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Node, Way};
    use std::f64::consts::PI;

    #[test]
    fn rotate_quarter_turn_about_origin() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![Node::new(EntityId::new("a"), [1.0, 0.0]).into()]).unwrap();
        g.replace(vec![Way::new(EntityId::new("w1"), vec![EntityId::new("a")]).into()]).unwrap();

        let action = Rotate::new(vec![EntityId::new("w1")], [0.0, 0.0], PI / 2.0);
        let result = action.apply(&g);
        let a = result.entity(&EntityId::new("a")).unwrap().as_node().unwrap().loc;
        assert!((a[0]).abs() < 1e-9);
        assert!((a[1] - 1.0).abs() < 1e-9);
    }
}
