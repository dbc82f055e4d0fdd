//! `scale(wayIds, pivot, factor, t?)`: scales node locations about a pivot.

use super::{Action, DisabledReason, Transitionable};
use crate::entity::{Entity, EntityId};
use crate::graph::Graph;
use std::collections::BTreeSet;

fn scale_point(p: [f64; 2], pivot: [f64; 2], factor: f64) -> [f64; 2] {
    [pivot[0] + (p[0] - pivot[0]) * factor, pivot[1] + (p[1] - pivot[1]) * factor]
}

#[derive(Debug, Clone)]
pub struct Scale {
    pub way_ids: Vec<EntityId>,
    pub pivot: [f64; 2],
    pub factor: f64,
}

impl Scale {
    pub fn new(way_ids: Vec<EntityId>, pivot: [f64; 2], factor: f64) -> Self {
        Scale { way_ids, pivot, factor }
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
        // 1.0 at t=0, self.factor at t=1.
        let effective_factor = 1.0 + (self.factor - 1.0) * t;
        let updates: Vec<Entity> = ids
            .into_iter()
            .filter_map(|id| match graph.has_entity(&id)? {
                Entity::Node(n) => Some(n.moved(scale_point(n.loc, self.pivot, effective_factor)).into()),
                _ => None,
            })
            .collect();
        let _ = g.replace(updates);
        g
    }
}

impl Action for Scale {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        if self.factor <= 0.0 {
            return Some(DisabledReason::NotEligible);
        }
        if self.affected_node_ids(graph).is_none() {
            return Some(DisabledReason::NotDownloaded);
        }
        None
    }

    fn apply(&self, graph: &Graph) -> Graph {
        self.apply_internal(graph, 1.0)
    }
}

impl Transitionable for Scale {
    fn apply_at(&self, graph: &Graph, t: f64) -> Graph {
        self.apply_internal(graph, t.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Node, Way};

    #[test]
    fn scale_doubles_distance_from_pivot() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![Node::new(EntityId::new("a"), [2.0, 0.0]).into()]).unwrap();
        g.replace(vec![Way::new(EntityId::new("w1"), vec![EntityId::new("a")]).into()]).unwrap();

        let action = Scale::new(vec![EntityId::new("w1")], [0.0, 0.0], 2.0);
        let result = action.apply(&g);
        assert_eq!(result.entity(&EntityId::new("a")).unwrap().as_node().unwrap().loc, [4.0, 0.0]);
    }
}
