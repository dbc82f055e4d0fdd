//! `straighten(wayId)`: projects interior nodes onto the chord between endpoints.

use super::{Action, DisabledReason};
use crate::entity::{Entity, EntityId, Way};
use crate::graph::Graph;

fn project_onto_segment(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let len2 = ab[0] * ab[0] + ab[1] * ab[1];
    if len2 == 0.0 {
        return a;
    }
    let ap = [p[0] - a[0], p[1] - a[1]];
    let t = (ap[0] * ab[0] + ap[1] * ab[1]) / len2;
    let t = t.clamp(0.0, 1.0);
    [a[0] + ab[0] * t, a[1] + ab[1] * t]
}

fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

fn segments_intersect(p1: [f64; 2], p2: [f64; 2], p3: [f64; 2], p4: [f64; 2]) -> bool {
    let d1 = cross(p3, p4, p1);
    let d2 = cross(p3, p4, p2);
    let d3 = cross(p1, p2, p3);
    let d4 = cross(p1, p2, p4);
    ((d1 > 0.0) != (d2 > 0.0)) && ((d3 > 0.0) != (d4 > 0.0))
}

#[derive(Debug, Clone)]
pub struct Straighten {
    pub way_id: EntityId,
}

impl Straighten {
    pub fn new(way_id: EntityId) -> Self {
        Straighten { way_id }
    }

    fn way(&self, graph: &Graph) -> Option<std::sync::Arc<Way>> {
        match graph.has_entity(&self.way_id)? {
            Entity::Way(w) if !w.is_closed() && w.nodes.len() >= 3 => Some(w),
            _ => None,
        }
    }

    fn straightened_points(&self, graph: &Graph, way: &Way) -> Option<Vec<[f64; 2]>> {
        let locs: Vec<[f64; 2]> = way
            .nodes
            .iter()
            .map(|id| graph.has_entity(id).and_then(|e| e.as_node().map(|n| n.loc)))
            .collect::<Option<Vec<_>>>()?;
        let a = *locs.first()?;
        let b = *locs.last()?;
        Some(
            locs.iter()
                .enumerate()
                .map(|(i, loc)| {
                    if i == 0 || i == locs.len() - 1 {
                        *loc
                    } else if graph.parent_way_ids(&way.nodes[i]).iter().any(|w| *w != self.way_id) {
                        *loc
                    } else {
                        project_onto_segment(*loc, a, b)
                    }
                })
                .collect(),
        )
    }
}

impl Action for Straighten {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        let way = match self.way(graph) {
            Some(w) => w,
            None => return Some(DisabledReason::NotEligible),
        };
        let points = match self.straightened_points(graph, &way) {
            Some(p) => p,
            None => return Some(DisabledReason::NotEligible),
        };
        for i in 0..points.len().saturating_sub(1) {
            for j in (i + 2)..points.len().saturating_sub(1) {
                if segments_intersect(points[i], points[i + 1], points[j], points[j + 1]) {
                    return Some(DisabledReason::TooBendy);
                }
            }
        }
        None
    }

    fn apply(&self, graph: &Graph) -> Graph {
        let mut g = graph.derive();
        let way = match self.way(graph) {
            Some(w) => w,
            None => return g,
        };
        let points = match self.straightened_points(graph, &way) {
            Some(p) => p,
            None => return g,
        };
        let updates: Vec<Entity> = way
            .nodes
            .iter()
            .zip(points)
            .filter_map(|(id, loc)| match graph.has_entity(id)? {
                Entity::Node(n) if n.loc != loc => Some(n.moved(loc).into()),
                _ => None,
            })
            .collect();
        if !updates.is_empty() {
            let _ = g.replace(updates);
        }
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Node;

    #[test]
    fn interior_node_projects_onto_the_endpoint_chord() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
            Node::new(EntityId::new("b"), [1.0, 1.0]).into(),
            Node::new(EntityId::new("c"), [2.0, 0.0]).into(),
        ])
        .unwrap();
        g.replace(vec![Way::new(
            EntityId::new("w1"),
            vec![EntityId::new("a"), EntityId::new("b"), EntityId::new("c")],
        )
        .into()])
        .unwrap();

        let action = Straighten::new(EntityId::new("w1"));
        assert!(action.disabled(&g).is_none());
        let result = action.apply(&g);
        let b = result.entity(&EntityId::new("b")).unwrap().as_node().unwrap().loc;
        assert!((b[1]).abs() < 1e-9);
    }
}
