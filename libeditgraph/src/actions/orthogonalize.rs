//! `orthogonalize(wayId, t?)`: iteratively squares a way's corners toward 90 degrees.

use super::{Action, DisabledReason, Transitionable};
use crate::entity::{Entity, EntityId, Way};
use crate::graph::Graph;

fn lerp(a: [f64; 2], b: [f64; 2], t: f64) -> [f64; 2] {
    [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]
}

/// One relaxation step that nudges every corner toward a right angle,
/// following the classic "square corners" iterative approach: for each
/// vertex, project it toward the position that would make its two
/// adjacent edges perpendicular, weighted by how close to square the
/// corner already is.
fn square_corners_once(points: &[[f64; 2]], closed: bool) -> Vec<[f64; 2]> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let mut out = points.to_vec();
    let last = if closed { n - 1 } else { n };
    for i in 0..last {
        if !closed && (i == 0 || i == n - 1) {
            continue;
        }
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];
        let a = [prev[0] - cur[0], prev[1] - cur[1]];
        let b = [next[0] - cur[0], next[1] - cur[1]];
        let a_len = (a[0] * a[0] + a[1] * a[1]).sqrt();
        let b_len = (b[0] * b[0] + b[1] * b[1]).sqrt();
        if a_len == 0.0 || b_len == 0.0 {
            continue;
        }
        let dot = (a[0] * b[0] + a[1] * b[1]) / (a_len * b_len);
        // dot == 0 already orthogonal; nudge proportional to how far off.
        let correction = dot * 0.5;
        let a_n = [a[0] / a_len, a[1] / a_len];
        let b_n = [b[0] / b_len, b[1] / b_len];
        let bisector = [a_n[0] + b_n[0], a_n[1] + b_n[1]];
        out[i] = [cur[0] + bisector[0] * correction, cur[1] + bisector[1] * correction];
    }
    out
}

#[derive(Debug, Clone)]
pub struct Orthogonalize {
    pub way_id: EntityId,
    pub iterations: usize,
}

impl Orthogonalize {
    pub fn new(way_id: EntityId) -> Self {
        Orthogonalize { way_id, iterations: 4 }
    }

    fn way(&self, graph: &Graph) -> Option<std::sync::Arc<Way>> {
        match graph.has_entity(&self.way_id)? {
            Entity::Way(w) if w.distinct_node_count() >= 3 => Some(w),
            _ => None,
        }
    }

    fn apply_internal(&self, graph: &Graph, t: f64) -> Graph {
        let mut g = graph.derive();
        let way = match self.way(graph) {
            Some(w) => w,
            None => return g,
        };
        let original: Vec<[f64; 2]> = match way
            .nodes
            .iter()
            .map(|id| graph.has_entity(id).and_then(|e| e.as_node().map(|n| n.loc)))
            .collect::<Option<Vec<_>>>()
        {
            Some(p) => p,
            None => return g,
        };

        let mut squared = original.clone();
        for _ in 0..self.iterations {
            squared = square_corners_once(&squared, way.is_closed());
        }

        let updates: Vec<Entity> = way
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, id)| {
                let shared = graph.parent_way_ids(id).iter().any(|w| *w != self.way_id);
                let target = if shared { original[i] } else { squared[i] };
                let interpolated = lerp(original[i], target, t);
                match graph.has_entity(id)? {
                    Entity::Node(n) if n.loc != interpolated => Some(n.moved(interpolated).into()),
                    _ => None,
                }
            })
            .collect();
        if !updates.is_empty() {
            let _ = g.replace(updates);
        }
        g
    }
}

impl Action for Orthogonalize {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        if self.way(graph).is_none() {
            return Some(DisabledReason::NotEligible);
        }
        None
    }

    fn apply(&self, graph: &Graph) -> Graph {
        self.apply_internal(graph, 1.0)
    }
}

impl Transitionable for Orthogonalize {
    fn apply_at(&self, graph: &Graph, t: f64) -> Graph {
        self.apply_internal(graph, t.clamp(0.0, 1.0))
    }
}
