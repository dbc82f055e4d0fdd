//! `circularize(wayId, {maxAngle=20deg}?, t?)`: pushes a closed way's nodes onto a circle.

use super::{Action, DisabledReason, Transitionable};
use crate::entity::{Entity, EntityId, Node, Way};
use crate::graph::Graph;
use std::f64::consts::PI;
use std::sync::Arc;

const DEFAULT_MAX_ANGLE_DEG: f64 = 20.0;

fn centroid(pts: &[[f64; 2]]) -> [f64; 2] {
    let n = pts.len() as f64;
    let sx: f64 = pts.iter().map(|p| p[0]).sum();
    let sy: f64 = pts.iter().map(|p| p[1]).sum();
    [sx / n, sy / n]
}

fn dist(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

fn lerp(a: [f64; 2], b: [f64; 2], t: f64) -> [f64; 2] {
    [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]
}

/// Signed area of the polygon; sign encodes winding direction.
fn signed_area(pts: &[[f64; 2]]) -> f64 {
    let mut sum = 0.0;
    for i in 0..pts.len() {
        let a = pts[i];
        let b = pts[(i + 1) % pts.len()];
        sum += a[0] * b[1] - b[0] * a[1];
    }
    sum / 2.0
}

#[derive(Debug, Clone)]
pub struct Circularize {
    pub way_id: EntityId,
    pub max_angle_deg: f64,
}

impl Circularize {
    pub fn new(way_id: EntityId) -> Self {
        Circularize {
            way_id,
            max_angle_deg: DEFAULT_MAX_ANGLE_DEG,
        }
    }

    pub fn max_angle_deg(mut self, deg: f64) -> Self {
        self.max_angle_deg = deg;
        self
    }

    fn min_vertices(&self) -> usize {
        ((360.0 / self.max_angle_deg).ceil() as usize).max(3)
    }

    fn way(&self, graph: &Graph) -> Option<Arc<Way>> {
        match graph.has_entity(&self.way_id)? {
            Entity::Way(w) if w.is_closed() => Some(w),
            _ => None,
        }
    }

    fn distinct_nodes(way: &Way) -> &[EntityId] {
        &way.nodes[..way.nodes.len().saturating_sub(1)]
    }

    fn is_already_circular(&self, graph: &Graph, way: &Way) -> bool {
        let ids = Self::distinct_nodes(way);
        if ids.len() < self.min_vertices() {
            return false;
        }
        let pts: Vec<[f64; 2]> = match ids
            .iter()
            .map(|id| graph.has_entity(id).and_then(|e| e.as_node().map(|n| n.loc)))
            .collect::<Option<Vec<_>>>()
        {
            Some(p) => p,
            None => return false,
        };
        let center = centroid(&pts);
        let radii: Vec<f64> = pts.iter().map(|p| dist(*p, center)).collect();
        let avg = radii.iter().sum::<f64>() / radii.len() as f64;
        if avg == 0.0 {
            return false;
        }
        radii.iter().all(|r| (r - avg).abs() < avg * 0.01)
    }

    fn ideal_positions(&self, graph: &Graph, way: &Way) -> Option<Vec<(EntityId, [f64; 2])>> {
        let ids = Self::distinct_nodes(way);
        let pts: Vec<[f64; 2]> = ids
            .iter()
            .map(|id| graph.has_entity(id).and_then(|e| e.as_node().map(|n| n.loc)))
            .collect::<Option<Vec<_>>>()?;
        let center = centroid(&pts);
        let radius = pts.iter().map(|p| dist(*p, center)).sum::<f64>() / pts.len() as f64;
        let winding = signed_area(&pts).signum();
        let start_angle = (pts[0][1] - center[1]).atan2(pts[0][0] - center[0]);
        let n = ids.len();
        let step = winding * 2.0 * PI / n as f64;

        Some(
            ids.iter()
                .enumerate()
                .map(|(i, id)| {
                    let angle = start_angle + step * i as f64;
                    let target = [center[0] + radius * angle.cos(), center[1] + radius * angle.sin()];
                    (id.clone(), target)
                })
                .collect(),
        )
    }

    fn apply_internal(&self, graph: &Graph, t: f64) -> Graph {
        let mut g = graph.derive();
        let way = match self.way(graph) {
            Some(w) => w,
            None => return g,
        };
        let targets = match self.ideal_positions(graph, &way) {
            Some(t) => t,
            None => return g,
        };

        let mut node_updates = Vec::new();
        for (id, target) in targets {
            // Nodes shared with another way keep most of their original
            // position: movement is damped rather than skipped entirely.
            let shared = graph.parent_way_ids(&id).iter().any(|w| *w != self.way_id);
            let damping = if shared { 0.15 } else { 1.0 };
            if let Some(Entity::Node(n)) = graph.has_entity(&id) {
                let new_loc = lerp(n.loc, target, t * damping);
                if new_loc != n.loc {
                    node_updates.push(n.moved(new_loc).into());
                }
            }
        }
        if !node_updates.is_empty() {
            let _ = g.replace(node_updates);
        }
        g
    }
}

impl Action for Circularize {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        let way = match self.way(graph) {
            Some(w) => w,
            None => return Some(DisabledReason::NotEligible),
        };
        if self.is_already_circular(graph, &way) {
            return Some(DisabledReason::AlreadyCircular);
        }
        None
    }

    fn apply(&self, graph: &Graph) -> Graph {
        self.apply_internal(graph, 1.0)
    }
}

impl Transitionable for Circularize {
    fn apply_at(&self, graph: &Graph, t: f64) -> Graph {
        self.apply_internal(graph, t.clamp(0.0, 1.0))
    }
}
