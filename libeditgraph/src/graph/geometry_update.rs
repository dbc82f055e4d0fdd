//! Geometry recompute pass: after a set of
//! mutations commits, every touched way or relation gets its derived
//! geometry recomputed in a single pass, resilient to entities that have
//! meanwhile been deleted.

use super::Graph;
use crate::entity::{BBox, Entity, EntityId, Geometry};
use crate::error::GraphError;
use std::collections::{BTreeSet, HashMap};

/// Computes the [`Geometry`] of a single entity against `graph`. Nodes have
/// no derived geometry field of their own beyond point-vs-vertex, which is
/// cheap enough to compute on every call rather than cache.
pub fn compute_geometry(graph: &Graph, entity: &Entity) -> Result<Geometry, GraphError> {
    match entity {
        Entity::Node(n) => {
            if graph.parent_way_ids(&n.id).is_empty() {
                Ok(Geometry::Point { loc: n.loc })
            } else {
                Ok(Geometry::Vertex { loc: n.loc })
            }
        }
        Entity::Way(w) => {
            let points: Vec<[f64; 2]> = graph
                .child_nodes(w)?
                .into_iter()
                .map(|n| n.loc)
                .collect();
            if w.is_area() {
                Ok(Geometry::Area { points })
            } else {
                Ok(Geometry::Line { points })
            }
        }
        Entity::Relation(_) => Ok(Geometry::Relation),
    }
}

/// Recomputes geometry for every id in `touched`, skipping ids that have
/// since been deleted (a single pass over unique ids).
pub fn recompute_geometries(graph: &Graph, touched: &[EntityId]) -> HashMap<EntityId, Geometry> {
    let unique: BTreeSet<&EntityId> = touched.iter().collect();
    let mut out = HashMap::new();
    for id in unique {
        if let Some(entity) = graph.has_entity(id) {
            if let Ok(g) = compute_geometry(graph, &entity) {
                out.insert(id.clone(), g);
            }
        }
    }
    out
}

/// Computes a way/relation/node's extent, recursing into child geometry.
/// Relation traversal is guarded by `visited` so a self-referential
/// relation cycle cannot loop forever —
/// a relation already on the path contributes no extent the second time it
/// is seen.
pub fn entity_extent(
    graph: &Graph,
    id: &EntityId,
    visited: &mut BTreeSet<EntityId>,
) -> Result<Option<BBox>, GraphError> {
    if !visited.insert(id.clone()) {
        return Ok(None);
    }
    let entity = graph.entity(id)?;
    let result = match &entity {
        Entity::Node(n) => Ok(Some(BBox::point(n.loc))),
        Entity::Way(w) => {
            let mut bbox: Option<BBox> = None;
            for node in graph.child_nodes(w)? {
                let b = BBox::point(node.loc);
                bbox = Some(match bbox {
                    Some(existing) => existing.union(&b),
                    None => b,
                });
            }
            Ok(bbox)
        }
        Entity::Relation(r) => {
            let mut bbox: Option<BBox> = None;
            for member in &r.members {
                if let Some(b) = entity_extent(graph, &member.id, visited)? {
                    bbox = Some(match bbox {
                        Some(existing) => existing.union(&b),
                        None => b,
                    });
                }
            }
            Ok(bbox)
        }
    };
    visited.remove(id);
    result
}
