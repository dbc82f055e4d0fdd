//! `copy(entityIds) -> ClipboardEntities` / `paste(clipboard, loc, ids)` —
//! Unlike the other actions these are plain functions: a
//! clipboard is a value, not a graph transform with a `disabled` check.

use crate::entity::{Entity, EntityId, IdAllocator, Node, Relation, Way};
use crate::graph::Graph;
use std::collections::BTreeMap;

/// A self-contained snapshot of entities copied out of a graph, including
/// every node a copied way/relation transitively depends on.
#[derive(Debug, Clone)]
pub struct Clipboard {
    pub entities: Vec<Entity>,
}

/// Snapshots `entity_ids` and their transitive node dependencies out of
/// `graph`. Missing ids are silently skipped.
pub fn copy(graph: &Graph, entity_ids: &[EntityId]) -> Clipboard {
    let mut collected: BTreeMap<EntityId, Entity> = BTreeMap::new();
    let mut queue: Vec<EntityId> = entity_ids.to_vec();
    while let Some(id) = queue.pop() {
        if collected.contains_key(&id) {
            continue;
        }
        let entity = match graph.has_entity(&id) {
            Some(e) => e,
            None => continue,
        };
        if let Entity::Way(w) = &entity {
            queue.extend(w.nodes.iter().cloned());
        }
        collected.insert(id, entity);
    }
    Clipboard {
        entities: collected.into_values().collect(),
    }
}

/// Materializes `clipboard` into `graph` as brand-new entities, offset so
/// that the centroid of all copied node locations lands at `loc`. New ids
/// are drawn from `ids`; relation members and way node lists are rewritten
/// to the newly allocated ids.
pub fn paste(graph: &Graph, clipboard: &Clipboard, loc: [f64; 2], ids: &mut IdAllocator) -> Graph {
    let mut g = graph.derive();

    let node_locs: Vec<[f64; 2]> = clipboard
        .entities
        .iter()
        .filter_map(|e| e.as_node().map(|n| n.loc))
        .collect();
    let centroid = if node_locs.is_empty() {
        loc
    } else {
        let n = node_locs.len() as f64;
        [
            node_locs.iter().map(|p| p[0]).sum::<f64>() / n,
            node_locs.iter().map(|p| p[1]).sum::<f64>() / n,
        ]
    };
    let offset = [loc[0] - centroid[0], loc[1] - centroid[1]];

    let mut id_map: BTreeMap<EntityId, EntityId> = BTreeMap::new();
    for e in &clipboard.entities {
        let new_id = ids.next(e.kind());
        id_map.insert(e.id().clone(), new_id);
    }

    let mut new_entities = Vec::with_capacity(clipboard.entities.len());
    for e in &clipboard.entities {
        let new_id = id_map[e.id()].clone();
        match e {
            Entity::Node(n) => {
                let pasted = Node {
                    id: new_id,
                    v: 0,
                    tags: n.tags.clone(),
                    loc: [n.loc[0] + offset[0], n.loc[1] + offset[1]],
                    visible: n.visible,
                };
                new_entities.push(pasted.into());
            }
            Entity::Way(w) => {
                let nodes: Vec<EntityId> = w
                    .nodes
                    .iter()
                    .map(|id| id_map.get(id).cloned().unwrap_or_else(|| id.clone()))
                    .collect();
                let pasted = Way {
                    id: new_id,
                    v: 0,
                    tags: w.tags.clone(),
                    nodes,
                    visible: w.visible,
                };
                new_entities.push(pasted.into());
            }
            Entity::Relation(r) => {
                let members = r
                    .members
                    .iter()
                    .map(|m| {
                        let mut m2 = m.clone();
                        if let Some(mapped) = id_map.get(&m.id) {
                            m2.id = mapped.clone();
                        }
                        m2
                    })
                    .collect();
                let pasted = Relation {
                    id: new_id,
                    v: 0,
                    tags: r.tags.clone(),
                    members,
                    visible: r.visible,
                };
                new_entities.push(pasted.into());
            }
        }
    }

    let _ = g.replace(new_entities);
    g
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paste_allocates_fresh_ids_and_offsets_to_target_loc() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("n1"), [0.0, 0.0]).into(),
            Node::new(EntityId::new("n2"), [2.0, 0.0]).into(),
        ])
        .unwrap();
        g.replace(vec![Way::new(EntityId::new("w1"), vec![EntityId::new("n1"), EntityId::new("n2")]).into()])
            .unwrap();

        let clipboard = copy(&g, &[EntityId::new("w1")]);
        assert_eq!(clipboard.entities.len(), 3);

        let mut alloc = IdAllocator::new();
        let result = paste(&g, &clipboard, [10.0, 10.0], &mut alloc);

        let pasted_way = result
            .has_entity(&EntityId::new("w-1"))
            .expect("way id allocation is deterministic for a fresh allocator");
        let way = pasted_way.as_way().unwrap();
        assert_eq!(way.nodes.len(), 2);
        assert_ne!(way.nodes[0], EntityId::new("n1"));
    }
}
