//! `join(wayIds)`: merges two ways sharing an endpoint into one.

use super::{Action, DisabledReason};
use crate::entity::{merge_tags, Entity, EntityId, MemberType, Way};
use crate::graph::Graph;
use std::collections::BTreeSet;

/// Tag keys that identify *what* a way is rather than describing it;
/// a value clash on one of these is a real conflict, not something
/// `;`-joining can paper over.
const IDENTITY_KEYS: &[&str] = &["ref", "name"];

#[derive(Debug, Clone)]
pub struct Join {
    pub way_ids: Vec<EntityId>,
}

impl Join {
    pub fn new(way_ids: Vec<EntityId>) -> Self {
        Join { way_ids }
    }

    fn ways(&self, graph: &Graph) -> Option<Vec<std::sync::Arc<Way>>> {
        self.way_ids
            .iter()
            .map(|id| match graph.has_entity(id) {
                Some(Entity::Way(w)) => Some(w),
                _ => None,
            })
            .collect()
    }

    /// Orders ways end-to-end starting from `ways[0]`, returning the
    /// concatenated node sequence, or `None` if they are not all
    /// contiguous (share consecutive endpoints).
    fn chain_nodes(ways: &[std::sync::Arc<Way>]) -> Option<Vec<EntityId>> {
        let mut remaining: Vec<&std::sync::Arc<Way>> = ways.iter().collect();
        let first = remaining.remove(0);
        let mut nodes = first.nodes.clone();

        while !remaining.is_empty() {
            let head = nodes.first().cloned()?;
            let tail = nodes.last().cloned()?;
            let pos = remaining.iter().position(|w| {
                w.first_node() == Some(&head)
                    || w.first_node() == Some(&tail)
                    || w.last_node() == Some(&head)
                    || w.last_node() == Some(&tail)
            })?;
            let next = remaining.remove(pos);
            let mut next_nodes = next.nodes.clone();
            if next.first_node() == Some(&tail) {
                next_nodes.remove(0);
                nodes.extend(next_nodes);
            } else if next.last_node() == Some(&tail) {
                next_nodes.pop();
                next_nodes.reverse();
                nodes.extend(next_nodes);
            } else if next.last_node() == Some(&head) {
                next_nodes.pop();
                next_nodes.reverse();
                let mut out = next_nodes;
                out.extend(nodes);
                nodes = out;
            } else if next.first_node() == Some(&head) {
                next_nodes.remove(0);
                next_nodes.reverse();
                let mut out = next_nodes;
                out.extend(nodes);
                nodes = out;
            } else {
                return None;
            }
        }
        Some(nodes)
    }

    /// Prefers an already-uploaded way over a new one; among equals, the
    /// one with the lowest `osmId`.
    fn survivor_id(&self) -> &EntityId {
        self.way_ids
            .iter()
            .min_by_key(|id| (id.is_new(), id.osm_id().unwrap_or(i64::MAX)))
            .expect("join requires at least one way")
    }

    fn self_intersects(nodes: &[EntityId], graph: &Graph) -> bool {
        let pts: Vec<[f64; 2]> = nodes
            .iter()
            .filter_map(|id| graph.has_entity(id).and_then(|e| e.as_node().map(|n| n.loc)))
            .collect();
        if pts.len() < 4 {
            return false;
        }
        for i in 0..pts.len() - 1 {
            for j in (i + 2)..pts.len() - 1 {
                if i == 0 && j == pts.len() - 2 {
                    continue;
                }
                if segments_intersect(pts[i], pts[i + 1], pts[j], pts[j + 1]) {
                    return true;
                }
            }
        }
        false
    }
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

impl Action for Join {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        if self.way_ids.len() < 2 {
            return Some(DisabledReason::NotEligible);
        }
        let ways = match self.ways(graph) {
            Some(ws) if ws.iter().all(|w| !w.is_area()) => ws,
            _ => return Some(DisabledReason::NotEligible),
        };

        let nodes = match Self::chain_nodes(&ways) {
            Some(n) => n,
            None => return Some(DisabledReason::NotAdjacent),
        };

        let way_id_set: BTreeSet<&EntityId> = self.way_ids.iter().collect();

        // A relation that contains some but not all joined ways would be
        // extended or forked by the join.
        let mut relation_membership: std::collections::HashMap<EntityId, BTreeSet<&EntityId>> =
            std::collections::HashMap::new();
        for wid in &self.way_ids {
            if let Ok(rels) = graph.parent_relations(wid) {
                for rel in rels {
                    if rel.is_restriction() {
                        let via_is_joined_way = rel.members.iter().any(|m| {
                            m.role == "via" && m.member_type == MemberType::Way && way_id_set.contains(&m.id)
                        });
                        if via_is_joined_way {
                            // The via-way's ends are what a turn restriction
                            // anchors on; re-chaining it into a longer way
                            // changes which nodes count as its entry/exit.
                            return Some(DisabledReason::Connectivity);
                        }
                        // Any other restriction touching a joined way is
                        // treated conservatively: joining would change the
                        // path the restriction refers to.
                        return Some(DisabledReason::Restriction);
                    }
                    relation_membership.entry(rel.id.clone()).or_default().insert(wid);
                }
            }
        }
        for (_, members) in relation_membership {
            if members.len() != way_id_set.len() && members.len() > 1 {
                return Some(DisabledReason::ConflictingRelations);
            }
        }

        if Self::self_intersects(&nodes, graph) {
            return Some(DisabledReason::PathsIntersect);
        }

        let mut merged_tags = ways[0].tags.clone();
        for w in &ways[1..] {
            let (tags, conflicts) = merge_tags(&merged_tags, &w.tags);
            merged_tags = tags;
            if conflicts.iter().any(|k| IDENTITY_KEYS.contains(&k.as_str())) {
                return Some(DisabledReason::ConflictingTags);
            }
        }

        None
    }

    fn apply(&self, graph: &Graph) -> Graph {
        let mut g = graph.derive();
        let ways = match self.ways(graph) {
            Some(ws) => ws,
            None => return g,
        };
        let nodes = match Self::chain_nodes(&ways) {
            Some(n) => n,
            None => return g,
        };

        let survivor_id = self.survivor_id().clone();
        let survivor = ways.iter().find(|w| w.id == survivor_id).unwrap().clone();

        let mut merged_tags = ways[0].tags.clone();
        for w in &ways[1..] {
            let (tags, _) = merge_tags(&merged_tags, &w.tags);
            merged_tags = tags;
        }

        let new_survivor: Way = survivor.with_nodes(nodes).with_tags(merged_tags);
        let _ = g.replace(vec![new_survivor.into()]);

        let discarded: Vec<EntityId> = self.way_ids.iter().filter(|id| **id != survivor_id).cloned().collect();

        // Collapse relation memberships that contained every joined way
        // into a single membership in the survivor.
        let mut rel_updates = Vec::new();
        let mut seen_rels = BTreeSet::new();
        for wid in &self.way_ids {
            if let Ok(rels) = graph.parent_relations(wid) {
                for rel in rels {
                    if !seen_rels.insert(rel.id.clone()) {
                        continue;
                    }
                    let member_way_ids: BTreeSet<&EntityId> = rel
                        .members
                        .iter()
                        .filter(|m| m.member_type == MemberType::Way)
                        .map(|m| &m.id)
                        .collect();
                    if self.way_ids.iter().all(|wid| member_way_ids.contains(wid)) {
                        let mut kept_survivor = false;
                        let members = rel
                            .members
                            .iter()
                            .filter_map(|m| {
                                if discarded.contains(&m.id) {
                                    None
                                } else if m.id == survivor_id {
                                    if kept_survivor {
                                        None
                                    } else {
                                        kept_survivor = true;
                                        Some(m.clone())
                                    }
                                } else {
                                    Some(m.clone())
                                }
                            })
                            .collect();
                        rel_updates.push(rel.with_members(members).into());
                    }
                }
            }
        }
        if !rel_updates.is_empty() {
            let _ = g.replace(rel_updates);
        }

        let _ = g.remove(discarded);
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Member, Node, Relation};

    fn setup() -> Graph {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
            Node::new(EntityId::new("b"), [2.0, 0.0]).into(),
            Node::new(EntityId::new("c"), [4.0, 0.0]).into(),
        ])
        .unwrap();
        g.replace(vec![
            Way::new(EntityId::new("-"), vec![EntityId::new("a"), EntityId::new("b")]).into(),
            Way::new(EntityId::new("="), vec![EntityId::new("b"), EntityId::new("c")]).into(),
        ])
        .unwrap();
        g
    }

    #[test]
    fn scenario1_join_two_ways_sharing_endpoint() {
        let g = setup();
        let action = Join::new(vec![EntityId::new("-"), EntityId::new("=")]);
        assert!(action.disabled(&g).is_none());
        let result = action.apply(&g);
        let survivor = result.entity(&EntityId::new("-")).unwrap();
        assert_eq!(
            survivor.as_way().unwrap().nodes,
            vec![EntityId::new("a"), EntityId::new("b"), EntityId::new("c")]
        );
        assert!(result.has_entity(&EntityId::new("=")).is_none());
    }

    #[test]
    fn non_adjacent_ways_are_disabled() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
            Node::new(EntityId::new("b"), [1.0, 0.0]).into(),
            Node::new(EntityId::new("c"), [10.0, 10.0]).into(),
            Node::new(EntityId::new("d"), [11.0, 10.0]).into(),
        ])
        .unwrap();
        g.replace(vec![
            Way::new(EntityId::new("w1"), vec![EntityId::new("a"), EntityId::new("b")]).into(),
            Way::new(EntityId::new("w2"), vec![EntityId::new("c"), EntityId::new("d")]).into(),
        ])
        .unwrap();
        let action = Join::new(vec![EntityId::new("w1"), EntityId::new("w2")]);
        assert_eq!(action.disabled(&g), Some(DisabledReason::NotAdjacent));
    }

    #[test]
    fn joined_way_as_via_is_a_connectivity_conflict() {
        let g = setup();
        let mut g = g.derive();
        let mut rel = Relation::new(EntityId::new("r1"));
        rel.tags.insert("type".into(), "restriction".into());
        rel.tags.insert("restriction".into(), "no_u_turn".into());
        let rel = rel.with_members(vec![
            Member { id: EntityId::new("other"), member_type: MemberType::Way, role: "from".into() },
            Member { id: EntityId::new("-"), member_type: MemberType::Way, role: "via".into() },
            Member { id: EntityId::new("other2"), member_type: MemberType::Way, role: "to".into() },
        ]);
        g.replace(vec![rel.into()]).unwrap();

        let action = Join::new(vec![EntityId::new("-"), EntityId::new("=")]);
        assert_eq!(action.disabled(&g), Some(DisabledReason::Connectivity));
    }

    #[test]
    fn conflicting_ref_values_disable_the_join() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
            Node::new(EntityId::new("b"), [2.0, 0.0]).into(),
            Node::new(EntityId::new("c"), [4.0, 0.0]).into(),
        ])
        .unwrap();
        let mut w1 = Way::new(EntityId::new("-"), vec![EntityId::new("a"), EntityId::new("b")]);
        w1.tags.insert("ref".into(), "A1".into());
        let mut w2 = Way::new(EntityId::new("="), vec![EntityId::new("b"), EntityId::new("c")]);
        w2.tags.insert("ref".into(), "B2".into());
        g.replace(vec![w1.into(), w2.into()]).unwrap();

        let action = Join::new(vec![EntityId::new("-"), EntityId::new("=")]);
        assert_eq!(action.disabled(&g), Some(DisabledReason::ConflictingTags));
    }
}
