//! `connect(nodeIds)`: merges coincident nodes into one, rewiring parents.

use super::{Action, DisabledReason};
use crate::entity::{Entity, EntityId, MemberType, Node};
use crate::graph::Graph;

#[derive(Debug, Clone)]
pub struct Connect {
    pub node_ids: Vec<EntityId>,
}

impl Connect {
    pub fn new(node_ids: Vec<EntityId>) -> Self {
        Connect { node_ids }
    }

    /// The first already-uploaded node in the list, else the last node
    /// given.
    fn survivor(&self) -> &EntityId {
        self.node_ids
            .iter()
            .find(|id| !id.is_new())
            .unwrap_or_else(|| self.node_ids.last().expect("connect requires at least one node"))
    }

    /// Restriction relations that name `id` as `via`, together with the
    /// `from`/`to` way members of that same relation.
    fn restriction_context(&self, graph: &Graph, id: &EntityId) -> Vec<(EntityId, Vec<EntityId>)> {
        let mut out = Vec::new();
        if let Ok(rels) = graph.parent_relations(id) {
            for rel in rels {
                if !rel.is_restriction() {
                    continue;
                }
                let is_via = rel
                    .members
                    .iter()
                    .any(|m| m.id == *id && m.role == "via" && m.member_type == MemberType::Node);
                if !is_via {
                    continue;
                }
                let endpoints: Vec<EntityId> = rel
                    .members
                    .iter()
                    .filter(|m| m.role == "from" || m.role == "to")
                    .map(|m| m.id.clone())
                    .collect();
                out.push((rel.id.clone(), endpoints));
            }
        }
        out
    }
}

impl Action for Connect {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        if self.node_ids.len() < 2 {
            return Some(DisabledReason::NotEligible);
        }
        for id in &self.node_ids {
            match graph.has_entity(id) {
                Some(Entity::Node(_)) => {}
                _ => return Some(DisabledReason::NotEligible),
            }
        }

        // Restriction: merging a via-node with a node belonging to one of
        // that relation's from/to ways collapses the restriction's path.
        for via_id in &self.node_ids {
            for (_, endpoint_ways) in self.restriction_context(graph, via_id) {
                for other_id in &self.node_ids {
                    if other_id == via_id {
                        continue;
                    }
                    let other_ways = graph.parent_way_ids(other_id);
                    if endpoint_ways.iter().any(|w| other_ways.contains(w)) {
                        return Some(DisabledReason::Restriction);
                    }
                }
            }
        }

        // Two merging nodes sharing a relation membership under different
        // roles cannot be soundly collapsed into one.
        for i in 0..self.node_ids.len() {
            for j in (i + 1)..self.node_ids.len() {
                let a = &self.node_ids[i];
                let b = &self.node_ids[j];
                if let (Ok(rels_a), Ok(rels_b)) =
                    (graph.parent_relations(a), graph.parent_relations(b))
                {
                    for ra in &rels_a {
                        for rb in &rels_b {
                            if ra.id != rb.id {
                                continue;
                            }
                            let role_a = ra.members.iter().find(|m| m.id == *a).map(|m| &m.role);
                            let role_b = rb.members.iter().find(|m| m.id == *b).map(|m| &m.role);
                            if role_a.is_some() && role_b.is_some() && role_a != role_b {
                                return Some(DisabledReason::Relation);
                            }
                        }
                    }
                }
            }
        }

        None
    }

    fn apply(&self, graph: &Graph) -> Graph {
        let mut g = graph.derive();
        if self.node_ids.len() < 2 {
            return g;
        }
        let survivor_id = self.survivor().clone();
        let discarded: Vec<EntityId> = self
            .node_ids
            .iter()
            .filter(|id| **id != survivor_id)
            .cloned()
            .collect();

        let survivor = match graph.entity(&survivor_id) {
            Ok(Entity::Node(n)) => n,
            _ => return g,
        };
        let mut merged_tags = survivor.tags.clone();
        for id in &discarded {
            if let Ok(Entity::Node(n)) = graph.entity(id) {
                let (tags, _conflicts) = crate::entity::merge_tags(&merged_tags, &n.tags);
                merged_tags = tags;
            }
        }
        let new_survivor: Node = survivor.with_tags(merged_tags);
        let _ = g.replace(vec![new_survivor.into()]);

        // Rewrite every way's node list, collapsing adjacent duplicates left
        // by the merge.
        let mut way_updates = Vec::new();
        for wid in graph.parent_way_ids(&discarded[0]).union_many(&discarded, graph) {
            if let Ok(Entity::Way(w)) = graph.entity(&wid) {
                let rewritten: Vec<EntityId> = w
                    .nodes
                    .iter()
                    .map(|n| if discarded.contains(n) { survivor_id.clone() } else { n.clone() })
                    .collect();
                let mut deduped = Vec::with_capacity(rewritten.len());
                for n in rewritten {
                    if deduped.last() != Some(&n) {
                        deduped.push(n);
                    }
                }
                way_updates.push(w.with_nodes(deduped).into());
            }
        }
        if !way_updates.is_empty() {
            let _ = g.replace(way_updates);
        }

        // Rewrite relation memberships referencing discarded nodes.
        let mut rel_updates = Vec::new();
        for d in &discarded {
            if let Ok(rels) = graph.parent_relations(d) {
                for rel in rels {
                    let members = rel
                        .members
                        .iter()
                        .map(|m| {
                            if discarded.contains(&m.id) {
                                let mut m2 = m.clone();
                                m2.id = survivor_id.clone();
                                m2
                            } else {
                                m.clone()
                            }
                        })
                        .collect();
                    rel_updates.push(rel.with_members(members).into());
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

/// Small helper trait so `apply` can gather "every way touched by any of
/// these node ids" without allocating an intermediate `HashSet` at each
/// call site.
trait UnionParentWays {
    fn union_many(self, ids: &[EntityId], graph: &Graph) -> std::collections::BTreeSet<EntityId>;
}

impl UnionParentWays for std::collections::BTreeSet<EntityId> {
    fn union_many(self, ids: &[EntityId], graph: &Graph) -> std::collections::BTreeSet<EntityId> {
        let mut out = self;
        for id in ids {
            out.extend(graph.parent_way_ids(id));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Member, MemberType, Relation, Way};

    fn n(id: &str, loc: [f64; 2]) -> Entity {
        Node::new(EntityId::new(id), loc).into()
    }

    #[test]
    fn scenario3_connect_via_node_to_from_way_endpoint_is_restricted() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![
            n("a", [0.0, 0.0]),
            n("b", [1.0, 0.0]),
            n("c", [2.0, 0.0]),
            n("d", [3.0, 0.0]),
            n("e", [4.0, 0.0]),
        ])
        .unwrap();
        g.replace(vec![
            Way::new(EntityId::new("-"), vec![EntityId::new("a"), EntityId::new("b"), EntityId::new("c")]).into(),
            Way::new(EntityId::new("|"), vec![EntityId::new("c"), EntityId::new("d"), EntityId::new("e")]).into(),
        ])
        .unwrap();
        let mut rel = Relation::new(EntityId::new("r1"));
        rel.tags.insert("type".into(), "restriction".into());
        rel.tags.insert("restriction".into(), "no_right_turn".into());
        let rel = rel.with_members(vec![
            Member { id: EntityId::new("-"), member_type: MemberType::Way, role: "from".into() },
            Member { id: EntityId::new("c"), member_type: MemberType::Node, role: "via".into() },
            Member { id: EntityId::new("|"), member_type: MemberType::Way, role: "to".into() },
        ]);
        g.replace(vec![rel.into()]).unwrap();

        let action = Connect::new(vec![EntityId::new("a"), EntityId::new("c")]);
        assert_eq!(action.disabled(&g), Some(DisabledReason::Restriction));
    }

    #[test]
    fn survivor_prefers_already_uploaded_node() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![n("n5", [0.0, 0.0]), n("n-1", [1.0, 0.0])]).unwrap();
        let action = Connect::new(vec![EntityId::new("n-1"), EntityId::new("n5")]);
        assert_eq!(action.survivor(), &EntityId::new("n5"));
    }

    #[test]
    fn merges_node_tags_and_rewrites_way_refs() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![n("a", [0.0, 0.0]), n("b", [1.0, 0.0])]).unwrap();
        g.replace(vec![Way::new(EntityId::new("w1"), vec![EntityId::new("a"), EntityId::new("b")]).into()])
            .unwrap();

        let action = Connect::new(vec![EntityId::new("a"), EntityId::new("b")]);
        assert!(action.disabled(&g).is_none());
        let result = action.apply(&g);
        assert!(result.has_entity(&EntityId::new("a")).is_none());
        let way = result.entity(&EntityId::new("w1")).unwrap();
        assert_eq!(way.as_way().unwrap().nodes, vec![EntityId::new("b")]);
    }
}
