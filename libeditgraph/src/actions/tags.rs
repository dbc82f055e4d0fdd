//! `changeTags(entityId, tags)`: replaces an entity's tag map wholesale.

use super::{Action, DisabledReason};
use crate::entity::{Entity, EntityId, Tags};
use crate::graph::Graph;

#[derive(Debug, Clone)]
pub struct ChangeTags {
    pub entity_id: EntityId,
    pub tags: Tags,
}

impl ChangeTags {
    pub fn new(entity_id: EntityId, tags: Tags) -> Self {
        ChangeTags { entity_id, tags }
    }
}

impl Action for ChangeTags {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        if graph.has_entity(&self.entity_id).is_none() {
            return Some(DisabledReason::NotEligible);
        }
        None
    }

    fn apply(&self, graph: &Graph) -> Graph {
        let mut g = graph.derive();
        let updated = match graph.has_entity(&self.entity_id) {
            Some(Entity::Node(n)) => Some(n.with_tags(self.tags.clone()).into()),
            Some(Entity::Way(w)) => Some(w.with_tags(self.tags.clone()).into()),
            Some(Entity::Relation(r)) => Some(r.with_tags(self.tags.clone()).into()),
            None => None,
        };
        if let Some(e) = updated {
            let _ = g.replace(vec![e]);
        }
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Node;

    #[test]
    fn changes_tags_and_bumps_version() {
        let mut g = Graph::new_base().derive();
        g.replace(vec![Node::new(EntityId::new("a"), [0.0, 0.0]).into()]).unwrap();
        let mut tags = Tags::new();
        tags.insert("amenity".into(), "cafe".into());

        let action = ChangeTags::new(EntityId::new("a"), tags.clone());
        let result = action.apply(&g);
        let a = result.entity(&EntityId::new("a")).unwrap();
        assert_eq!(a.as_node().unwrap().tags, tags);
        assert_eq!(a.v(), 1);
    }
}
