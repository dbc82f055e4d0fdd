use super::tags::{tags_indicate_area, Tags};
use super::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Way {
    pub id: EntityId,
    pub v: u64,
    pub tags: Tags,
    pub nodes: Vec<EntityId>,
    #[serde(default = "super::tags::default_visible")]
    pub visible: super::tags::Visible,
}

impl Way {
    pub fn new(id: EntityId, nodes: Vec<EntityId>) -> Self {
        Way {
            id,
            v: 0,
            tags: Tags::new(),
            nodes,
            visible: super::tags::Visible(true),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!((self.nodes.first(), self.nodes.last()), (Some(a), Some(b)) if a == b)
            && self.nodes.len() > 1
    }

    /// Fewer than 2 *distinct* nodes.
    pub fn is_degenerate(&self) -> bool {
        self.distinct_node_count() < 2
    }

    pub fn distinct_node_count(&self) -> usize {
        self.nodes.iter().collect::<BTreeSet<_>>().len()
    }

    pub fn is_area(&self) -> bool {
        self.is_closed() && tags_indicate_area(&self.tags)
    }

    pub fn first_node(&self) -> Option<&EntityId> {
        self.nodes.first()
    }

    pub fn last_node(&self) -> Option<&EntityId> {
        self.nodes.last()
    }

    pub fn with_nodes(&self, nodes: Vec<EntityId>) -> Self {
        let mut w = self.clone();
        w.nodes = nodes;
        w.v += 1;
        w
    }

    pub fn with_tags(&self, tags: Tags) -> Self {
        let mut w = self.clone();
        w.tags = tags;
        w.v += 1;
        w
    }

    /// Node ids referenced by this way, de-duplicated — used by topology
    /// maintenance's `removed`/`added` delta computation.
    pub fn node_refs(&self) -> BTreeSet<EntityId> {
        self.nodes.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: &str) -> EntityId {
        EntityId::new(i)
    }

    #[test]
    fn closed_requires_matching_endpoints_and_length() {
        let w = Way::new(n("w1"), vec![n("a"), n("b"), n("a")]);
        assert!(w.is_closed());
        let w2 = Way::new(n("w2"), vec![n("a"), n("b")]);
        assert!(!w2.is_closed());
        let w3 = Way::new(n("w3"), vec![n("a")]);
        assert!(!w3.is_closed());
    }

    #[test]
    fn degenerate_when_fewer_than_two_distinct_nodes() {
        let w = Way::new(n("w1"), vec![n("a"), n("a"), n("a")]);
        assert!(w.is_degenerate());
        let w2 = Way::new(n("w2"), vec![n("a"), n("b")]);
        assert!(!w2.is_degenerate());
    }

    #[test]
    fn area_requires_closed_and_area_tags() {
        let mut w = Way::new(n("w1"), vec![n("a"), n("b"), n("c"), n("a")]);
        assert!(!w.is_area());
        w.tags.insert("building".into(), "yes".into());
        assert!(w.is_area());
    }
}
