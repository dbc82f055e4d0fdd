use super::tags::Tags;
use super::EntityId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: EntityId,
    pub v: u64,
    pub tags: Tags,
    /// `[lon, lat]` in WGS84.
    pub loc: [f64; 2],
    #[serde(default = "super::tags::default_visible")]
    pub visible: super::tags::Visible,
}

impl Node {
    pub fn new(id: EntityId, loc: [f64; 2]) -> Self {
        Node {
            id,
            v: 0,
            tags: Tags::new(),
            loc,
            visible: super::tags::Visible(true),
        }
    }

    /// Returns a new version of this node with an updated location,
    /// bumping `v`.
    pub fn moved(&self, loc: [f64; 2]) -> Self {
        let mut n = self.clone();
        n.loc = loc;
        n.v += 1;
        n
    }

    pub fn with_tags(&self, tags: Tags) -> Self {
        let mut n = self.clone();
        n.tags = tags;
        n.v += 1;
        n
    }
}
