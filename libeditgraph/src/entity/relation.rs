use super::tags::Tags;
use super::EntityId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub member_type: MemberType,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: EntityId,
    pub v: u64,
    pub tags: Tags,
    pub members: Vec<Member>,
    #[serde(default = "super::tags::default_visible")]
    pub visible: super::tags::Visible,
}

impl Relation {
    pub fn new(id: EntityId) -> Self {
        Relation {
            id,
            v: 0,
            tags: Tags::new(),
            members: Vec::new(),
            visible: super::tags::Visible(true),
        }
    }

    pub fn is_multipolygon(&self) -> bool {
        self.tags.get("type").map(|t| t == "multipolygon").unwrap_or(false)
    }

    pub fn is_restriction(&self) -> bool {
        self.tags
            .get("type")
            .map(|t| t.starts_with("restriction"))
            .unwrap_or(false)
    }

    /// De-duplicated member ids: the same id may appear multiple times with
    /// different roles, but topology bookkeeping only cares
    /// about "is this id a member at all".
    pub fn member_ids_deduped(&self) -> std::collections::BTreeSet<EntityId> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }

    pub fn members_with_role<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a Member> + 'a {
        self.members.iter().filter(move |m| m.role == role)
    }

    pub fn with_members(&self, members: Vec<Member>) -> Self {
        let mut r = self.clone();
        r.members = members;
        r.v += 1;
        r
    }

    pub fn with_tags(&self, tags: Tags) -> Self {
        let mut r = self.clone();
        r.tags = tags;
        r.v += 1;
        r
    }
}
