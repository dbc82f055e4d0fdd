//! Immutable OSM entities: [`Node`], [`Way`], [`Relation`], unified under
//! [`Entity`]. Every mutation produces a new, independently `v`-versioned
//! value rather than mutating in place — the [`crate::graph::Graph`] layers
//! hold these by value behind `Arc` so that cloning the local overlay on
//! derivation is cheap.

mod bbox;
mod id;
mod node;
mod relation;
mod tags;
mod way;

pub use bbox::{BBox, Geometry};
pub use id::{EntityId, EntityKind, IdAllocator};
pub use node::Node;
pub use relation::{Member, MemberType, Relation};
pub use tags::{merge_tags, tags_indicate_area, Tags, Visible};
pub use way::Way;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A node, way, or relation, held by reference-counted pointer so that
/// storing the same unchanged entity in many `Edit`s (undo history) and
/// many graph derivations is O(1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Entity {
    Node(Arc<Node>),
    Way(Arc<Way>),
    Relation(Arc<Relation>),
}

impl Entity {
    pub fn id(&self) -> &EntityId {
        match self {
            Entity::Node(n) => &n.id,
            Entity::Way(w) => &w.id,
            Entity::Relation(r) => &r.id,
        }
    }

    pub fn v(&self) -> u64 {
        match self {
            Entity::Node(n) => n.v,
            Entity::Way(w) => w.v,
            Entity::Relation(r) => r.v,
        }
    }

    pub fn tags(&self) -> &Tags {
        match self {
            Entity::Node(n) => &n.tags,
            Entity::Way(w) => &w.tags,
            Entity::Relation(r) => &r.tags,
        }
    }

    pub fn visible(&self) -> bool {
        match self {
            Entity::Node(n) => n.visible.0,
            Entity::Way(w) => w.visible.0,
            Entity::Relation(r) => r.visible.0,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Node(_) => EntityKind::Node,
            Entity::Way(_) => EntityKind::Way,
            Entity::Relation(_) => EntityKind::Relation,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Entity::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_way(&self) -> Option<&Way> {
        match self {
            Entity::Way(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            Entity::Relation(r) => Some(r),
            _ => None,
        }
    }

    /// Node ids this way references, or member ids this relation
    /// references (de-duplicated). `None` for nodes, which have no
    /// children. Used by topology maintenance.
    pub fn child_refs(&self) -> Option<std::collections::BTreeSet<EntityId>> {
        match self {
            Entity::Node(_) => None,
            Entity::Way(w) => Some(w.node_refs()),
            Entity::Relation(r) => Some(r.member_ids_deduped()),
        }
    }

    /// Value equality by `(id, v)`, per the Difference component's
    /// equality contract: two instances of the same id with
    /// the same `v` are identical regardless of any other field.
    pub fn same_version(&self, other: &Entity) -> bool {
        self.id() == other.id() && self.v() == other.v()
    }
}

impl From<Node> for Entity {
    fn from(n: Node) -> Self {
        Entity::Node(Arc::new(n))
    }
}

impl From<Way> for Entity {
    fn from(w: Way) -> Self {
        Entity::Way(Arc::new(w))
    }
}

impl From<Relation> for Entity {
    fn from(r: Relation) -> Self {
        Entity::Relation(Arc::new(r))
    }
}

/// A value stored in a [`crate::graph::Graph`]'s local overlay: either a
/// live entity override or a tombstone recording the deletion of a base
/// entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LocalValue {
    Entity(Entity),
    Tombstone,
}

impl LocalValue {
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            LocalValue::Entity(e) => Some(e),
            LocalValue::Tombstone => None,
        }
    }
}
