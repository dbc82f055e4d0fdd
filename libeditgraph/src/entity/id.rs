use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of OSM entity an [`EntityId`] addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Node,
    Way,
    Relation,
}

impl EntityKind {
    pub fn prefix(self) -> char {
        match self {
            EntityKind::Node => 'n',
            EntityKind::Way => 'w',
            EntityKind::Relation => 'r',
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Node => write!(f, "node"),
            EntityKind::Way => write!(f, "way"),
            EntityKind::Relation => write!(f, "relation"),
        }
    }
}

/// A stable entity identifier, e.g. `n123`, `w-4` (a new, not-yet-uploaded
/// way), `r987654`.
///
/// `EntityId` is a thin string wrapper rather than a struct-of-fields
/// encoding, matching the original editor's id convention verbatim: the
/// `osmId` magnitude and sign are derived on demand, not stored twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub(crate) String);

impl EntityId {
    pub fn new(s: impl Into<String>) -> Self {
        EntityId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> Option<EntityKind> {
        match self.0.as_bytes().first() {
            Some(b'n') => Some(EntityKind::Node),
            Some(b'w') => Some(EntityKind::Way),
            Some(b'r') => Some(EntityKind::Relation),
            _ => None,
        }
    }

    /// The signed OSM numeric id: positive for already-uploaded entities,
    /// negative for entities created locally and never uploaded. Returns
    /// `None` if the id does not parse as `<prefix><integer>`.
    pub fn osm_id(&self) -> Option<i64> {
        self.0.get(1..).and_then(|digits| digits.parse().ok())
    }

    /// True if this id denotes an entity that has never been uploaded
    /// (negative `osmId`, i.e. a `-`-prefixed numeric suffix).
    pub fn is_new(&self) -> bool {
        self.osm_id().map(|n| n < 0).unwrap_or(false)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId(s.to_string())
    }
}

/// Allocates strictly increasing, never-reused ids for newly created
/// entities, one counter per [`EntityKind`]. Mirrors the collaborator
/// collaborator contract: `next(kind) -> integer`,
/// represented here as new negative-numbered [`EntityId`]s.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    next_node: i64,
    next_way: i64,
    next_relation: i64,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator {
            next_node: 0,
            next_way: 0,
            next_relation: 0,
        }
    }

    /// Seeds the counters from the `nextIDs` magnitudes of the v3 JSON
    /// format (always non-negative on disk; legacy negative values are
    /// converted to their absolute value by the caller before this is
    /// invoked). Never un-seeds a counter that has already advanced past
    /// the given magnitude.
    pub fn seed(&mut self, node: i64, way: i64, relation: i64) {
        self.next_node = self.next_node.min(-node.abs());
        self.next_way = self.next_way.min(-way.abs());
        self.next_relation = self.next_relation.min(-relation.abs());
    }

    pub fn next(&mut self, kind: EntityKind) -> EntityId {
        let counter = match kind {
            EntityKind::Node => &mut self.next_node,
            EntityKind::Way => &mut self.next_way,
            EntityKind::Relation => &mut self.next_relation,
        };
        *counter -= 1;
        EntityId::new(format!("{}{}", kind.prefix(), counter))
    }

    /// The non-negative magnitude to persist as `nextIDs[kind]`.
    pub fn magnitude(&self, kind: EntityKind) -> i64 {
        match kind {
            EntityKind::Node => self.next_node.abs(),
            EntityKind::Way => self.next_way.abs(),
            EntityKind::Relation => self.next_relation.abs(),
        }
    }
}
