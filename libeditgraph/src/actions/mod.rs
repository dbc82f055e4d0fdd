//! Pure `graph -> graph` transforms. Every action exposes
//! `apply` plus `disabled`, which returns a [`DisabledReason`] discriminant
//! rather than an error — these are return values surfaced
//! to UI layers, not exceptions.

mod circularize;
mod connect;
mod copy_paste;
mod delete;
mod join;
mod merge;
mod move_action;
mod orthogonalize;
mod reverse;
mod rotate;
mod scale;
mod split;
mod straighten;
mod tags;

pub use circularize::Circularize;
pub use connect::Connect;
pub use copy_paste::{copy, paste, Clipboard};
pub use delete::Delete;
pub use join::Join;
pub use merge::Merge;
pub use move_action::Move;
pub use orthogonalize::Orthogonalize;
pub use reverse::Reverse;
pub use rotate::Rotate;
pub use scale::Scale;
pub use split::Split;
pub use straighten::Straighten;
pub use tags::ChangeTags;

use crate::graph::Graph;
use std::fmt;

/// The taxonomy of reasons an action can be disabled against a given graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledReason {
    NotEligible,
    NotAdjacent,
    Restriction,
    Connectivity,
    ConflictingRelations,
    ConflictingTags,
    PathsIntersect,
    Relation,
    AlreadyCircular,
    NotDownloaded,
    TooBendy,
}

impl fmt::Display for DisabledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DisabledReason::NotEligible => "not_eligible",
            DisabledReason::NotAdjacent => "not_adjacent",
            DisabledReason::Restriction => "restriction",
            DisabledReason::Connectivity => "connectivity",
            DisabledReason::ConflictingRelations => "conflicting_relations",
            DisabledReason::ConflictingTags => "conflicting_tags",
            DisabledReason::PathsIntersect => "paths_intersect",
            DisabledReason::Relation => "relation",
            DisabledReason::AlreadyCircular => "already_circular",
            DisabledReason::NotDownloaded => "not_downloaded",
            DisabledReason::TooBendy => "too_bendy",
        };
        write!(f, "{}", s)
    }
}

/// A pure, testable graph transform. `disabled` is checked by callers
/// before `apply`; `EditSystem` itself does not enforce
/// this — an action invoked on a disabled graph returns an
/// implementation-defined but safe result (here: a no-op clone).
pub trait Action {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason>;

    /// Applies the action at `t=1`, the shape `EditSystem::perform` uses.
    fn apply(&self, graph: &Graph) -> Graph;
}

/// An action that supports interpolated intermediate states, driven by
/// `EditSystem::performAsync`.
pub trait Transitionable: Action {
    fn apply_at(&self, graph: &Graph, t: f64) -> Graph;
}
