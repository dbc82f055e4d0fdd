//! An editable topological graph core for an interactive OpenStreetMap
//! editor: a layered entity graph, pure `graph -> graph`
//! edit actions, an undo/redo history on top of them, and
//! named spatial caches for rendering.
//!
//! The crate does no I/O and owns no network/UI concerns of its own —
//! callers drive it with downloaded entities, run actions against
//! `EditSystem::staging_graph`, and persist history through
//! `EditSystem::to_json`/`from_json`.

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

pub mod actions;
pub mod collaborators;
pub mod difference;
pub mod editsystem;
pub mod entity;
pub mod error;
pub mod graph;
pub mod spatial;

pub use difference::Difference;
pub use editsystem::EditSystem;
pub use entity::{Entity, EntityId, EntityKind};
pub use error::{GraphError, PersistenceError, TransactionError};
pub use graph::Graph;

#[cfg(test)]
mod tests;
