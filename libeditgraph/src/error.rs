//! Crate-wide error taxonomy.
//!
//! One `thiserror` enum per fallible subsystem rather than a single
//! catch-all error type: callers that only touch the graph never have to
//! match on persistence variants, and vice versa.

use crate::entity::EntityId;
use thiserror::Error;

/// Errors raised by [`crate::graph::Graph`] lookups and mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// `entity(id)`, `parentWays`, `parentRelations` or `childNodes` was
    /// asked about an id that is absent from both the local overlay and the
    /// base layer.
    #[error("entity not found: {0}")]
    NotFound(EntityId),
    /// A mutating operation (`replace`, `remove`, `revert`) was attempted on
    /// the stack's base edit, whose graph must remain an empty, immutable
    /// anchor.
    #[error("cannot mutate the base graph")]
    Invariant,
}

/// Errors raised while loading or saving the v3 JSON history format.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unsupported history version: {0}")]
    UnsupportedVersion(u64),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("malformed modified-entity reference: {0}")]
    MalformedModifiedRef(String),
}

/// Misuse of the transaction/checkpoint API that is a programmer error
/// rather than a data inconsistency.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("commitAppend called on the base edit (index 0)")]
    CommitAppendOnBase,
}
