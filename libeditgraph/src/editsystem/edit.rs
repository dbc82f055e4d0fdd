//! An `Edit`: one entry of `EditSystem`'s history.

use crate::entity::EntityId;
use crate::graph::Graph;

/// One point in edit history: a graph plus the bookkeeping needed to
/// present it as a step a user can undo to.
#[derive(Debug, Clone)]
pub struct Edit {
    pub graph: Graph,
    pub annotation: Option<String>,
    pub selected_ids: Vec<EntityId>,
    pub sources_used: Vec<String>,
    /// True for in-progress steps that should not themselves be undo
    /// targets (e.g. an intermediate `performAsync` frame).
    pub transient: bool,
}

impl Edit {
    /// `history[0]`: the empty base edit.
    pub fn base() -> Self {
        Edit {
            graph: Graph::new_base(),
            annotation: None,
            selected_ids: Vec::new(),
            sources_used: Vec::new(),
            transient: false,
        }
    }

    /// A fresh mutable clone of `stable`, the shape `_staging` always takes.
    pub fn derive_staging(stable: &Edit) -> Self {
        Edit {
            graph: stable.graph.derive(),
            annotation: None,
            selected_ids: stable.selected_ids.clone(),
            sources_used: Vec::new(),
            transient: false,
        }
    }
}
