//! `setCheckpoint(id) / restoreCheckpoint(id)`: a named snapshot of
//! `(history, index)` a caller can rewind to, independent of the ordinary
//! undo/redo chain (used around risky multi-step flows like conflict
//! resolution).

use super::edit::Edit;

#[derive(Debug, Clone)]
pub(super) struct Checkpoint {
    pub(super) history: Vec<Edit>,
    pub(super) index: usize,
}
