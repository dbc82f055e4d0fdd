//! The undo/redo history stack: a `stable` edit at
//! `_index`, a mutable `_staging` clone sitting on top of it, and the
//! checkpoint/transaction/persistence machinery built around that pair.
//!
//! Mutable state lives behind a single `parking_lot::Mutex`, the way
//! libpijul guards shared recording state behind `Arc<Mutex<Recorded>>` in
//! `record::Builder` — cheap, non-poisoning, and `Send + Sync` so an
//! `EditSystem` can be embedded in a multi-threaded host even though every
//! individual call completes synchronously.

mod checkpoint;
mod edit;
mod events;
mod persistence;

pub use edit::Edit;
pub use events::{Event, EventKind};

use crate::actions::{Action, Transitionable};
use crate::difference::Difference;
use crate::entity::{Entity, EntityId, EntityKind, IdAllocator};
use crate::error::{PersistenceError, TransactionError};
use crate::graph::Graph;
use checkpoint::Checkpoint;
use events::Listeners;
use log::debug;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Tunables a host passes at construction rather than the crate hardcoding,
/// in the spirit of libpijul's `Builder` options.
#[derive(Debug, Clone)]
pub struct EditSystemConfig {
    /// Oldest named checkpoint is evicted once this many are held.
    pub checkpoint_capacity: usize,
}

impl Default for EditSystemConfig {
    fn default() -> Self {
        EditSystemConfig { checkpoint_capacity: 50 }
    }
}

/// Either a plain action (run once, at `t=1`) or a [`Transitionable`] one
/// driven across a fixed step schedule — the two shapes `performAsync`
/// distinguishes.
pub enum AnyAction<'a> {
    Plain(&'a dyn Action),
    Transitionable(&'a dyn Transitionable),
}

#[derive(Debug)]
struct Inner {
    history: Vec<Edit>,
    index: usize,
    staging: Edit,
    checkpoints: HashMap<String, Checkpoint>,
    checkpoint_order: VecDeque<String>,
    config: EditSystemConfig,
    tx_depth: u32,
    tx_entry_staging: Option<Graph>,
    tx_entry_stable: Option<Graph>,
    tx_stable_changed: bool,
    tx_history_jump: Option<(usize, usize)>,
    listeners: Listeners,
    dirty: bool,
    ids: IdAllocator,
}

fn has_wip(inner: &Inner) -> bool {
    !Difference::new(&inner.history[inner.index].graph, &inner.staging.graph).is_empty()
}

/// The undo/redo engine: one mutex-guarded history stack.
#[derive(Debug)]
pub struct EditSystem {
    inner: Mutex<Inner>,
}

impl Default for EditSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl EditSystem {
    pub fn new() -> Self {
        Self::with_config(EditSystemConfig::default())
    }

    pub fn with_config(config: EditSystemConfig) -> Self {
        let base = Edit::base();
        let staging = Edit::derive_staging(&base);
        EditSystem {
            inner: Mutex::new(Inner {
                history: vec![base],
                index: 0,
                staging,
                checkpoints: HashMap::new(),
                checkpoint_order: VecDeque::new(),
                config,
                tx_depth: 0,
                tx_entry_staging: None,
                tx_entry_stable: None,
                tx_stable_changed: false,
                tx_history_jump: None,
                listeners: Listeners::default(),
                dirty: false,
                ids: IdAllocator::new(),
            }),
        }
    }

    pub fn on(&self, kind: EventKind, listener: impl FnMut(&Event) + Send + 'static) {
        self.inner.lock().listeners.on(kind, Box::new(listener));
    }

    pub fn alloc_id(&self, kind: EntityKind) -> EntityId {
        self.inner.lock().ids.next(kind)
    }

    pub fn staging_graph(&self) -> Graph {
        self.inner.lock().staging.graph.clone()
    }

    pub fn stable_graph(&self) -> Graph {
        let inner = self.inner.lock();
        inner.history[inner.index].graph.clone()
    }

    pub fn index(&self) -> usize {
        self.inner.lock().index
    }

    pub fn has_work_in_progress(&self) -> bool {
        has_wip(&self.inner.lock())
    }

    /// `hasWorkInProgress || history changed since mark_clean()` — the
    /// hook a host's autosave timer polls to derive `backupstatuschange`.
    pub fn dirty(&self) -> bool {
        let inner = self.inner.lock();
        inner.dirty || has_wip(&inner)
    }

    pub fn mark_clean(&self) {
        let mut inner = self.inner.lock();
        inner.dirty = false;
        Self::emit(&mut inner, Event::BackupStatusChange(true));
    }

    fn emit(inner: &mut Inner, event: Event) {
        if inner.tx_depth > 0 {
            match &event {
                Event::StableChange(_) => inner.tx_stable_changed = true,
                Event::HistoryJump { from, to } => {
                    inner.tx_history_jump = Some(match inner.tx_history_jump {
                        Some((f, _)) => (f, *to),
                        None => (*from, *to),
                    });
                }
                _ => {}
            }
            return;
        }
        inner.listeners.dispatch(&event);
    }

    /// Applies `actions` left-to-right to `_staging.graph` at `t=1`.
    pub fn perform(&self, actions: &[&dyn Action]) -> Difference {
        let mut inner = self.inner.lock();
        let before = inner.staging.graph.clone();
        for action in actions {
            inner.staging.graph = action.apply(&inner.staging.graph);
        }
        inner.staging.graph.commit();
        let diff = Difference::new(&before, &inner.staging.graph);
        if !diff.is_empty() {
            inner.dirty = true;
            Self::emit(&mut inner, Event::StagingChange(diff.clone()));
        }
        diff
    }

    /// Drives a transitionable action's `t` from 0 to 1 over `steps`
    /// synchronous frames, emitting `stagingchange` at each one. A plain
    /// action resolves immediately, equivalent to one `perform` call.
    pub fn perform_async(&self, action: AnyAction<'_>, steps: usize) -> Difference {
        match action {
            AnyAction::Plain(a) => self.perform(&[a]),
            AnyAction::Transitionable(t) => {
                let mut inner = self.inner.lock();
                let before = inner.staging.graph.clone();
                let start = inner.staging.graph.clone();
                let steps = steps.max(1);
                for step in 1..=steps {
                    let frac = step as f64 / steps as f64;
                    let step_before = inner.staging.graph.clone();
                    inner.staging.graph = t.apply_at(&start, frac);
                    inner.staging.graph.commit();
                    let step_diff = Difference::new(&step_before, &inner.staging.graph);
                    if !step_diff.is_empty() {
                        Self::emit(&mut inner, Event::StagingChange(step_diff));
                    }
                }
                let diff = Difference::new(&before, &inner.staging.graph);
                if !diff.is_empty() {
                    inner.dirty = true;
                }
                diff
            }
        }
    }

    /// Discards staged work: replaces `_staging.graph` with a fresh
    /// derivation of `stable.graph`.
    pub fn revert(&self) -> Difference {
        let mut inner = self.inner.lock();
        let before = inner.staging.graph.clone();
        inner.staging = Edit::derive_staging(&inner.history[inner.index]);
        let diff = Difference::new(&before, &inner.staging.graph);
        if !diff.is_empty() {
            Self::emit(&mut inner, Event::StagingChange(diff.clone()));
        }
        diff
    }

    /// Appends a new Edit at `index+1`, truncating any redo tail.
    pub fn commit(&self, annotation: Option<String>, sources_used: Vec<String>, selected_ids: Vec<EntityId>) -> Difference {
        let mut inner = self.inner.lock();
        let old_staging = inner.staging.graph.clone();
        let old_stable = inner.history[inner.index].graph.clone();

        let mut committed = inner.staging.clone();
        committed.annotation = annotation;
        committed.sources_used = sources_used;
        committed.selected_ids = selected_ids;
        committed.transient = false;

        let truncate_at = inner.index + 1;
        inner.history.truncate(truncate_at);
        inner.history.push(committed);
        inner.index += 1;
        inner.staging = Edit::derive_staging(&inner.history[inner.index]);

        let staging_diff = Difference::new(&old_staging, &inner.staging.graph);
        if !staging_diff.is_empty() {
            Self::emit(&mut inner, Event::StagingChange(staging_diff));
        }
        let stable_diff = Difference::new(&old_stable, &inner.history[inner.index].graph);
        debug!(
            "commit at index {}, {} created, {} modified, {} deleted",
            inner.index,
            stable_diff.created().len(),
            stable_diff.modified().len(),
            stable_diff.deleted().len()
        );
        Self::emit(&mut inner, Event::StableChange(stable_diff.clone()));
        inner.dirty = true;
        stable_diff
    }

    /// Replaces the Edit at `index` in place: same effect as `commit` but
    /// no advance, no redo-tail truncation. Fails on the base edit.
    pub fn commit_append(
        &self,
        annotation: Option<String>,
        sources_used: Vec<String>,
        selected_ids: Vec<EntityId>,
    ) -> Result<Difference, TransactionError> {
        let mut inner = self.inner.lock();
        if inner.index == 0 {
            return Err(TransactionError::CommitAppendOnBase);
        }
        let old_staging = inner.staging.graph.clone();
        let old_stable = inner.history[inner.index].graph.clone();

        let mut replaced = inner.staging.clone();
        replaced.annotation = annotation;
        replaced.sources_used = sources_used;
        replaced.selected_ids = selected_ids;
        replaced.transient = false;
        let replace_at = inner.index;
        inner.history[replace_at] = replaced;
        inner.staging = Edit::derive_staging(&inner.history[inner.index]);

        let staging_diff = Difference::new(&old_staging, &inner.staging.graph);
        if !staging_diff.is_empty() {
            Self::emit(&mut inner, Event::StagingChange(staging_diff));
        }
        let stable_diff = Difference::new(&old_stable, &inner.history[inner.index].graph);
        Self::emit(&mut inner, Event::StableChange(stable_diff.clone()));
        inner.dirty = true;
        Ok(stable_diff)
    }

    fn jump(inner: &mut Inner, target: usize) {
        let from = inner.index;
        debug!("history jump from {from} to {target}");
        let old_staging = inner.staging.graph.clone();
        let old_stable = inner.history[from].graph.clone();
        inner.index = target;
        inner.staging = Edit::derive_staging(&inner.history[target]);

        let staging_diff = Difference::new(&old_staging, &inner.staging.graph);
        if !staging_diff.is_empty() {
            Self::emit(inner, Event::StagingChange(staging_diff));
        }
        let stable_diff = Difference::new(&old_stable, &inner.history[target].graph);
        Self::emit(inner, Event::StableChange(stable_diff));
        Self::emit(inner, Event::HistoryJump { from, to: target });
        inner.dirty = true;
    }

    /// The index `undo()` would jump to, or `None` at the bottom of the
    /// stack.
    fn undo_target(inner: &Inner) -> Option<usize> {
        let mut target = inner.index.checked_sub(1)?;
        while target > 0 && inner.history[target].annotation.is_none() {
            target -= 1;
        }
        Some(target)
    }

    /// The index `redo()` would jump to, or `None` at the top of the
    /// stack.
    fn redo_target(inner: &Inner) -> Option<usize> {
        let len = inner.history.len();
        let mut target = inner.index + 1;
        if target >= len {
            return None;
        }
        while target + 1 < len && inner.history[target].annotation.is_none() {
            target += 1;
        }
        Some(target)
    }

    /// Steps to the previous Edit with a non-empty annotation (or `0`).
    /// No-op at the bottom of the stack.
    pub fn undo(&self) -> bool {
        let mut inner = self.inner.lock();
        let target = match Self::undo_target(&inner) {
            Some(t) => t,
            None => return false,
        };
        Self::jump(&mut inner, target);
        true
    }

    /// Steps to the next Edit with a non-empty annotation (or the top of
    /// the stack). No-op at the top.
    pub fn redo(&self) -> bool {
        let mut inner = self.inner.lock();
        let target = match Self::redo_target(&inner) {
            Some(t) => t,
            None => return false,
        };
        Self::jump(&mut inner, target);
        true
    }

    /// The annotation of the Edit `undo()` would step to, without moving
    /// there. `None` if `undo()` would be a no-op.
    pub fn get_undo_annotation(&self) -> Option<String> {
        let inner = self.inner.lock();
        let target = Self::undo_target(&inner)?;
        inner.history[target].annotation.clone()
    }

    /// The annotation of the Edit `redo()` would step to, without moving
    /// there. `None` if `redo()` would be a no-op.
    pub fn get_redo_annotation(&self) -> Option<String> {
        let inner = self.inner.lock();
        let target = Self::redo_target(&inner)?;
        inner.history[target].annotation.clone()
    }

    pub fn set_checkpoint(&self, id: impl Into<String>) {
        let mut inner = self.inner.lock();
        let id = id.into();
        let snapshot = Checkpoint {
            history: inner.history.clone(),
            index: inner.index,
        };
        if inner.checkpoints.insert(id.clone(), snapshot).is_none() {
            inner.checkpoint_order.push_back(id);
        }
        let capacity = inner.config.checkpoint_capacity;
        while inner.checkpoints.len() > capacity {
            if let Some(oldest) = inner.checkpoint_order.pop_front() {
                debug!("evicting checkpoint {oldest:?}, capacity {capacity}");
                inner.checkpoints.remove(&oldest);
            } else {
                break;
            }
        }
    }

    /// Restores a `(history, index)` pair saved by `set_checkpoint`.
    /// Unknown ids are a silent no-op, returning `false`.
    pub fn restore_checkpoint(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        let checkpoint = match inner.checkpoints.get(id) {
            Some(c) => c.clone(),
            None => return false,
        };
        let from = inner.index;
        let old_staging = inner.staging.graph.clone();
        let old_stable = inner.history[from].graph.clone();
        inner.history = checkpoint.history;
        inner.index = checkpoint.index;
        inner.staging = Edit::derive_staging(&inner.history[inner.index]);

        let staging_diff = Difference::new(&old_staging, &inner.staging.graph);
        if !staging_diff.is_empty() {
            Self::emit(&mut inner, Event::StagingChange(staging_diff));
        }
        let stable_diff = Difference::new(&old_stable, &inner.history[inner.index].graph);
        Self::emit(&mut inner, Event::StableChange(stable_diff));
        let to = inner.index;
        Self::emit(&mut inner, Event::HistoryJump { from, to });
        inner.dirty = true;
        true
    }

    /// Nesting-aware: only the outermost `begin`/`end` pair coalesces and
    /// emits events, from the difference between the entry and exit graphs.
    pub fn begin_transaction(&self) {
        let mut inner = self.inner.lock();
        if inner.tx_depth == 0 {
            inner.tx_entry_staging = Some(inner.staging.graph.clone());
            inner.tx_entry_stable = Some(inner.history[inner.index].graph.clone());
            inner.tx_stable_changed = false;
            inner.tx_history_jump = None;
        }
        inner.tx_depth += 1;
        debug!("begin_transaction, depth now {}", inner.tx_depth);
    }

    /// A nested `endTransaction` without a matching `begin` is a silent
    /// no-op.
    pub fn end_transaction(&self) {
        let mut inner = self.inner.lock();
        if inner.tx_depth == 0 {
            return;
        }
        inner.tx_depth -= 1;
        if inner.tx_depth > 0 {
            return;
        }
        debug!("end_transaction, coalescing events");
        let entry_staging = inner.tx_entry_staging.take().expect("set on begin_transaction");
        let entry_stable = inner.tx_entry_stable.take().expect("set on begin_transaction");
        let stable_changed = inner.tx_stable_changed;
        let history_jump = inner.tx_history_jump.take();

        let staging_diff = Difference::new(&entry_staging, &inner.staging.graph);
        if !staging_diff.is_empty() {
            inner.listeners.dispatch(&Event::StagingChange(staging_diff));
        }
        if stable_changed {
            let stable_diff = Difference::new(&entry_stable, &inner.history[inner.index].graph);
            inner.listeners.dispatch(&Event::StableChange(stable_diff));
        }
        if let Some((from, to)) = history_jump {
            inner.listeners.dispatch(&Event::HistoryJump { from, to });
        }
    }

    /// Rebases freshly downloaded baseline data under the base edit's
    /// graph and the full stack on top of it.
    pub fn merge(&self, new_entities: Vec<Entity>) -> BTreeSet<EntityId> {
        let touched: BTreeSet<EntityId> = new_entities.iter().map(|e| e.id().clone()).collect();
        let mut inner = self.inner.lock();
        {
            let inner_ref = &mut *inner;
            let mut stack: Vec<&mut Graph> = inner_ref.history.iter_mut().map(|e| &mut e.graph).collect();
            stack.push(&mut inner_ref.staging.graph);
            Graph::rebase(new_entities, &mut stack, false);
        }
        inner.dirty = true;
        Self::emit(&mut inner, Event::Merge(touched.clone()));
        touched
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        let inner = self.inner.lock();
        persistence::to_json(&inner.history, inner.index, &inner.ids)
    }

    pub fn from_json(s: &str) -> Result<Self, PersistenceError> {
        let (history, index, ids) = persistence::from_json(s)?;
        let staging = Edit::derive_staging(&history[index]);
        Ok(EditSystem {
            inner: Mutex::new(Inner {
                history,
                index,
                staging,
                checkpoints: HashMap::new(),
                checkpoint_order: VecDeque::new(),
                config: EditSystemConfig::default(),
                tx_depth: 0,
                tx_entry_staging: None,
                tx_entry_stable: None,
                tx_stable_changed: false,
                tx_history_jump: None,
                listeners: Listeners::default(),
                dirty: false,
                ids,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ChangeTags;
    use crate::entity::{Node, Tags};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn tag_action(id: &str, key: &str, value: &str) -> ChangeTags {
        let mut tags = Tags::new();
        tags.insert(key.into(), value.into());
        ChangeTags::new(EntityId::new(id), tags)
    }

    #[test]
    fn perform_on_a_missing_entity_is_a_harmless_noop() {
        let sys = EditSystem::new();
        let diff = sys.perform(&[&tag_action("missing", "amenity", "cafe")]);
        assert!(diff.is_empty());
        assert!(!sys.has_work_in_progress());
    }

    #[test]
    fn undo_redo_round_trip() {
        let sys = EditSystem::new();
        // Seed a node straight into the staging graph via a tag-only action
        // won't create it, so bootstrap through a direct replace first.
        {
            let mut inner = sys.inner.lock();
            inner
                .staging
                .graph
                .replace(vec![Node::new(EntityId::new("a"), [0.0, 0.0]).into()])
                .unwrap();
        }
        sys.commit(Some("add a".into()), vec![], vec![]);

        sys.perform(&[&tag_action("a", "amenity", "cafe")]);
        sys.commit(Some("tag a".into()), vec![], vec![]);
        assert_eq!(sys.index(), 2);

        assert!(sys.undo());
        assert_eq!(sys.index(), 1);
        let stable = sys.stable_graph();
        assert!(stable.entity(&EntityId::new("a")).unwrap().tags().is_empty());

        assert!(sys.redo());
        assert_eq!(sys.index(), 2);
        let stable = sys.stable_graph();
        assert_eq!(
            stable.entity(&EntityId::new("a")).unwrap().tags().get("amenity").map(String::as_str),
            Some("cafe")
        );

        assert!(!sys.redo());
    }

    #[test]
    fn undo_redo_annotations_name_the_step_they_would_land_on() {
        let sys = EditSystem::new();
        for i in 0..4 {
            let id = format!("n{i}");
            {
                let mut inner = sys.inner.lock();
                inner
                    .staging
                    .graph
                    .replace(vec![Node::new(EntityId::new(&id), [0.0, 0.0]).into()])
                    .unwrap();
            }
            sys.commit(Some(format!("added n{i}")), vec![], vec![]);
        }
        assert_eq!(sys.index(), 4);

        // history: [base, "added n0", "added n1", "added n2", "added n3"]
        // at index 4, one undo lands on "added n2".
        assert_eq!(sys.get_undo_annotation().as_deref(), Some("added n2"));
        assert!(sys.undo());
        assert_eq!(sys.index(), 3);

        // at index 3, one undo lands on "added n1", one redo back on "added n3".
        assert_eq!(sys.get_undo_annotation().as_deref(), Some("added n1"));
        assert_eq!(sys.get_redo_annotation().as_deref(), Some("added n3"));

        assert!(sys.redo());
        assert_eq!(sys.index(), 4);
        assert_eq!(sys.get_redo_annotation(), None);
    }

    #[test]
    fn checkpoint_restores_history_and_index() {
        let sys = EditSystem::new();
        {
            let mut inner = sys.inner.lock();
            inner
                .staging
                .graph
                .replace(vec![Node::new(EntityId::new("a"), [0.0, 0.0]).into()])
                .unwrap();
        }
        sys.commit(Some("add a".into()), vec![], vec![]);
        sys.set_checkpoint("before-edit");

        sys.perform(&[&tag_action("a", "amenity", "cafe")]);
        sys.commit(Some("tag a".into()), vec![], vec![]);
        assert_eq!(sys.index(), 2);

        assert!(sys.restore_checkpoint("before-edit"));
        assert_eq!(sys.index(), 1);
        assert!(!sys.restore_checkpoint("does-not-exist"));
    }

    #[test]
    fn checkpoint_capacity_evicts_the_oldest_name() {
        let sys = EditSystem::with_config(EditSystemConfig { checkpoint_capacity: 2 });
        sys.set_checkpoint("a");
        sys.set_checkpoint("b");
        sys.set_checkpoint("c");

        assert!(!sys.restore_checkpoint("a"));
        assert!(sys.restore_checkpoint("b"));
        assert!(sys.restore_checkpoint("c"));
    }

    #[test]
    fn transaction_coalesces_stagingchange_into_one_event() {
        let sys = EditSystem::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        sys.on(EventKind::StagingChange, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        {
            let mut inner = sys.inner.lock();
            inner.staging.graph.replace(vec![Node::new(EntityId::new("a"), [0.0, 0.0]).into()]).unwrap();
        }

        sys.begin_transaction();
        sys.perform(&[&tag_action("a", "amenity", "cafe")]);
        sys.perform(&[&tag_action("a", "shop", "bakery")]);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        sys.end_transaction();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn perform_async_drives_a_transitionable_action_in_steps() {
        use crate::actions::Rotate;
        use crate::entity::Way;
        use std::f64::consts::PI;

        let sys = EditSystem::new();
        {
            let mut inner = sys.inner.lock();
            inner
                .staging
                .graph
                .replace(vec![Node::new(EntityId::new("a"), [1.0, 0.0]).into()])
                .unwrap();
            inner
                .staging
                .graph
                .replace(vec![Way::new(EntityId::new("w1"), vec![EntityId::new("a")]).into()])
                .unwrap();
        }

        let seen_steps = Arc::new(AtomicUsize::new(0));
        let counted = seen_steps.clone();
        sys.on(EventKind::StagingChange, move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        let rotate = Rotate::new(vec![EntityId::new("w1")], [0.0, 0.0], PI / 2.0);
        sys.perform_async(AnyAction::Transitionable(&rotate), 4);
        assert_eq!(seen_steps.load(Ordering::SeqCst), 4);

        let a = sys.staging_graph().entity(&EntityId::new("a")).unwrap().as_node().unwrap().loc;
        assert!((a[0]).abs() < 1e-9);
        assert!((a[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn json_round_trip_preserves_committed_state() {
        let sys = EditSystem::new();
        {
            let mut inner = sys.inner.lock();
            inner
                .staging
                .graph
                .replace(vec![Node::new(EntityId::new("a"), [1.0, 2.0]).into()])
                .unwrap();
        }
        sys.commit(Some("add a".into()), vec![], vec![]);
        sys.perform(&[&tag_action("a", "amenity", "cafe")]);
        sys.commit(Some("tag a".into()), vec![], vec![]);

        let json = sys.to_json().unwrap();
        let restored = EditSystem::from_json(&json).unwrap();
        assert_eq!(restored.index(), sys.index());
        let a = restored.stable_graph().entity(&EntityId::new("a")).unwrap();
        assert_eq!(a.tags().get("amenity").map(String::as_str), Some("cafe"));
    }
}
