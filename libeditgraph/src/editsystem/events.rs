//! Plain callbacks keyed by kind rather than
//! a generic bus, following pijul's preference for ordinary function
//! arguments and closures over an event-bus abstraction (see `Builder`'s
//! direct-call hunking in `libpijul::record` — no observer registry there
//! either).

use crate::difference::Difference;
use crate::entity::EntityId;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StagingChange,
    StableChange,
    HistoryJump,
    Merge,
    BackupStatusChange,
}

#[derive(Debug, Clone)]
pub enum Event {
    StagingChange(Difference),
    StableChange(Difference),
    HistoryJump { from: usize, to: usize },
    Merge(BTreeSet<EntityId>),
    BackupStatusChange(bool),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::StagingChange(_) => EventKind::StagingChange,
            Event::StableChange(_) => EventKind::StableChange,
            Event::HistoryJump { .. } => EventKind::HistoryJump,
            Event::Merge(_) => EventKind::Merge,
            Event::BackupStatusChange(_) => EventKind::BackupStatusChange,
        }
    }
}

pub(super) type Listener = Box<dyn FnMut(&Event) + Send>;

#[derive(Default)]
pub(super) struct Listeners {
    entries: Vec<(EventKind, Listener)>,
}

impl Listeners {
    pub(super) fn on(&mut self, kind: EventKind, listener: Listener) {
        self.entries.push((kind, listener));
    }

    pub(super) fn dispatch(&mut self, event: &Event) {
        let kind = event.kind();
        for (k, listener) in self.entries.iter_mut() {
            if *k == kind {
                listener(event);
            }
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Listeners({} registered)", self.entries.len())
    }
}
