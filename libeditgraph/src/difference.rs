//! Structural diff between two graphs.

use crate::entity::{Entity, EntityId};
use crate::graph::Graph;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct ChangedEntry {
    pub base: Option<Entity>,
    pub head: Option<Entity>,
}

impl ChangedEntry {
    fn change_type(&self) -> ChangeType {
        match (&self.base, &self.head) {
            (None, Some(_)) => ChangeType::Created,
            (Some(_), None) => ChangeType::Deleted,
            (Some(_), Some(_)) => ChangeType::Modified,
            (None, None) => unreachable!("a changed entry always has at least one side present"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SummaryEntry {
    pub entity: Option<Entity>,
    pub graph: DiffSide,
    pub change_type: ChangeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffSide {
    Base,
    Head,
}

/// The structural difference between a `base` and `head` graph: every id
/// whose value differs, keyed by id. Entity equality is *value by `v`*:
/// two instances of the same id with the same `v` are identical.
#[derive(Debug, Clone)]
pub struct Difference {
    changes: HashMap<EntityId, ChangedEntry>,
}

impl Difference {
    /// Constructs the difference between `base` and `head`. Walks the
    /// union of both graphs' locally-overridden ids — sufficient whenever
    /// the two graphs share a `base` layer by reference, which is the
    /// normal case (comparing two points in one edit history). When the
    /// graphs do not share a base layer, their base-layer
    /// ids are folded in too, at the cost of a full base scan.
    pub fn new(base: &Graph, head: &Graph) -> Self {
        let mut candidate_ids: std::collections::BTreeSet<EntityId> =
            base.local.entities.keys().cloned().collect();
        candidate_ids.extend(head.local.entities.keys().cloned());
        if !std::sync::Arc::ptr_eq(&base.base, &head.base) {
            candidate_ids.extend(base.base.read().entities.keys().cloned());
            candidate_ids.extend(head.base.read().entities.keys().cloned());
        }
        Self::for_ids(base, head, candidate_ids)
    }

    /// Targeted variant used when the caller already knows which ids might
    /// differ (e.g. the ids touched by a single `perform` call).
    pub fn for_ids(base: &Graph, head: &Graph, candidate_ids: impl IntoIterator<Item = EntityId>) -> Self {
        let mut changes = HashMap::new();
        for id in candidate_ids {
            let base_entity = base.has_entity(&id);
            let head_entity = head.has_entity(&id);
            let differ = match (&base_entity, &head_entity) {
                (None, None) => false,
                (Some(a), Some(b)) => !a.same_version(b),
                _ => true,
            };
            if differ {
                changes.insert(
                    id,
                    ChangedEntry {
                        base: base_entity,
                        head: head_entity,
                    },
                );
            }
        }
        Difference { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn changed_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.changes.keys()
    }

    pub fn created(&self) -> Vec<Entity> {
        self.changes
            .values()
            .filter(|c| c.change_type() == ChangeType::Created)
            .filter_map(|c| c.head.clone())
            .collect()
    }

    pub fn modified(&self) -> Vec<Entity> {
        self.changes
            .values()
            .filter(|c| c.change_type() == ChangeType::Modified)
            .filter_map(|c| c.head.clone())
            .collect()
    }

    pub fn deleted(&self) -> Vec<Entity> {
        self.changes
            .values()
            .filter(|c| c.change_type() == ChangeType::Deleted)
            .filter_map(|c| c.base.clone())
            .collect()
    }

    /// Every changed id plus the parents of changed nodes, marked modified
    /// — so a way-level change is surfaced to renderers when only a child
    /// node moved.
    pub fn summary(&self, head: &Graph) -> HashMap<EntityId, SummaryEntry> {
        let mut out = HashMap::new();
        for (id, change) in &self.changes {
            let ct = change.change_type();
            let entity = change.head.clone().or_else(|| change.base.clone());
            out.insert(
                id.clone(),
                SummaryEntry {
                    entity,
                    graph: if change.head.is_some() { DiffSide::Head } else { DiffSide::Base },
                    change_type: ct,
                },
            );
            if let Some(node) = change.head.as_ref().or(change.base.as_ref()) {
                if node.as_node().is_some() {
                    for way in head.parent_way_ids(id) {
                        out.entry(way.clone()).or_insert_with(|| SummaryEntry {
                            entity: head.has_entity(&way),
                            graph: DiffSide::Head,
                            change_type: ChangeType::Modified,
                        });
                    }
                    for rel in head.parent_relation_ids(id) {
                        out.entry(rel.clone()).or_insert_with(|| SummaryEntry {
                            entity: head.has_entity(&rel),
                            graph: DiffSide::Head,
                            change_type: ChangeType::Modified,
                        });
                    }
                }
            }
        }
        out
    }

    /// The post-change value of every changed id that still exists
    /// (created + modified), used by persistence to snapshot "final state
    /// of every edited id".
    pub fn final_states(&self) -> Vec<Entity> {
        self.changes.values().filter_map(|c| c.head.clone()).collect()
    }

    /// The pre-change value of every changed id that had one (modified +
    /// deleted), used by persistence to snapshot "pre-edit state of every
    /// edited id".
    pub fn base_states(&self) -> Vec<Entity> {
        self.changes.values().filter_map(|c| c.base.clone()).collect()
    }

    /// `id -> final entity or absent`, suitable for "everything the caller
    /// must re-render".
    pub fn complete(&self) -> HashMap<EntityId, Option<Entity>> {
        self.changes
            .iter()
            .map(|(id, c)| (id.clone(), c.head.clone()))
            .collect()
    }
}
