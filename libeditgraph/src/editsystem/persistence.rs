//! The v3 JSON history format, using `serde`/`serde_json`
//! exactly as libpijul serializes its own on-disk structures (change
//! headers, `SerializedChannel`) rather than a hand-rolled writer.
//!
//! Limitation: the format only ever records each id's *final* value, not
//! one snapshot per version it passed through. Replaying `stack` can
//! therefore reconstruct the correct final graph at `index`, but an id
//! touched more than once on its way there reaches its final value at the
//! first step that mentions it rather than its true intermediate value —
//! the same compaction the original editor's own history file accepts.

use super::edit::Edit;
use crate::difference::Difference;
use crate::entity::{Entity, EntityId, EntityKind, IdAllocator};
use crate::error::PersistenceError;
use crate::graph::Graph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const VERSION: u64 = 3;

#[derive(Debug, Serialize, Deserialize)]
struct HistoryFile {
    version: u64,
    entities: Vec<Entity>,
    #[serde(rename = "baseEntities")]
    base_entities: Vec<Entity>,
    stack: Vec<StackEntry>,
    #[serde(rename = "nextIDs")]
    next_ids: NextIds,
    index: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StackEntry {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    modified: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deleted: Vec<String>,
    #[serde(default, rename = "imageryUsed", skip_serializing_if = "Vec::is_empty")]
    imagery_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotation: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NextIds {
    node: i64,
    way: i64,
    relation: i64,
}

pub(super) fn to_json(history: &[Edit], index: usize, ids: &IdAllocator) -> Result<String, PersistenceError> {
    let base = &history[0].graph;
    let stable = &history[index].graph;
    let overall = Difference::new(base, stable);

    let mut stack = Vec::with_capacity(index + 1);
    stack.push(StackEntry::default());
    for i in 1..=index {
        let step = Difference::new(&history[i - 1].graph, &history[i].graph);
        stack.push(StackEntry {
            modified: step
                .final_states()
                .iter()
                .map(|e| format!("{}v{}", e.id(), e.v()))
                .collect(),
            deleted: step
                .base_states()
                .iter()
                .filter(|e| history[i].graph.has_entity(e.id()).is_none())
                .map(|e| e.id().to_string())
                .collect(),
            imagery_used: history[i].sources_used.clone(),
            annotation: history[i].annotation.clone(),
        });
    }

    let file = HistoryFile {
        version: VERSION,
        entities: overall.final_states(),
        base_entities: overall.base_states(),
        stack,
        next_ids: NextIds {
            node: ids.magnitude(EntityKind::Node),
            way: ids.magnitude(EntityKind::Way),
            relation: ids.magnitude(EntityKind::Relation),
        },
        index,
    };
    serde_json::to_string(&file).map_err(PersistenceError::from)
}

pub(super) fn from_json(s: &str) -> Result<(Vec<Edit>, usize, IdAllocator), PersistenceError> {
    let file: HistoryFile = serde_json::from_str(s)?;
    if file.version != VERSION {
        return Err(PersistenceError::UnsupportedVersion(file.version));
    }

    let base_graph = Graph::new_base();
    {
        let mut b = base_graph.base.write();
        for e in file.base_entities {
            b.entities.insert(e.id().clone(), e);
        }
    }

    let final_by_id: HashMap<EntityId, Entity> =
        file.entities.into_iter().map(|e| (e.id().clone(), e)).collect();

    let mut history = Vec::with_capacity(file.stack.len().max(1));
    history.push(Edit {
        graph: base_graph.clone(),
        annotation: None,
        selected_ids: Vec::new(),
        sources_used: Vec::new(),
        transient: false,
    });

    let mut cursor = base_graph;
    for entry in file.stack.into_iter().skip(1) {
        let mut g = cursor.derive();
        for modified in &entry.modified {
            let id = parse_modified_id(modified)?;
            if let Some(e) = final_by_id.get(&id) {
                g.replace(vec![e.clone()])
                    .map_err(|_| PersistenceError::MalformedModifiedRef(modified.clone()))?;
            }
        }
        if !entry.deleted.is_empty() {
            g.remove(entry.deleted.iter().map(|s| EntityId::new(s.clone())))
                .map_err(|_| PersistenceError::MalformedModifiedRef(entry.deleted.join(",")))?;
        }
        g.commit();
        history.push(Edit {
            graph: g.clone(),
            annotation: entry.annotation,
            selected_ids: Vec::new(),
            sources_used: entry.imagery_used,
            transient: false,
        });
        cursor = g;
    }

    let mut ids = IdAllocator::new();
    ids.seed(file.next_ids.node.abs(), file.next_ids.way.abs(), file.next_ids.relation.abs());

    let index = file.index.min(history.len() - 1);
    Ok((history, index, ids))
}

fn parse_modified_id(s: &str) -> Result<EntityId, PersistenceError> {
    let idx = s
        .rfind('v')
        .ok_or_else(|| PersistenceError::MalformedModifiedRef(s.to_string()))?;
    Ok(EntityId::new(s[..idx].to_string()))
}
