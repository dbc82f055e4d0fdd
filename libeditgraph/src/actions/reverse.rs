//! `reverse(wayId, {reverseOneway?})`: reverses a way's node order.

use super::{Action, DisabledReason};
use crate::entity::{Entity, EntityId, Tags, Way};
use crate::graph::Graph;
use std::collections::BTreeMap;

lazy_static::lazy_static! {
    /// Directional key *suffixes* that swap wholesale, e.g.
    /// `cycleway:right` <-> `cycleway:left`.
    static ref KEY_SUFFIX_SWAPS: Vec<(&'static str, &'static str)> = vec![
        (":left", ":right"),
        (":forward", ":backward"),
    ];

    /// Keys whose *value* encodes a direction and must be flipped in
    /// place, independent of any key-suffix swap.
    static ref DIRECTIONAL_VALUE_KEYS: Vec<&'static str> = vec![
        "direction",
        "traffic_sign:direction",
    ];

    static ref VALUE_WORD_SWAPS: BTreeMap<&'static str, &'static str> = {
        let mut m = BTreeMap::new();
        m.insert("forward", "backward");
        m.insert("forwards", "backward");
        m.insert("backward", "forward");
        m.insert("backwards", "forward");
        m.insert("up", "down");
        m.insert("down", "up");
        m.insert("left", "right");
        m.insert("right", "left");
        m.insert("n", "s");
        m.insert("s", "n");
        m.insert("e", "w");
        m.insert("w", "e");
        m.insert("ne", "sw");
        m.insert("sw", "ne");
        m.insert("se", "nw");
        m.insert("nw", "se");
        m
    };
}

fn swap_key_suffix(key: &str) -> Option<String> {
    for (a, b) in KEY_SUFFIX_SWAPS.iter() {
        if let Some(prefix) = key.strip_suffix(a) {
            return Some(format!("{}{}", prefix, b));
        }
        if let Some(prefix) = key.strip_suffix(b) {
            return Some(format!("{}{}", prefix, a));
        }
    }
    None
}

/// Flips a directional value: canonicalizes word swaps (dropping the
/// "forwards"/"backwards" `s`), flips signed numeric inclines, and
/// rotates numeric compass degrees by 180 mod 360.
fn swap_directional_value(value: &str) -> String {
    let lower = value.to_ascii_lowercase();
    if let Some(&swapped) = VALUE_WORD_SWAPS.get(lower.as_str()) {
        return swapped.to_string();
    }
    if let Some(pct) = value.strip_suffix('%') {
        if let Ok(n) = pct.parse::<f64>() {
            return format!("{}%", negate_numeric(n));
        }
    }
    if let Ok(deg) = value.parse::<f64>() {
        if value.contains('.') || (0.0..=360.0).contains(&deg) {
            return format!("{}", (deg + 180.0).rem_euclid(360.0));
        }
    }
    if let Ok(n) = value.parse::<f64>() {
        return negate_numeric(n);
    }
    value.to_string()
}

fn negate_numeric(n: f64) -> String {
    let r = -n;
    if r.fract() == 0.0 {
        format!("{}", r as i64)
    } else {
        format!("{}", r)
    }
}

fn reverse_tags(tags: &Tags) -> Tags {
    let mut out = Tags::new();
    for (k, v) in tags {
        if k == "oneway" {
            out.insert(k.clone(), v.clone());
            continue;
        }
        let new_key = swap_key_suffix(k).unwrap_or_else(|| k.clone());
        let new_value = if DIRECTIONAL_VALUE_KEYS.contains(&k.as_str()) {
            swap_directional_value(v)
        } else {
            v.clone()
        };
        out.insert(new_key, new_value);
    }
    out
}

fn reverse_oneway(tags: &Tags) -> Tags {
    let mut out = tags.clone();
    if let Some(v) = out.get("oneway").cloned() {
        let swapped = match v.as_str() {
            "yes" | "1" | "true" => Some("-1".to_string()),
            "-1" => Some("yes".to_string()),
            _ => None,
        };
        if let Some(s) = swapped {
            out.insert("oneway".to_string(), s);
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct Reverse {
    pub way_id: EntityId,
    pub reverse_oneway: bool,
}

impl Reverse {
    pub fn new(way_id: EntityId) -> Self {
        Reverse {
            way_id,
            reverse_oneway: false,
        }
    }

    pub fn reverse_oneway(mut self, yes: bool) -> Self {
        self.reverse_oneway = yes;
        self
    }
}

impl Action for Reverse {
    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        match graph.entity(&self.way_id) {
            Ok(Entity::Way(_)) => None,
            _ => Some(DisabledReason::NotEligible),
        }
    }

    fn apply(&self, graph: &Graph) -> Graph {
        let mut g = graph.derive();
        let way = match graph.entity(&self.way_id) {
            Ok(Entity::Way(w)) => w,
            _ => return g,
        };

        let mut new_nodes = way.nodes.clone();
        new_nodes.reverse();
        let mut new_tags = reverse_tags(&way.tags);
        if self.reverse_oneway {
            new_tags = reverse_oneway(&new_tags);
        }
        let new_way: Way = way.with_nodes(new_nodes).with_tags(new_tags);
        let _ = g.replace(vec![new_way.into()]);

        // Directional tags on child nodes.
        let node_updates: Vec<Entity> = way
            .nodes
            .iter()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .filter_map(|nid| match graph.entity(nid).ok()? {
                Entity::Node(n) => {
                    let new_tags = reverse_tags(&n.tags);
                    if new_tags != n.tags {
                        Some(n.with_tags(new_tags).into())
                    } else {
                        None
                    }
                }
                _ => None,
            })
            .collect();
        if !node_updates.is_empty() {
            let _ = g.replace(node_updates);
        }

        // Member roles ("forward"/"backward") on parent relations.
        if let Ok(parents) = graph.parent_relations(&self.way_id) {
            let mut updates = Vec::new();
            for rel in parents {
                let mut changed = false;
                let new_members = rel
                    .members
                    .iter()
                    .map(|m| {
                        if m.id == self.way_id {
                            if let Some(&swapped) = VALUE_WORD_SWAPS.get(m.role.as_str()) {
                                changed = true;
                                let mut m2 = m.clone();
                                m2.role = swapped.to_string();
                                return m2;
                            }
                        }
                        m.clone()
                    })
                    .collect();
                if changed {
                    updates.push(rel.with_members(new_members).into());
                }
            }
            if !updates.is_empty() {
                let _ = g.replace(updates);
            }
        }

        g
    }
}
