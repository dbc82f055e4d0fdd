use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An immutable OSM tag map, key to value, both kept verbatim as strings.
///
/// `BTreeMap` rather than a hash map: tag iteration order feeds directly
/// into deterministic tag-merge output (join action, §4.3) and into stable
/// JSON serialization, so an ordered map avoids a separate sort step at
/// every call site that needs determinism.
pub type Tags = BTreeMap<String, String>;

lazy_static::lazy_static! {
    /// Tag keys whose presence (with any non-"no" value, `area=no`
    /// excepted) makes a closed way an *area* rather than a line, per
    /// Mirrors the original editor's `osmAreaKeys` table.
    static ref AREA_KEYS: BTreeMap<&'static str, &'static [&'static str]> = {
        let mut m = BTreeMap::new();
        m.insert("area", &[][..]);
        m.insert("building", &[][..]);
        m.insert("landuse", &[][..]);
        m.insert("leisure", &[][..]);
        m.insert("amenity", &[][..]);
        m.insert("natural", &["coastline"][..]);
        m.insert("man_made", &["cutline", "embankment", "pipeline"][..]);
        m
    };
}

/// True if `tags` indicate area semantics for a *closed* way, per the
/// `AREA_KEYS` convention: present key, not an excepted value, value not
/// literally `"no"`.
pub fn tags_indicate_area(tags: &Tags) -> bool {
    if let Some(v) = tags.get("area") {
        if v == "yes" {
            return true;
        }
        if v == "no" {
            return false;
        }
    }
    for (key, exceptions) in AREA_KEYS.iter() {
        if let Some(v) = tags.get(*key) {
            if v != "no" && !exceptions.contains(&v.as_str()) {
                return true;
            }
        }
    }
    false
}

/// Merges two tag maps key-wise. Conflicting values for the same key are
/// joined with `;` (per the join action contract) and
/// reported back as conflicts so `disabled()` can surface
/// `conflicting_tags` when the caller considers that unacceptable.
pub fn merge_tags(a: &Tags, b: &Tags) -> (Tags, Vec<String>) {
    let mut out = a.clone();
    let mut conflicts = Vec::new();
    for (k, v) in b {
        match out.get(k) {
            None => {
                out.insert(k.clone(), v.clone());
            }
            Some(existing) if existing == v => {}
            Some(existing) => {
                conflicts.push(k.clone());
                let mut parts: Vec<&str> = existing.split(';').collect();
                if !parts.contains(&v.as_str()) {
                    parts.push(v.as_str());
                }
                out.insert(k.clone(), parts.join(";"));
            }
        }
    }
    (out, conflicts)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visible(pub bool);

impl Default for Visible {
    fn default() -> Self {
        Visible(true)
    }
}

/// `serde(default = "...")` target: entities with no explicit `visible`
/// attribute are treated as visible.
pub fn default_visible() -> Visible {
    Visible(true)
}
