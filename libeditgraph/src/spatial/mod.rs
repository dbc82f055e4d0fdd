//! Named R-tree caches: lazily created, independently
//! cleared, backed by `rstar`.

mod cache;

pub use cache::{Cache, SpatialItem, Tile, LOC_EPSILON};

use crate::collaborators::Projection;
use crate::entity::BBox;
use std::collections::HashMap;

/// The collection of named caches a host keeps for rendered data — one per
/// layer/source, e.g. `"osm"`, `"notes"`, `"photo-overlays"`.
pub struct SpatialSystem<T> {
    caches: HashMap<String, Cache<T>>,
}

impl<T> Default for SpatialSystem<T> {
    fn default() -> Self {
        SpatialSystem { caches: HashMap::new() }
    }
}

impl<T: SpatialItem> SpatialSystem<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lazily creates the named cache if it does not exist yet.
    pub fn get_cache(&mut self, cache_id: &str) -> &mut Cache<T> {
        self.caches.entry(cache_id.to_string()).or_insert_with(Cache::new)
    }

    pub fn clear_cache(&mut self, cache_id: &str) {
        if let Some(cache) = self.caches.get_mut(cache_id) {
            cache.clear();
        }
    }

    /// Drops every named cache, for a full session reset.
    pub fn clear_all(&mut self) {
        self.caches.clear();
    }

    pub fn cache_ids(&self) -> impl Iterator<Item = &str> {
        self.caches.keys().map(String::as_str)
    }

    /// Starting from `wgs84_loc` projected into world space, nudges `y` by
    /// `1e-5` world units while an epsilon-box around the point collides
    /// with any indexed data in `cache_id`, then projects back to WGS84.
    /// Used to visibly separate markers that share a location.
    pub fn prevent_coincident_loc(
        &mut self,
        cache_id: &str,
        wgs84_loc: [f64; 2],
        projection: &dyn Projection,
    ) -> [f64; 2] {
        let mut world = projection.wgs84_to_world(wgs84_loc);
        let cache = self.get_cache(cache_id);
        while cache.has_data_at_loc(world) {
            world[1] += 1e-5;
        }
        projection.world_to_wgs84(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Marker {
        id: String,
        loc: [f64; 2],
    }

    impl SpatialItem for Marker {
        fn spatial_id(&self) -> &str {
            &self.id
        }

        fn extent(&self) -> Option<BBox> {
            Some(BBox::point(self.loc))
        }
    }

    struct Identity;
    impl Projection for Identity {
        fn wgs84_to_world(&self, lonlat: [f64; 2]) -> [f64; 2] {
            lonlat
        }
        fn world_to_wgs84(&self, xy: [f64; 2]) -> [f64; 2] {
            xy
        }
        fn visible_world_extent(&self) -> BBox {
            BBox { min: [-180.0, -90.0], max: [180.0, 90.0] }
        }
    }

    #[test]
    fn get_cache_lazily_creates_and_reuses() {
        let mut sys: SpatialSystem<Marker> = SpatialSystem::new();
        sys.get_cache("osm").add_data(vec![Marker { id: "a".into(), loc: [0.0, 0.0] }]);
        assert!(sys.get_cache("osm").has_data("a"));
        assert_eq!(sys.cache_ids().count(), 1);
    }

    #[test]
    fn clear_cache_empties_only_the_named_one() {
        let mut sys: SpatialSystem<Marker> = SpatialSystem::new();
        sys.get_cache("a").add_data(vec![Marker { id: "x".into(), loc: [0.0, 0.0] }]);
        sys.get_cache("b").add_data(vec![Marker { id: "y".into(), loc: [0.0, 0.0] }]);
        sys.clear_cache("a");
        assert!(!sys.get_cache("a").has_data("x"));
        assert!(sys.get_cache("b").has_data("y"));
    }

    #[test]
    fn prevent_coincident_loc_nudges_until_clear() {
        let mut sys: SpatialSystem<Marker> = SpatialSystem::new();
        sys.get_cache("osm").add_data(vec![Marker { id: "a".into(), loc: [0.0, 0.0] }]);
        let moved = sys.prevent_coincident_loc("osm", [0.0, 0.0], &Identity);
        assert!(moved[1] >= 1e-5);
    }
}
