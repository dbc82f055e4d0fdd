//! One named spatial cache: two `rstar` R-trees (tile boxes, data
//! boxes) backing a shared `byId` presence map, plus the `Map<id, Item>` /
//! `Map<tileId, Tile>` payload stores the trees' leaves point back into.

use crate::entity::BBox;
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashMap;

/// A query-time epsilon for point lookups (`getDataAtLoc`), in world units.
pub const LOC_EPSILON: f64 = 1e-7;

/// Something a [`Cache`] can index: an id plus an optional world-space
/// extent. Items without an extent are ignored by `add_data`.
pub trait SpatialItem {
    fn spatial_id(&self) -> &str;
    fn extent(&self) -> Option<BBox>;
}

/// A map tile: an id and the world-space box it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: String,
    pub bbox: BBox,
}

impl SpatialItem for Tile {
    fn spatial_id(&self) -> &str {
        &self.id
    }

    fn extent(&self) -> Option<BBox> {
        Some(self.bbox)
    }
}

#[derive(Debug, Clone)]
struct IndexedBox {
    id: String,
    bbox: BBox,
}

impl PartialEq for IndexedBox {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bbox.to_aabb()
    }
}

/// `{ tileIndex, dataIndex, byId, tiles, data }`.
pub struct Cache<T> {
    data_index: RTree<IndexedBox>,
    tile_index: RTree<IndexedBox>,
    by_id: HashMap<String, BBox>,
    tiles: HashMap<String, Tile>,
    data: HashMap<String, T>,
}

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Cache {
            data_index: RTree::new(),
            tile_index: RTree::new(),
            by_id: HashMap::new(),
            tiles: HashMap::new(),
            data: HashMap::new(),
        }
    }
}

impl<T: SpatialItem> Cache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.data_index = RTree::new();
        self.tile_index = RTree::new();
        self.by_id.clear();
        self.tiles.clear();
        self.data.clear();
    }

    /// `addData`/`replaceData`: idempotent upsert. Items without an extent
    /// are ignored. Batch inserts of more than one item rebuild the tree
    /// with `bulk_load` rather than inserting one at a time.
    pub fn add_data<I: IntoIterator<Item = T>>(&mut self, items: I) {
        let mut staged: Vec<(String, BBox, T)> = items
            .into_iter()
            .filter_map(|item| {
                let bbox = item.extent()?;
                Some((item.spatial_id().to_string(), bbox, item))
            })
            .collect();
        if staged.is_empty() {
            return;
        }
        if staged.len() == 1 {
            let (id, bbox, item) = staged.pop().unwrap();
            self.upsert_one(id, bbox, item);
            return;
        }
        for (id, bbox, item) in staged {
            self.by_id.insert(id.clone(), bbox);
            self.data.insert(id.clone(), item);
        }
        let boxes: Vec<IndexedBox> = self
            .by_id
            .iter()
            .filter(|(id, _)| self.data.contains_key(*id))
            .map(|(id, bbox)| IndexedBox { id: id.clone(), bbox: *bbox })
            .collect();
        self.data_index = RTree::bulk_load(boxes);
    }

    fn upsert_one(&mut self, id: String, bbox: BBox, item: T) {
        if let Some(old) = self.by_id.insert(id.clone(), bbox) {
            self.data_index.remove(&IndexedBox { id: id.clone(), bbox: old });
        }
        self.data_index.insert(IndexedBox { id: id.clone(), bbox });
        self.data.insert(id, item);
    }

    pub fn remove_data<'a, I: IntoIterator<Item = &'a str>>(&mut self, ids: I) {
        for id in ids {
            if let Some(bbox) = self.by_id.remove(id) {
                self.data_index.remove(&IndexedBox { id: id.to_string(), bbox });
            }
            self.data.remove(id);
        }
    }

    /// Inserts each tile only if `byId` does not already contain its id.
    pub fn add_tiles<I: IntoIterator<Item = Tile>>(&mut self, tiles: I) {
        for tile in tiles {
            if self.by_id.contains_key(&tile.id) {
                continue;
            }
            let bbox = tile.bbox;
            self.by_id.insert(tile.id.clone(), bbox);
            self.tile_index.insert(IndexedBox { id: tile.id.clone(), bbox });
            self.tiles.insert(tile.id.clone(), tile);
        }
    }

    pub fn remove_tiles<'a, I: IntoIterator<Item = &'a str>>(&mut self, ids: I) {
        for id in ids {
            if let Some(bbox) = self.by_id.remove(id) {
                self.tile_index.remove(&IndexedBox { id: id.to_string(), bbox });
            }
            self.tiles.remove(id);
        }
    }

    pub fn get_visible_data(&self, extent: &BBox) -> Vec<&T> {
        self.get_data_at_box(extent)
    }

    pub fn get_data_at_box(&self, box_: &BBox) -> Vec<&T> {
        self.data_index
            .locate_in_envelope_intersecting(&box_.to_aabb())
            .filter_map(|b| self.data.get(&b.id))
            .collect()
    }

    pub fn has_data_at_box(&self, box_: &BBox) -> bool {
        self.data_index
            .locate_in_envelope_intersecting(&box_.to_aabb())
            .any(|b| self.data.contains_key(&b.id))
    }

    pub fn get_data_at_loc(&self, loc: [f64; 2]) -> Vec<&T> {
        self.get_data_at_box(&BBox::epsilon_box(loc, LOC_EPSILON))
    }

    pub fn has_data_at_loc(&self, loc: [f64; 2]) -> bool {
        self.has_data_at_box(&BBox::epsilon_box(loc, LOC_EPSILON))
    }

    pub fn has_tile(&self, tile_id: &str) -> bool {
        self.tiles.contains_key(tile_id)
    }

    pub fn has_tile_at_loc(&self, loc: [f64; 2]) -> bool {
        self.tile_index
            .locate_in_envelope_intersecting(&BBox::epsilon_box(loc, LOC_EPSILON).to_aabb())
            .any(|b| self.tiles.contains_key(&b.id))
    }

    pub fn get_tile(&self, tile_id: &str) -> Option<&Tile> {
        self.tiles.get(tile_id)
    }

    pub fn get_data(&self, id: &str) -> Option<&T> {
        self.data.get(id)
    }

    pub fn has_data(&self, id: &str) -> bool {
        self.data.contains_key(id)
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

    #[test]
    fn single_insert_then_query_at_loc() {
        let mut cache = Cache::new();
        cache.add_data(vec![Marker { id: "a".into(), loc: [1.0, 1.0] }]);
        assert!(cache.has_data_at_loc([1.0, 1.0]));
        assert!(!cache.has_data_at_loc([5.0, 5.0]));
        assert!(cache.has_data("a"));
    }

    #[test]
    fn batch_insert_uses_bulk_load_and_replace_moves_box() {
        let mut cache = Cache::new();
        cache.add_data(vec![
            Marker { id: "a".into(), loc: [0.0, 0.0] },
            Marker { id: "b".into(), loc: [10.0, 10.0] },
        ]);
        assert_eq!(cache.get_data_at_box(&BBox { min: [-1.0, -1.0], max: [1.0, 1.0] }).len(), 1);

        cache.add_data(vec![Marker { id: "a".into(), loc: [20.0, 20.0] }]);
        assert!(!cache.has_data_at_loc([0.0, 0.0]));
        assert!(cache.has_data_at_loc([20.0, 20.0]));
    }

    #[test]
    fn remove_data_drops_id_from_tree_and_map() {
        let mut cache = Cache::new();
        cache.add_data(vec![Marker { id: "a".into(), loc: [0.0, 0.0] }]);
        cache.remove_data(["a"]);
        assert!(!cache.has_data("a"));
        assert!(!cache.has_data_at_loc([0.0, 0.0]));
    }

    #[test]
    fn add_tiles_ignores_id_already_present() {
        let mut cache: Cache<Marker> = Cache::new();
        cache.add_tiles(vec![Tile {
            id: "t1".into(),
            bbox: BBox { min: [0.0, 0.0], max: [1.0, 1.0] },
        }]);
        cache.add_tiles(vec![Tile {
            id: "t1".into(),
            bbox: BBox { min: [9.0, 9.0], max: [10.0, 10.0] },
        }]);
        assert_eq!(cache.get_tile("t1").unwrap().bbox.min, [0.0, 0.0]);
    }

    #[test]
    fn items_without_extent_are_ignored() {
        #[derive(Clone)]
        struct NoExtent;
        impl SpatialItem for NoExtent {
            fn spatial_id(&self) -> &str {
                "x"
            }
            fn extent(&self) -> Option<BBox> {
                None
            }
        }
        let mut cache = Cache::new();
        cache.add_data(vec![NoExtent]);
        assert!(!cache.has_data("x"));
    }
}
