//! External interfaces the core consumes but does not implement. The ID
//! allocator and geometry updater are realized directly inside
//! the crate (`entity::IdAllocator`, `graph::geometry_update`) rather than
//! left pluggable, since nothing about either needs to vary by host
//! environment; projection genuinely does, so it stays a trait a host
//! implements against its map library of choice.

use crate::entity::BBox;

/// `wgs84ToWorld` / `worldToWgs84` / `visibleWorldExtent`, consumed by
/// [`crate::spatial::SpatialSystem::prevent_coincident_loc`] and by
/// callers translating selections between screen and data space.
/// Deterministic; no state beyond the current viewport.
pub trait Projection {
    fn wgs84_to_world(&self, lonlat: [f64; 2]) -> [f64; 2];
    fn world_to_wgs84(&self, xy: [f64; 2]) -> [f64; 2];
    fn visible_world_extent(&self) -> BBox;
}
