//! Scenarios that drive several modules together through their public
//! API, the way a host embedding this crate actually would — as opposed
//! to each module's own unit tests, which exercise one piece in
//! isolation.

use crate::actions::Join;
use crate::collaborators::Projection;
use crate::entity::{BBox, EntityId, Node, Way};
use crate::spatial::{SpatialItem, SpatialSystem};
use crate::EditSystem;

#[test]
fn editsystem_drives_join_action_and_survives_undo_redo() {
    let sys = EditSystem::new();
    sys.merge(vec![
        Node::new(EntityId::new("a"), [0.0, 0.0]).into(),
        Node::new(EntityId::new("b"), [2.0, 0.0]).into(),
        Node::new(EntityId::new("c"), [4.0, 0.0]).into(),
        Way::new(EntityId::new("-"), vec![EntityId::new("a"), EntityId::new("b")]).into(),
        Way::new(EntityId::new("="), vec![EntityId::new("b"), EntityId::new("c")]).into(),
    ]);

    let join = Join::new(vec![EntityId::new("-"), EntityId::new("=")]);
    sys.perform(&[&join]);
    sys.commit(Some("join".into()), vec![], vec![]);

    let committed = sys.stable_graph();
    let survivor = committed.entity(&EntityId::new("-")).unwrap();
    assert_eq!(
        survivor.as_way().unwrap().nodes,
        vec![EntityId::new("a"), EntityId::new("b"), EntityId::new("c")]
    );
    assert!(committed.has_entity(&EntityId::new("=")).is_none());

    assert!(sys.undo());
    let undone = sys.stable_graph();
    assert_eq!(undone.entity(&EntityId::new("-")).unwrap().as_way().unwrap().nodes.len(), 2);
    assert!(undone.has_entity(&EntityId::new("=")).is_some());

    assert!(sys.redo());
    let redone = sys.stable_graph();
    assert_eq!(
        redone.entity(&EntityId::new("-")).unwrap().as_way().unwrap().nodes,
        vec![EntityId::new("a"), EntityId::new("b"), EntityId::new("c")]
    );
}

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

/// A projection that is not the identity, so a coincidence check
/// genuinely exercises the round trip through world space rather than
/// happening to work because wgs84 and world coordinates line up.
struct Scale2x;

impl Projection for Scale2x {
    fn wgs84_to_world(&self, lonlat: [f64; 2]) -> [f64; 2] {
        [lonlat[0] * 2.0, lonlat[1] * 2.0]
    }

    fn world_to_wgs84(&self, xy: [f64; 2]) -> [f64; 2] {
        [xy[0] / 2.0, xy[1] / 2.0]
    }

    fn visible_world_extent(&self) -> BBox {
        BBox { min: [-360.0, -180.0], max: [360.0, 180.0] }
    }
}

#[test]
fn spatial_coincidence_avoidance_round_trips_through_a_non_identity_projection() {
    let mut sys: SpatialSystem<Marker> = SpatialSystem::new();
    // World-space marker at [10, 10], i.e. wgs84 [5, 5] under Scale2x.
    sys.get_cache("markers").add_data(vec![Marker { id: "existing".into(), loc: [10.0, 10.0] }]);

    let moved = sys.prevent_coincident_loc("markers", [5.0, 5.0], &Scale2x);
    assert_ne!(moved, [5.0, 5.0]);

    let moved_world = Scale2x.wgs84_to_world(moved);
    assert!(!sys.get_cache("markers").has_data_at_loc(moved_world));
}
