use rstar::{RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// A world-space (or WGS84, depending on caller) axis-aligned extent.
///
/// Kept as plain `[f64; 2]` corners rather than a geo-projection type: per
/// coordinates are opaque world-space numbers to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl BBox {
    pub fn point(p: [f64; 2]) -> Self {
        BBox { min: p, max: p }
    }

    pub fn from_points<I: IntoIterator<Item = [f64; 2]>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = BBox::point(first);
        for p in iter {
            bbox.extend(p);
        }
        Some(bbox)
    }

    pub fn extend(&mut self, p: [f64; 2]) {
        self.min[0] = self.min[0].min(p[0]);
        self.min[1] = self.min[1].min(p[1]);
        self.max[0] = self.max[0].max(p[0]);
        self.max[1] = self.max[1].max(p[1]);
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min[0] <= other.max[0]
            && self.max[0] >= other.min[0]
            && self.min[1] <= other.max[1]
            && self.max[1] >= other.min[1]
    }

    pub fn center(&self) -> [f64; 2] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        ]
    }

    /// An epsilon-box centered on `p`, used for point queries
    /// (`getDataAtLoc`).
    pub fn epsilon_box(p: [f64; 2], eps: f64) -> Self {
        BBox {
            min: [p[0] - eps, p[1] - eps],
            max: [p[0] + eps, p[1] + eps],
        }
    }

    pub(crate) fn to_aabb(self) -> AABB<[f64; 2]> {
        AABB::from_corners(self.min, self.max)
    }
}

impl RTreeObject for BBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.to_aabb()
    }
}

/// The materialized geometry of an entity, computed against a particular
/// [`crate::graph::Graph`] by the geometry updater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// A node that is not referenced by any way.
    Point { loc: [f64; 2] },
    /// A node that is referenced by at least one way.
    Vertex { loc: [f64; 2] },
    /// A non-area way.
    Line { points: Vec<[f64; 2]> },
    /// An area way (closed + area tags).
    Area { points: Vec<[f64; 2]> },
    /// A relation; member geometries are looked up independently by
    /// callers, so only the extent is cached here.
    Relation,
}

impl Geometry {
    pub fn extent(&self) -> Option<BBox> {
        match self {
            Geometry::Point { loc } | Geometry::Vertex { loc } => Some(BBox::point(*loc)),
            Geometry::Line { points } | Geometry::Area { points } => {
                BBox::from_points(points.iter().copied())
            }
            Geometry::Relation => None,
        }
    }
}
