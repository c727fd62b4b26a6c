//! Polygonal pieces of level geometry

use glam::Vec2;
use smallvec::SmallVec;

use crate::physics::RigidBodyHandle;

/// One edge of a surface fragment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphEdge {
    pub point1: Vec2,
    pub point2: Vec2,
}

impl GraphEdge {
    pub fn new(point1: Vec2, point2: Vec2) -> Self {
        Self { point1, point2 }
    }

    /// Midpoint of the edge
    pub fn midpoint(&self) -> Vec2 {
        (self.point1 + self.point2) * 0.5
    }

    /// Unit normal of the edge pointing away from the fragment's center
    pub fn normal(&self, fragment: &SurfaceFragment) -> Vec2 {
        let dir = (self.point1 - self.point2).normalize_or_zero();
        let normal = Vec2::new(-dir.y, dir.x);
        let outward = (self.midpoint() - fragment.center).normalize_or_zero();

        if normal.dot(outward) < 0.0 { -normal } else { normal }
    }
}

/// A convex polygon of level geometry backed by a fixed body
#[derive(Debug, Clone)]
pub struct SurfaceFragment {
    /// Center point the fragment's edges surround
    pub center: Vec2,
    pub edges: SmallVec<[GraphEdge; 8]>,
    /// Body the fragment's collision shape lives on
    pub body: RigidBodyHandle,
}

impl SurfaceFragment {
    /// Build a fragment from the polygon's vertices in order.
    ///
    /// The center is the vertex average.
    pub fn from_polygon(vertices: &[Vec2], body: RigidBodyHandle) -> Self {
        let center = if vertices.is_empty() {
            Vec2::ZERO
        } else {
            vertices.iter().copied().sum::<Vec2>() / vertices.len() as f32
        };

        let edges = (0..vertices.len())
            .map(|i| GraphEdge::new(vertices[i], vertices[(i + 1) % vertices.len()]))
            .collect();

        Self {
            center,
            edges,
            body,
        }
    }

    /// Half extents of the fragment's axis-aligned bounds around its center
    pub fn half_extents(&self) -> Vec2 {
        self.edges.iter().fold(Vec2::ZERO, |acc, edge| {
            acc.max((edge.point1 - self.center).abs())
                .max((edge.point2 - self.center).abs())
        })
    }
}

/// Intersection point of segments `a1-a2` and `b1-b2`, if they cross.
///
/// Parallel and collinear segments never intersect.
pub fn segment_intersection(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<Vec2> {
    let a = a2 - a1;
    let b = b2 - b1;
    let denominator = a.perp_dot(b);
    if denominator == 0.0 {
        return None;
    }

    let offset = b1 - a1;
    let t = offset.perp_dot(b) / denominator;
    let u = offset.perp_dot(a) / denominator;

    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a1 + a * t)
    } else {
        None
    }
}
