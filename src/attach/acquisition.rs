//! Finding wall points to latch onto

use glam::Vec2;

use super::state::AttachTarget;
use crate::level::{SpatialQuery, segment_intersection};

/// Search radius around the creature, in level grid cells
pub const WALL_SEARCH_RADIUS: u32 = 1;

/// First wall point between `position` and a nearby fragment's center.
///
/// Fragments are visited in the order the query returns them and their
/// edges in polygon order; the first edge crossed by the segment from the
/// creature to the fragment center wins.
pub fn find_wall_target(level: &dyn SpatialQuery, position: Vec2) -> Option<AttachTarget> {
    for fragment in level.fragments_near(position, WALL_SEARCH_RADIUS) {
        for edge in &fragment.edges {
            if let Some(point) =
                segment_intersection(edge.point1, edge.point2, position, fragment.center)
            {
                return Some(AttachTarget {
                    body: fragment.body,
                    vessel: None,
                    point,
                    normal: edge.normal(fragment),
                });
            }
        }
    }
    None
}
