//! Level geometry and spatial queries
//!
//! The level is a set of polygonal surface fragments indexed by a uniform
//! grid. Creatures ask for the fragments around them to find walls.

mod fragment;

pub use fragment::{GraphEdge, SurfaceFragment, segment_intersection};

use glam::Vec2;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::physics::Physics;

/// Source of nearby level geometry
pub trait SpatialQuery {
    /// Fragments within `radius` grid cells of the cell containing `position`
    fn fragments_near(&self, position: Vec2, radius: u32) -> Vec<&SurfaceFragment>;
}

/// Grid-indexed level geometry
#[derive(Debug)]
pub struct Level {
    /// Side length of one grid cell in world units
    cell_size: f32,
    fragments: Vec<SurfaceFragment>,
    cells: FxHashMap<(i32, i32), SmallVec<[usize; 4]>>,
}

impl Level {
    /// Create an empty level with the given grid cell size
    #[must_use]
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(f32::EPSILON),
            fragments: Vec::new(),
            cells: FxHashMap::default(),
        }
    }

    /// Grid cell size in world units
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn cell_of(&self, position: Vec2) -> (i32, i32) {
        let cell = (position / self.cell_size).floor();
        (cell.x as i32, cell.y as i32)
    }

    /// Add a fragment, indexing it by the cell of its center
    pub fn add_fragment(&mut self, fragment: SurfaceFragment) -> usize {
        let index = self.fragments.len();
        let cell = self.cell_of(fragment.center);
        self.cells.entry(cell).or_default().push(index);
        self.fragments.push(fragment);
        index
    }

    /// Create a solid wall polygon backed by a fixed body with a box collider
    pub fn add_wall(&mut self, physics: &mut Physics, vertices: &[Vec2]) -> usize {
        let center = if vertices.is_empty() {
            Vec2::ZERO
        } else {
            vertices.iter().copied().sum::<Vec2>() / vertices.len() as f32
        };

        let body = physics.create_fixed_body(center, 0.0, None);
        let fragment = SurfaceFragment::from_polygon(vertices, body);
        physics.add_box_collider(body, fragment.half_extents(), 1.0);

        self.add_fragment(fragment)
    }

    /// Get a fragment by index
    pub fn fragment(&self, index: usize) -> Option<&SurfaceFragment> {
        self.fragments.get(index)
    }

    /// All fragments in insertion order
    pub fn fragments(&self) -> &[SurfaceFragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl SpatialQuery for Level {
    fn fragments_near(&self, position: Vec2, radius: u32) -> Vec<&SurfaceFragment> {
        let (cx, cy) = self.cell_of(position);
        let r = radius as i32;

        let mut indices: Vec<usize> = Vec::new();
        for x in cx - r..=cx + r {
            for y in cy - r..=cy + r {
                if let Some(cell) = self.cells.get(&(x, y)) {
                    indices.extend_from_slice(cell);
                }
            }
        }
        indices.sort_unstable();

        indices.into_iter().map(|i| &self.fragments[i]).collect()
    }
}
