//! Point sources: the read-only input an octree is built from.
//!
//! A source exposes an ordered point sequence with stable per-point ids
//! (the ids index the renderer's vertex buffers), global bounds and the
//! LOD configuration block. Importing point data is the host's job; the
//! in-memory [`PointCloud`] and the [`synthetic`] generators cover tests,
//! benches and the demo binary.

pub mod settings;
pub mod memory;
pub mod synthetic;

pub use settings::LodSettings;
pub use memory::PointCloud;

use crate::core::types::Vec3;
use crate::math::Aabb;

/// A single cloud point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CloudPoint {
    pub location: Vec3,
    /// Stable identifier, used as the vertex index in render buffers.
    pub id: u32,
    /// Disabled points are skipped by the octree but keep their id.
    pub enabled: bool,
}

impl CloudPoint {
    pub fn new(location: Vec3, id: u32) -> Self {
        Self { location, id, enabled: true }
    }
}

/// Read-only view of a point set plus its LOD configuration.
pub trait PointSource: Sync {
    /// All points, in their stable order.
    fn points(&self) -> &[CloudPoint];

    /// LOD configuration.
    fn settings(&self) -> &LodSettings;

    /// Global bounds of the point set.
    fn bounds(&self) -> Aabb;

    /// Enabled points in source order.
    fn enabled_points(&self) -> Vec<&CloudPoint> {
        self.points().iter().filter(|p| p.enabled).collect()
    }

    fn point_count(&self, include_disabled: bool) -> usize {
        if include_disabled {
            self.points().len()
        } else {
            self.points().iter().filter(|p| p.enabled).count()
        }
    }

    fn lod_count(&self) -> u32 {
        self.settings().lod_count
    }

    fn distance_threshold(&self, lod: u32) -> f32 {
        self.settings().distance_threshold(lod)
    }

    /// Reduction factor, clamped to [0, 1].
    fn lod_reduction(&self) -> f32 {
        self.settings().clamped_reduction()
    }

    fn minimum_node_point_count(&self) -> u32 {
        self.settings().minimum_node_point_count
    }

    fn uses_sprites(&self) -> bool {
        self.settings().uses_sprites
    }

    fn single_poly_sprite_minimum_lod(&self) -> u32 {
        self.settings().single_poly_sprite_minimum_lod
    }
}
