//! Box-and-sphere bounds carried by octree nodes

use crate::core::types::{Affine3A, Vec3};
use super::Aabb;

/// Box (origin + half extent) paired with a bounding sphere radius.
///
/// Renderers use the box for frustum tests and the radius for cheap
/// distance checks against the LOD distance thresholds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeBounds {
    pub origin: Vec3,
    pub extent: Vec3,
    pub radius: f32,
}

impl NodeBounds {
    /// Bounds centered on `origin` with half extent `extent`
    pub fn new(origin: Vec3, extent: Vec3) -> Self {
        Self { origin, extent, radius: extent.length() }
    }

    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self::new(aabb.center(), aabb.half_extent())
    }

    pub fn to_aabb(&self) -> Aabb {
        Aabb::from_center_half_extent(self.origin, self.extent)
    }

    /// Bounds after applying a placement transform.
    ///
    /// The box is re-fitted around the rotated/scaled extent; the sphere
    /// radius grows with the largest axis scale.
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        let m = transform.matrix3;
        let extent = m.x_axis.abs() * self.extent.x
            + m.y_axis.abs() * self.extent.y
            + m.z_axis.abs() * self.extent.z;
        let scale = m.x_axis.length().max(m.y_axis.length()).max(m.z_axis.length());

        Self {
            origin: transform.transform_point3(self.origin),
            extent: Vec3::from(extent),
            radius: self.radius * scale,
        }
    }
}
