//! Axis-aligned bounding box

use crate::core::types::Vec3;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create AABB from center and half-extents
    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Smallest AABB containing every point, or `None` for an empty iterator
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut aabb = Self::new(first, first);
        for p in points {
            aabb.expand(p);
        }
        Some(aabb)
    }

    /// Get center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get half-extents
    pub fn half_extent(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Cube sharing this box's center whose half extent is the largest axis
    /// half extent. Corners are widened by rounding error where needed so the
    /// cube always contains the original box.
    pub fn bounding_cube(&self) -> Aabb {
        let cube = Aabb::from_center_half_extent(self.center(), Vec3::splat(self.half_extent().max_element()));
        cube.merged(self)
    }

    /// Return merged AABB containing both
    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Check if point is inside AABB (faces inclusive)
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }

    /// Check if any coordinate of `p` lies exactly on one of the six face planes
    pub fn on_boundary(&self, p: Vec3) -> bool {
        p.x == self.min.x || p.x == self.max.x ||
        p.y == self.min.y || p.y == self.max.y ||
        p.z == self.min.z || p.z == self.max.z
    }

    /// Expand AABB to include point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Get child octant AABB for octree subdivision
    /// index: 0-7 representing xyz octant (bit 0=x, bit 1=y, bit 2=z)
    ///
    /// Corners are picked from the parent's min, center and max so that two
    /// siblings share bit-identical face planes.
    pub fn child_octant(&self, index: u8) -> Aabb {
        let center = self.center();
        let pick = |bit: u8, min: f32, mid: f32, max: f32| {
            if index & bit != 0 { (mid, max) } else { (min, mid) }
        };

        let (min_x, max_x) = pick(1, self.min.x, center.x, self.max.x);
        let (min_y, max_y) = pick(2, self.min.y, center.y, self.max.y);
        let (min_z, max_z) = pick(4, self.min.z, center.z, self.max.z);

        Aabb::new(Vec3::new(min_x, min_y, min_z), Vec3::new(max_x, max_y, max_z))
    }
}
