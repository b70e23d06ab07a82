//! In-memory point source

use crate::core::types::Vec3;
use crate::math::Aabb;
use super::{CloudPoint, LodSettings, PointSource};

/// Point set held in a `Vec`, with bounds computed on construction.
#[derive(Clone, Debug, Default)]
pub struct PointCloud {
    points: Vec<CloudPoint>,
    bounds: Aabb,
    settings: LodSettings,
}

impl PointCloud {
    /// Wrap existing points. Bounds cover every point, disabled ones included.
    pub fn new(points: Vec<CloudPoint>, settings: LodSettings) -> Self {
        let bounds = Aabb::from_points(points.iter().map(|p| p.location)).unwrap_or_default();
        Self { points, bounds, settings }
    }

    /// Build from bare locations; ids follow input order.
    pub fn from_locations(locations: impl IntoIterator<Item = Vec3>, settings: LodSettings) -> Self {
        let points = locations
            .into_iter()
            .enumerate()
            .map(|(i, location)| CloudPoint::new(location, i as u32))
            .collect();
        Self::new(points, settings)
    }

    pub fn settings_mut(&mut self) -> &mut LodSettings {
        &mut self.settings
    }

    /// Enable or disable a point by position. Bounds are left untouched.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(point) = self.points.get_mut(index) {
            point.enabled = enabled;
        }
    }
}

impl PointSource for PointCloud {
    fn points(&self) -> &[CloudPoint] {
        &self.points
    }

    fn settings(&self) -> &LodSettings {
        &self.settings
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }
}
