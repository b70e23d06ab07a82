//! LOD configuration carried by a point source.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::Result;

/// LOD parameters the octree reads from its point source on every rebuild.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodSettings {
    /// Number of LOD levels. The octree's maximum depth is `lod_count - 1`.
    pub lod_count: u32,
    /// View distance threshold per LOD, indexed by LOD.
    pub distance_thresholds: Vec<f32>,
    /// Geometric reduction per level (0 = keep everything, 1 = keep one point).
    pub lod_reduction: f32,
    /// Nodes with fewer qualifying points are discarded.
    pub minimum_node_point_count: u32,
    /// Render points as sprite quads instead of single vertices.
    pub uses_sprites: bool,
    /// LOD at and above which a sprite collapses to a single triangle.
    pub single_poly_sprite_minimum_lod: u32,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            lod_count: 4,
            distance_thresholds: vec![500.0, 1000.0, 2000.0, 4000.0],
            lod_reduction: 0.5,
            minimum_node_point_count: 16,
            uses_sprites: false,
            single_poly_sprite_minimum_lod: 1,
        }
    }
}

impl LodSettings {
    /// Parse settings from a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Reduction factor clamped to [0, 1].
    pub fn clamped_reduction(&self) -> f32 {
        self.lod_reduction.clamp(0.0, 1.0)
    }

    /// Distance threshold for `lod`; LODs without an entry never switch out.
    pub fn distance_threshold(&self, lod: u32) -> f32 {
        self.distance_thresholds
            .get(lod as usize)
            .copied()
            .unwrap_or(f32::INFINITY)
    }
}
