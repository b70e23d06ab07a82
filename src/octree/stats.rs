//! Per-depth build statistics and the diagnostic dump.

use std::fmt;

/// Aggregates for all nodes at one depth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DepthStats {
    /// Materialized nodes at this depth.
    pub cells: u32,
    /// Sum of recorded point counts.
    pub total_points: u64,
    /// Smallest non-zero recorded point count.
    pub min_points: Option<u32>,
    /// Largest recorded point count.
    pub max_points: Option<u32>,
}

impl DepthStats {
    /// Record one cell. Zero counts (nodes whose primitives were hoisted into
    /// a sibling) add a cell but stay out of the point aggregates.
    pub fn record(&mut self, points: u32) {
        self.cells += 1;
        if points == 0 {
            return;
        }
        self.total_points += u64::from(points);
        self.min_points = Some(self.min_points.map_or(points, |m| m.min(points)));
        self.max_points = Some(self.max_points.map_or(points, |m| m.max(points)));
    }
}

impl fmt::Display for DepthStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cells: {}, points min: {}, max: {}, total: {}",
            self.cells,
            self.min_points.unwrap_or(0),
            self.max_points.unwrap_or(0),
            self.total_points,
        )
    }
}

/// Point count to record for a node with `primitives` cached primitives.
///
/// Quad sprites (LODs below the single-triangle threshold) emit two
/// primitives per point, so the count is halved back to points. Reporting
/// only; the cache itself is unaffected.
pub fn recorded_points(primitives: u32, lod: u32, uses_sprites: bool, single_poly_min_lod: u32) -> u32 {
    if uses_sprites && lod < single_poly_min_lod {
        primitives / 2
    } else {
        primitives
    }
}

/// One line per LOD, root (highest LOD) first.
pub fn report(stats: &[DepthStats]) -> Vec<String> {
    let max_lod = stats.len().saturating_sub(1);
    stats
        .iter()
        .enumerate()
        .map(|(depth, s)| format!("[LOD{}] {}", max_lod - depth, s))
        .collect()
}
