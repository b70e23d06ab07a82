//! Shared state for one rebuild.
//!
//! Node construction runs in three steps: a lock-free spatial scan of the
//! parent's accepted points, a claim that filters shared-face points
//! against the reservation tracker and commits reservations, and the
//! finish step (bounds, cache, stats, recursion) in `node.rs`. Only the
//! claim and the stats update take the lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::Result;
use crate::math::Aabb;
use crate::source::CloudPoint;
use super::cache::PrimitiveEncoding;
use super::reservation::ReservationTracker;
use super::stats::{self, DepthStats};

/// Parameters fixed for the duration of a rebuild.
#[derive(Clone, Debug)]
pub struct BuildParams {
    pub max_lod: u32,
    pub minimum_node_point_count: usize,
    /// Sampling stride per LOD.
    pub strides: Vec<f64>,
    pub uses_sprites: bool,
    pub single_poly_sprite_minimum_lod: u32,
}

impl BuildParams {
    pub fn encoding(&self, lod: u32) -> PrimitiveEncoding {
        PrimitiveEncoding::for_lod(lod, self.uses_sprites, self.single_poly_sprite_minimum_lod)
    }

    /// Whether a LOD 0 node writes its indices into the parent's first child.
    ///
    /// Needs `max_lod > 1`: with a single level below the root, LOD 0 nodes
    /// are the root's children, which are built concurrently.
    pub fn hoists_into_sibling(&self, lod: u32, depth: u32) -> bool {
        let hoists = lod == 0 && depth > 0 && self.max_lod > 1;
        debug_assert!(!hoists || depth >= 2);
        hoists
    }
}

/// A point that passed the spatial test for a node.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'p> {
    pub point: &'p CloudPoint,
    /// Lies on one of the node's face planes, so a sibling may hold it too.
    pub on_boundary: bool,
}

/// Points of `points` inside `bounds` (faces inclusive), in input order.
pub fn scan<'p>(bounds: &Aabb, points: &[&'p CloudPoint]) -> Vec<Candidate<'p>> {
    points
        .iter()
        .filter(|p| bounds.contains_point(p.location))
        .map(|&point| Candidate { point, on_boundary: bounds.on_boundary(point.location) })
        .collect()
}

#[derive(Debug)]
struct BuildState {
    reservations: ReservationTracker,
    stats: Vec<DepthStats>,
}

/// Everything a node needs while building: fixed parameters plus the
/// lock-guarded tracker and statistics.
#[derive(Debug)]
pub struct BuildContext {
    pub params: BuildParams,
    state: Mutex<BuildState>,
}

impl BuildContext {
    /// Context for point ids `0..point_capacity`.
    pub fn new(params: BuildParams, point_capacity: usize) -> Self {
        let depths = params.max_lod as usize + 1;
        Self {
            params,
            state: Mutex::new(BuildState {
                reservations: ReservationTracker::new(point_capacity),
                stats: vec![DepthStats::default(); depths],
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BuildState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept the candidates of a node at `depth`.
    ///
    /// Interior points are always kept; boundary points only if no sibling
    /// reserved them first. Returns `None` (and reserves nothing) when fewer
    /// than the minimum remain.
    pub fn claim<'p>(&self, depth: u32, candidates: Vec<Candidate<'p>>) -> Result<Option<Vec<&'p CloudPoint>>> {
        let minimum = self.params.minimum_node_point_count;
        if candidates.len() < minimum {
            return Ok(None);
        }

        let mut state = self.lock();
        let mut accepted = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !candidate.on_boundary || !state.reservations.is_reserved(candidate.point.id, depth)? {
                accepted.push(candidate.point);
            }
        }

        if accepted.len() < minimum {
            return Ok(None);
        }

        for point in &accepted {
            state.reservations.reserve(point.id, depth)?;
        }
        Ok(Some(accepted))
    }

    /// Add one materialized node's primitives to the statistics for `depth`.
    pub fn record_stats(&self, depth: u32, lod: u32, primitive_count: u32) {
        let points = stats::recorded_points(
            primitive_count,
            lod,
            self.params.uses_sprites,
            self.params.single_poly_sprite_minimum_lod,
        );
        if let Some(entry) = self.lock().stats.get_mut(depth as usize) {
            entry.record(points);
        }
    }

    /// End the build, dropping the reservation tracker.
    pub fn finish(self) -> (BuildParams, Vec<DepthStats>) {
        let state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        (self.params, state.stats)
    }
}
