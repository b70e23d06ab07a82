//! Per-point, per-depth reservation bits.
//!
//! Stops a point lying on a face shared by sibling nodes from being
//! claimed by more than one of them. Only reachable during a rebuild: the
//! tracker lives inside the build state and is dropped when the build ends.
//!
//! Siblings are the only nodes that can contend for a point (cousins never
//! see each other's points), so the bits could be sharded per subtree
//! without changing results.

use crate::core::{Error, Result};

/// Deepest depth the tracker can represent. Depth 0 is the root, which has
/// no siblings and never needs a bit.
pub const MAX_TRACKED_DEPTH: u32 = u64::BITS;

#[derive(Debug, Default)]
pub struct ReservationTracker {
    bits: Vec<u64>,
}

impl ReservationTracker {
    /// Tracker for point ids `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self { bits: vec![0; capacity] }
    }

    fn mask(depth: u32) -> u64 {
        debug_assert!((1..=MAX_TRACKED_DEPTH).contains(&depth));
        1u64 << (depth - 1)
    }

    /// Whether `id` is already reserved at `depth`.
    pub fn is_reserved(&self, id: u32, depth: u32) -> Result<bool> {
        if depth == 0 {
            return Ok(false);
        }
        let word = self.bits.get(id as usize).ok_or(Error::PointIdOutOfRange {
            id,
            capacity: self.bits.len(),
        })?;
        Ok(word & Self::mask(depth) != 0)
    }

    /// Mark `id` as reserved at `depth`.
    pub fn reserve(&mut self, id: u32, depth: u32) -> Result<()> {
        let capacity = self.bits.len();
        let word = self.bits.get_mut(id as usize).ok_or(Error::PointIdOutOfRange { id, capacity })?;
        if depth > 0 {
            *word |= Self::mask(depth);
        }
        Ok(())
    }

    /// Depths at which `id` is reserved, shallowest first.
    pub fn reserved_depths(&self, id: u32) -> impl Iterator<Item = u32> + '_ {
        let word = self.bits.get(id as usize).copied().unwrap_or(0);
        (1..=MAX_TRACKED_DEPTH).filter(move |&d| word & Self::mask(d) != 0)
    }
}
