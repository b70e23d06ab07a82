//! Octree nodes and their recursive construction.

use rayon::prelude::*;

use crate::core::types::Affine3A;
use crate::core::Result;
use crate::math::{Aabb, NodeBounds};
use crate::source::CloudPoint;
use super::build::{self, BuildContext};
use super::cache::{self, IndexCache};

/// Maximum children per node, one per octant.
pub const MAX_CHILDREN: usize = 8;

/// A materialized node: box bounds, LOD, draw indices and up to 8 children.
///
/// Children are owned and kept in ascending octant order. Octant bits:
/// bit 0 = +x, bit 1 = +y, bit 2 = +z half of the parent.
#[derive(Clone, Debug)]
pub struct OctreeNode {
    local_bounds: NodeBounds,
    world_bounds: NodeBounds,
    lod: u32,
    depth: u32,
    octant: u8,
    point_count: usize,
    cache: IndexCache,
    children: Vec<OctreeNode>,
}

impl OctreeNode {
    /// Build the root over `points`. `None` when fewer than the minimum
    /// qualify, leaving the tree unbuilt.
    pub(crate) fn build_root(ctx: &BuildContext, bounds: Aabb, points: &[&CloudPoint]) -> Result<Option<Self>> {
        let Some(accepted) = ctx.claim(0, build::scan(&bounds, points))? else {
            log::debug!("Root holds fewer than {} points, tree left empty", ctx.params.minimum_node_point_count);
            return Ok(None);
        };
        Self::finish(ctx, bounds, 0, 0, accepted, None).map(Some)
    }

    /// Materialize a node whose points have been claimed: bounds, cache,
    /// stats, then children.
    ///
    /// `sibling` is the parent's first built child, if any; a LOD 0 node
    /// appends its indices there instead of keeping its own.
    fn finish(
        ctx: &BuildContext,
        bounds: Aabb,
        depth: u32,
        octant: u8,
        accepted: Vec<&CloudPoint>,
        sibling: Option<&mut OctreeNode>,
    ) -> Result<Self> {
        let params = &ctx.params;
        let lod = params.max_lod - depth;
        let local_bounds = NodeBounds::from_aabb(&bounds);

        let mut node = Self {
            local_bounds,
            world_bounds: local_bounds,
            lod,
            depth,
            octant,
            point_count: accepted.len(),
            cache: IndexCache::default(),
            children: Vec::new(),
        };

        let stride = params.strides[lod as usize];
        let encoding = params.encoding(lod);
        match sibling.filter(|_| params.hoists_into_sibling(lod, depth)) {
            Some(target) => target.cache.append_sampled(&accepted, stride, encoding)?,
            None => {
                let len = cache::sampled_len(accepted.len(), stride) * encoding.indices_per_point();
                node.cache.indices.reserve_exact(len);
                node.cache.append_sampled(&accepted, stride, encoding)?;
            }
        }

        ctx.record_stats(depth, lod, node.cache.primitive_count);

        if depth < params.max_lod {
            node.children = if depth == 0 {
                Self::subdivide_parallel(ctx, &bounds, depth + 1, &accepted)?
            } else {
                Self::subdivide(ctx, &bounds, depth + 1, &accepted)?
            };
        }

        Ok(node)
    }

    /// Build children one octant after another on the calling thread.
    fn subdivide(ctx: &BuildContext, bounds: &Aabb, child_depth: u32, points: &[&CloudPoint]) -> Result<Vec<Self>> {
        let mut children: Vec<Self> = Vec::with_capacity(MAX_CHILDREN);

        for octant in 0..MAX_CHILDREN as u8 {
            let child_bounds = bounds.child_octant(octant);
            let Some(accepted) = ctx.claim(child_depth, build::scan(&child_bounds, points))? else {
                log::trace!("Discarded octant {} at depth {}", octant, child_depth);
                continue;
            };

            let child = Self::finish(ctx, child_bounds, child_depth, octant, accepted, children.first_mut())?;
            children.push(child);
        }

        Ok(children)
    }

    /// Root-level fan-out: all 8 children are built on the rayon pool and
    /// joined before returning.
    ///
    /// Scans run in parallel, claims run in octant order so shared-face
    /// points go to the same sibling on every run, then the 8 subtrees are
    /// finished in parallel. Children never hoist here, so every one of them
    /// owns its cache.
    ///
    /// Out-of-range ids and index overflow already fail in the root's own
    /// claim and cache, so in practice no subtree task returns an error.
    /// Should one fail anyway, the whole build fails with the lowest
    /// octant's error.
    fn subdivide_parallel(ctx: &BuildContext, bounds: &Aabb, child_depth: u32, points: &[&CloudPoint]) -> Result<Vec<Self>> {
        let scans: Vec<_> = (0..MAX_CHILDREN as u8)
            .into_par_iter()
            .map(|octant| {
                let child_bounds = bounds.child_octant(octant);
                (octant, child_bounds, build::scan(&child_bounds, points))
            })
            .collect();

        let mut claimed = Vec::with_capacity(MAX_CHILDREN);
        for (octant, child_bounds, candidates) in scans {
            match ctx.claim(child_depth, candidates)? {
                Some(accepted) => claimed.push((octant, child_bounds, accepted)),
                None => log::trace!("Discarded octant {} at depth {}", octant, child_depth),
            }
        }

        let results: Vec<Result<Self>> = claimed
            .into_par_iter()
            .map(|(octant, child_bounds, accepted)| {
                Self::finish(ctx, child_bounds, child_depth, octant, accepted, None)
            })
            .collect();

        results.into_iter().collect()
    }

    /// Recompute world bounds for this subtree from the local bounds.
    pub(crate) fn apply_local_to_world(&mut self, local_to_world: &Affine3A) {
        self.world_bounds = self.local_bounds.transformed(local_to_world);
        for child in &mut self.children {
            child.apply_local_to_world(local_to_world);
        }
    }

    pub fn local_bounds(&self) -> &NodeBounds {
        &self.local_bounds
    }

    pub fn world_bounds(&self) -> &NodeBounds {
        &self.world_bounds
    }

    /// LOD of this node: `max_lod - depth`.
    pub fn lod(&self) -> u32 {
        self.lod
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Octant within the parent (0 for the root).
    pub fn octant(&self) -> u8 {
        self.octant
    }

    /// Points accepted into this node (before sampling).
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Primitives in this node's own cache. Zero for LOD 0 nodes whose
    /// indices were folded into their parent's first child.
    pub fn primitive_count(&self) -> u32 {
        self.cache.primitive_count
    }

    pub fn indices(&self) -> &[u32] {
        &self.cache.indices
    }

    /// Indices as raw bytes, ready for an index buffer upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cache.indices)
    }

    pub fn children(&self) -> &[OctreeNode] {
        &self.children
    }

    pub fn child(&self, octant: u8) -> Option<&OctreeNode> {
        self.children.iter().find(|c| c.octant == octant)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
