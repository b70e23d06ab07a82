//! The point octree: rebuild orchestration and tree-wide state.

use std::sync::Arc;
use std::time::Instant;

use crate::core::types::Affine3A;
use crate::core::{Error, Result};
use crate::source::PointSource;
use super::build::{BuildContext, BuildParams};
use super::lod;
use super::node::OctreeNode;
use super::reservation::MAX_TRACKED_DEPTH;
use super::stats::{self, DepthStats};

/// Largest supported LOD count: one reservation bit per non-root depth.
pub const MAX_LOD_LEVELS: u32 = MAX_TRACKED_DEPTH + 1;

/// LOD octree over a static point set.
///
/// Rebuilt wholesale from a [`PointSource`] whenever its geometry or LOD
/// settings change. A rebuild takes `&mut self`, so readers can never
/// observe a half-built tree.
#[derive(Debug, Default)]
pub struct PointOctree {
    root: Option<OctreeNode>,
    max_lod: Option<u32>,
    sampling_strides: Vec<f64>,
    distance_thresholds: Vec<f32>,
    stats: Vec<DepthStats>,
    local_to_world: Affine3A,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl PointOctree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run root-level fan-out on `pool` instead of rayon's global pool.
    pub fn with_thread_pool(mut self, pool: Arc<rayon::ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Drop the tree, its strides and its statistics.
    pub fn clear(&mut self) {
        self.root = None;
        self.max_lod = None;
        self.sampling_strides.clear();
        self.stats.clear();
    }

    /// Rebuild the whole tree from `source`.
    ///
    /// The previous tree is destroyed first. On error the tree stays empty.
    /// A source whose points all fall below the node minimum is not an
    /// error: the rebuild succeeds with no root.
    pub fn rebuild(&mut self, source: &dyn PointSource) -> Result<()> {
        self.clear();
        let start = Instant::now();

        let lod_count = source.lod_count();
        if lod_count == 0 {
            log::error!("Point source reports no LOD levels, maximum LOD would be negative");
            self.distance_thresholds.clear();
            return Err(Error::NoLodLevels);
        }
        if lod_count > MAX_LOD_LEVELS {
            log::error!("Point source requests {} LOD levels, at most {} supported", lod_count, MAX_LOD_LEVELS);
            self.distance_thresholds.clear();
            return Err(Error::TooManyLodLevels { requested: lod_count, max: MAX_LOD_LEVELS });
        }

        let max_lod = lod_count - 1;
        let params = BuildParams {
            max_lod,
            minimum_node_point_count: source.minimum_node_point_count() as usize,
            strides: lod::sampling_strides(max_lod, source.lod_reduction()),
            uses_sprites: source.uses_sprites(),
            single_poly_sprite_minimum_lod: source.single_poly_sprite_minimum_lod(),
        };
        log::debug!(
            "Rebuilding octree: max LOD {}, minimum node points {}, strides {:?}",
            max_lod, params.minimum_node_point_count, params.strides
        );

        lod::refresh_distance_thresholds(&mut self.distance_thresholds, source);

        let ctx = BuildContext::new(params, source.point_count(true));
        let points = source.enabled_points();
        let root_bounds = source.bounds().bounding_cube();

        let built = match &self.pool {
            Some(pool) => pool.install(|| OctreeNode::build_root(&ctx, root_bounds, &points)),
            None => OctreeNode::build_root(&ctx, root_bounds, &points),
        };

        let root = match built {
            Ok(root) => root,
            Err(e) => {
                log::error!("Octree rebuild failed: {}", e);
                self.distance_thresholds.clear();
                return Err(e);
            }
        };

        let (params, stats) = ctx.finish();
        self.max_lod = Some(max_lod);
        self.sampling_strides = params.strides;
        self.stats = stats;
        self.root = root;

        let local_to_world = self.local_to_world;
        if let Some(root) = &mut self.root {
            root.apply_local_to_world(&local_to_world);
        }

        log::info!(
            "Rebuilt octree over {} points: {} nodes, {} primitives in {:.1}ms",
            points.len(),
            self.node_count(),
            self.total_primitive_count(),
            start.elapsed().as_secs_f64() * 1000.0,
        );
        Ok(())
    }

    /// Set the placement transform and recompute every node's world bounds.
    /// Structure and caches are untouched.
    pub fn apply_local_to_world(&mut self, local_to_world: Affine3A) {
        self.local_to_world = local_to_world;
        if let Some(root) = &mut self.root {
            root.apply_local_to_world(&local_to_world);
        }
    }

    pub fn local_to_world(&self) -> &Affine3A {
        &self.local_to_world
    }

    pub fn root(&self) -> Option<&OctreeNode> {
        self.root.as_ref()
    }

    pub fn is_built(&self) -> bool {
        self.root.is_some()
    }

    /// Maximum LOD (held by the root), `None` before a successful rebuild.
    pub fn max_lod(&self) -> Option<u32> {
        self.max_lod
    }

    /// Sampling stride per LOD.
    pub fn sampling_strides(&self) -> &[f64] {
        &self.sampling_strides
    }

    /// View distance threshold per LOD, for the renderer's LOD pick.
    pub fn distance_thresholds(&self) -> &[f32] {
        &self.distance_thresholds
    }

    /// Statistics per depth (index 0 = root).
    pub fn stats(&self) -> &[DepthStats] {
        &self.stats
    }

    /// Diagnostic dump, one line per LOD.
    pub fn stats_report(&self) -> Vec<String> {
        stats::report(&self.stats)
    }

    pub fn log_stats(&self) {
        for line in self.stats_report() {
            log::info!("{}", line);
        }
    }

    /// Depth-first, pre-order walk over every node.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes { stack: self.root.iter().collect() }
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    pub fn total_primitive_count(&self) -> u64 {
        self.nodes().map(|n| u64::from(n.primitive_count())).sum()
    }
}

/// Pre-order node iterator returned by [`PointOctree::nodes`].
#[derive(Debug)]
pub struct Nodes<'a> {
    stack: Vec<&'a OctreeNode>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a OctreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use glam::Vec3;
    use crate::core::types::Quat;
    use crate::source::{synthetic, CloudPoint, LodSettings, PointCloud};

    fn settings(lod_count: u32, minimum: u32, reduction: f32) -> LodSettings {
        LodSettings {
            lod_count,
            minimum_node_point_count: minimum,
            lod_reduction: reduction,
            ..Default::default()
        }
    }

    fn built(source: &PointCloud) -> PointOctree {
        let mut tree = PointOctree::new();
        tree.rebuild(source).unwrap();
        tree
    }

    /// (depth, octant, lod, indices) per node, pre-order.
    fn snapshot(tree: &PointOctree) -> Vec<(u32, u8, u32, Vec<u32>)> {
        tree.nodes()
            .map(|n| (n.depth(), n.octant(), n.lod(), n.indices().to_vec()))
            .collect()
    }

    #[test]
    fn test_uniform_thousand_points() {
        let cloud = synthetic::uniform_cube(1000, 10.0, 42, settings(3, 10, 0.5));
        let tree = built(&cloud);

        assert_eq!(tree.max_lod(), Some(2));
        assert_eq!(tree.sampling_strides(), &[4.0, 2.0, 1.0]);
        assert_eq!(tree.stats().len(), 3);
        assert_eq!(tree.stats()[0].cells, 1);

        let root = tree.root().unwrap();
        assert_eq!(root.lod(), 2);
        assert_eq!(root.point_count(), 1000);
        assert_eq!(root.primitive_count(), 1000);
    }

    #[test]
    fn test_nodes_meet_minimum() {
        let minimum = 10;
        let cloud = synthetic::uniform_cube(3000, 5.0, 7, settings(5, minimum, 0.5));
        let tree = built(&cloud);

        assert!(tree.node_count() > 1);
        for node in tree.nodes() {
            assert!(node.point_count() >= minimum as usize, "node at depth {} has {}", node.depth(), node.point_count());
        }
    }

    #[test]
    fn test_whole_set_below_minimum() {
        let cloud = synthetic::uniform_cube(9, 5.0, 1, settings(3, 10, 0.5));
        let mut tree = PointOctree::new();
        tree.rebuild(&cloud).unwrap();

        assert!(!tree.is_built());
        assert_eq!(tree.node_count(), 0);
        assert_eq!(tree.max_lod(), Some(2));
        assert!(tree.stats().iter().all(|s| s.cells == 0));

        // exactly at the minimum builds
        let cloud = synthetic::uniform_cube(10, 5.0, 1, settings(3, 10, 0.5));
        tree.rebuild(&cloud).unwrap();
        assert!(tree.is_built());
    }

    #[test]
    fn test_lod_matches_depth() {
        let cloud = synthetic::uniform_cube(2000, 5.0, 3, settings(4, 4, 0.3));
        let tree = built(&cloud);
        let max_lod = tree.max_lod().unwrap();

        assert_eq!(tree.root().unwrap().lod(), max_lod);
        for node in tree.nodes() {
            assert_eq!(node.lod(), max_lod - node.depth());
            assert!(node.children().len() <= 8);
            let octants: Vec<u8> = node.children().iter().map(|c| c.octant()).collect();
            assert!(octants.windows(2).all(|w| w[0] < w[1]));
            for child in node.children() {
                assert_eq!(child.depth(), node.depth() + 1);
            }
        }
    }

    #[test]
    fn test_point_reserved_once_per_depth() {
        // lattice points land on every octant face plane
        let cloud = synthetic::lattice(9, 1.0, settings(4, 1, 0.0));
        let tree = built(&cloud);
        let max_lod = tree.max_lod().unwrap();

        let mut seen_at_depths = vec![0u32; cloud.point_count(true)];
        for depth in 0..=max_lod {
            let mut ids = HashSet::new();
            for node in tree.nodes().filter(|n| n.depth() == depth) {
                for &id in node.indices() {
                    assert!(ids.insert(id), "point {} claimed twice at depth {}", id, depth);
                }
            }
            for id in ids {
                seen_at_depths[id as usize] += 1;
            }
        }
        // with a minimum of one, every point reaches every depth exactly once
        assert!(seen_at_depths.iter().all(|&n| n == max_lod + 1));
    }

    #[test]
    fn test_shared_face_point_goes_to_one_sibling() {
        let cloud = PointCloud::from_locations(
            [Vec3::ZERO, Vec3::splat(2.0), Vec3::new(1.0, 0.5, 0.5)],
            settings(2, 1, 0.0),
        );
        let tree = built(&cloud);
        let root = tree.root().unwrap();

        let holders: Vec<u8> = root
            .children()
            .iter()
            .filter(|c| c.indices().contains(&2))
            .map(|c| c.octant())
            .collect();
        assert_eq!(holders, vec![0]);
        assert!(root.child(1).is_none());
    }

    #[test]
    fn test_shared_face_point_falls_to_next_sibling() {
        // octant 0 would hold only the shared point, below the minimum of two
        let cloud = PointCloud::from_locations(
            [
                Vec3::new(0.0, 2.0, 0.0),
                Vec3::new(2.0, 0.0, 2.0),
                Vec3::new(1.0, 0.5, 0.5),
                Vec3::new(1.5, 0.5, 0.5),
            ],
            settings(2, 2, 0.0),
        );
        let tree = built(&cloud);
        let root = tree.root().unwrap();

        assert_eq!(root.point_count(), 4);
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.child(1).unwrap().indices(), &[2, 3]);
    }

    #[test]
    fn test_deterministic_across_pools() {
        let cloud = synthetic::lattice(9, 0.5, settings(4, 3, 0.4));
        let reference = snapshot(&built(&cloud));
        assert!(reference.len() > 9);

        for threads in [1, 2, 8] {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
            let mut tree = PointOctree::new().with_thread_pool(Arc::new(pool));
            tree.rebuild(&cloud).unwrap();
            assert_eq!(snapshot(&tree), reference, "{} threads", threads);
        }

        let mut again = PointOctree::new();
        again.rebuild(&cloud).unwrap();
        again.rebuild(&cloud).unwrap();
        assert_eq!(snapshot(&again), reference);
    }

    #[test]
    fn test_zero_lod_levels() {
        let cloud = synthetic::uniform_cube(100, 5.0, 1, settings(3, 1, 0.5));
        let mut tree = built(&cloud);
        assert!(tree.is_built());

        let empty_lods = synthetic::uniform_cube(100, 5.0, 1, settings(0, 1, 0.5));
        let result = tree.rebuild(&empty_lods);
        assert!(matches!(result, Err(Error::NoLodLevels)));
        assert!(!tree.is_built());
        assert_eq!(tree.max_lod(), None);
        assert!(tree.stats().is_empty());
        assert!(tree.sampling_strides().is_empty());
        assert!(tree.stats_report().is_empty());
        assert!(tree.distance_thresholds().is_empty());
    }

    #[test]
    fn test_too_many_lod_levels() {
        let cloud = synthetic::uniform_cube(10, 5.0, 1, settings(MAX_LOD_LEVELS + 1, 1, 0.5));
        let mut tree = PointOctree::new();
        assert!(matches!(
            tree.rebuild(&cloud),
            Err(Error::TooManyLodLevels { .. })
        ));
        assert!(!tree.is_built());
    }

    #[test]
    fn test_out_of_range_id_aborts_build() {
        let points = vec![
            CloudPoint::new(Vec3::ZERO, 0),
            CloudPoint::new(Vec3::ONE, 1),
            CloudPoint::new(Vec3::splat(0.5), 50),
        ];
        let cloud = PointCloud::new(points, settings(3, 1, 0.0));
        let mut tree = PointOctree::new();

        let result = tree.rebuild(&cloud);
        assert!(matches!(result, Err(Error::PointIdOutOfRange { id: 50, capacity: 3 })));
        assert!(!tree.is_built());
        assert!(tree.stats().is_empty());
        assert!(tree.distance_thresholds().is_empty());
    }

    #[test]
    fn test_sprite_index_groups() {
        let mut s = settings(2, 1, 0.0);
        s.uses_sprites = true;
        s.single_poly_sprite_minimum_lod = 1;
        let cloud = synthetic::uniform_cube(500, 5.0, 11, s);
        let tree = built(&cloud);

        let root = tree.root().unwrap();
        assert_eq!(root.lod(), 1);
        assert_eq!(root.indices().len(), 3 * root.point_count());
        assert_eq!(root.primitive_count() as usize, root.point_count());

        let mut leaf_points = 0;
        for child in root.children() {
            assert_eq!(child.lod(), 0);
            assert_eq!(child.indices().len(), 6 * child.point_count());
            assert_eq!(child.primitive_count() as usize, 2 * child.point_count());
            leaf_points += child.point_count() as u64;
        }

        // quad primitives are halved back to points in the statistics
        assert_eq!(tree.stats()[1].total_points, leaf_points);
        assert_eq!(tree.stats()[0].total_points, root.point_count() as u64);
    }

    #[test]
    fn test_lod0_hoisted_into_first_sibling() {
        let cloud = synthetic::lattice(9, 1.0, settings(3, 1, 0.0));
        let tree = built(&cloud);
        assert_eq!(tree.max_lod(), Some(2));

        let mut hoisted = 0;
        for parent in tree.nodes().filter(|n| n.depth() == 1) {
            let total: usize = parent.children().iter().map(|c| c.point_count()).sum();
            let (first, rest) = parent.children().split_first().unwrap();
            assert_eq!(first.indices().len(), total);
            for other in rest {
                assert!(other.indices().is_empty());
                assert_eq!(other.primitive_count(), 0);
                hoisted += 1;
            }
        }
        assert!(hoisted > 0);

        // hoisted nodes still count as cells
        let leaves = tree.nodes().filter(|n| n.depth() == 2).count();
        assert_eq!(tree.stats()[2].cells as usize, leaves);
    }

    #[test]
    fn test_lod0_hoist_without_octant0_child() {
        let points = vec![
            CloudPoint::new(Vec3::new(3.0, 1.0, 1.0), 0),
            CloudPoint::new(Vec3::new(1.0, 3.0, 1.0), 1),
            CloudPoint::new(Vec3::splat(8.0), 2),
            CloudPoint::new(Vec3::new(0.0, 0.0, 8.0), 3),
            CloudPoint::new(Vec3::new(8.0, 0.0, 0.0), 4),
        ];
        let cloud = PointCloud::new(points, settings(3, 1, 0.0));
        let tree = built(&cloud);

        let parent = tree.root().unwrap().child(0).unwrap();
        let octants: Vec<u8> = parent.children().iter().map(|c| c.octant()).collect();
        assert_eq!(octants, vec![1, 2]);
        assert_eq!(parent.children()[0].indices(), &[0, 1]);
        assert_eq!(parent.children()[0].primitive_count(), 2);
        assert!(parent.children()[1].indices().is_empty());
        assert_eq!(parent.children()[1].point_count(), 1);
    }

    #[test]
    fn test_no_hoist_with_single_level_below_root() {
        let cloud = synthetic::lattice(9, 1.0, settings(2, 1, 0.0));
        let tree = built(&cloud);

        for child in tree.root().unwrap().children() {
            assert_eq!(child.lod(), 0);
            assert_eq!(child.indices().len(), child.point_count());
        }
    }

    #[test]
    fn test_disabled_points_never_cached() {
        let mut cloud = synthetic::uniform_cube(400, 5.0, 5, settings(3, 2, 0.0));
        for i in (0..400).step_by(3) {
            cloud.set_enabled(i, false);
        }
        let tree = built(&cloud);

        assert_eq!(tree.root().unwrap().point_count(), cloud.point_count(false));
        for node in tree.nodes() {
            assert!(node.indices().iter().all(|&id| id % 3 != 0));
        }
    }

    #[test]
    fn test_zero_minimum_keeps_empty_octants() {
        let cloud = PointCloud::from_locations([Vec3::ZERO, Vec3::ONE], settings(3, 0, 0.0));
        let tree = built(&cloud);
        assert_eq!(tree.node_count(), 1 + 8 + 64);
    }

    #[test]
    fn test_distance_thresholds_refreshed() {
        let mut s = settings(3, 1, 0.5);
        s.distance_thresholds = vec![10.0, 20.0, 40.0, 80.0];
        let mut cloud = synthetic::uniform_cube(50, 1.0, 2, s);
        let mut tree = built(&cloud);
        assert_eq!(tree.distance_thresholds(), &[10.0, 20.0, 40.0]);

        cloud.settings_mut().lod_count = 5;
        tree.rebuild(&cloud).unwrap();
        assert_eq!(tree.distance_thresholds(), &[10.0, 20.0, 40.0, 80.0, f32::INFINITY]);
    }

    #[test]
    fn test_stats_cover_every_node() {
        let cloud = synthetic::uniform_cube(1500, 5.0, 9, settings(4, 5, 0.5));
        let tree = built(&cloud);

        let cells: u32 = tree.stats().iter().map(|s| s.cells).sum();
        assert_eq!(cells as usize, tree.node_count());

        let report = tree.stats_report();
        assert_eq!(report.len(), 4);
        assert!(report[0].starts_with("[LOD3] cells: 1,"));
        assert!(report[3].starts_with("[LOD0]"));
        tree.log_stats();
    }

    #[test]
    fn test_apply_local_to_world() {
        let cloud = synthetic::uniform_cube(300, 5.0, 4, settings(3, 5, 0.5));
        let mut tree = built(&cloud);
        let before = snapshot(&tree);

        let transform = Affine3A::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::IDENTITY,
            Vec3::new(100.0, 0.0, -50.0),
        );
        tree.apply_local_to_world(transform);

        for node in tree.nodes() {
            let local = node.local_bounds();
            let world = node.world_bounds();
            assert!((world.origin - (local.origin * 2.0 + Vec3::new(100.0, 0.0, -50.0))).length() < 1e-3);
            assert!((world.extent - local.extent * 2.0).length() < 1e-4);
        }
        assert_eq!(snapshot(&tree), before);

        // placement survives a rebuild
        tree.rebuild(&cloud).unwrap();
        let root = tree.root().unwrap();
        assert!((root.world_bounds().origin - root.local_bounds().transformed(&transform).origin).length() < 1e-4);
    }

    #[test]
    fn test_identity_placement_keeps_world_equal_local() {
        let cloud = synthetic::uniform_cube(200, 5.0, 8, settings(3, 5, 0.5));
        let tree = built(&cloud);
        for node in tree.nodes() {
            assert_eq!(node.world_bounds(), node.local_bounds());
        }
    }

    #[test]
    fn test_total_primitive_count() {
        let cloud = synthetic::uniform_cube(800, 5.0, 6, settings(3, 10, 0.5));
        let tree = built(&cloud);
        let sum: u64 = tree.nodes().map(|n| u64::from(n.primitive_count())).sum();
        assert_eq!(tree.total_primitive_count(), sum);
        assert!(sum >= 800);
    }
}
