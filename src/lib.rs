//! Pointlod - level-of-detail octree index for large static point clouds

pub mod core;
pub mod math;
pub mod source;
pub mod octree;

pub use octree::{OctreeNode, PointOctree};
pub use source::{CloudPoint, LodSettings, PointCloud, PointSource};
