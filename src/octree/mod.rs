//! LOD octree over a static point set.
//!
//! A rebuild partitions the source's bounding cube recursively. Each node
//! keeps the points inside its box (shared-face points go to the first
//! sibling that claims them), discards itself when fewer than the minimum
//! remain, and caches a sampled index list for its LOD. The root's eight
//! children are built in parallel; everything below them is sequential.

pub mod build;
pub mod cache;
pub mod lod;
pub mod node;
pub mod reservation;
pub mod stats;
pub mod tree;

pub use cache::{IndexCache, PrimitiveEncoding};
pub use node::OctreeNode;
pub use stats::DepthStats;
pub use tree::{Nodes, PointOctree, MAX_LOD_LEVELS};
