//! Mathematical utilities and data structures

pub mod aabb;
pub mod bounds;

pub use aabb::Aabb;
pub use bounds::NodeBounds;
