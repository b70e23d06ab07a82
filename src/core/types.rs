//! Core type aliases and re-exports

pub use glam::{Affine3A, Mat3, Quat, Vec3, Vec3A};

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
