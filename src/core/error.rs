//! Error types for octree construction and settings loading

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("point source reports no LOD levels (maximum LOD would be negative)")]
    NoLodLevels,

    #[error("{requested} LOD levels requested, at most {max} are supported")]
    TooManyLodLevels { requested: u32, max: u32 },

    #[error("point id {id} is outside the reservation range (capacity {capacity})")]
    PointIdOutOfRange { id: u32, capacity: usize },

    #[error("sprite indices for point id {id} overflow u32")]
    IndexOverflow { id: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Json(#[from] serde_json::Error),
}
