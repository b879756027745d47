//! Error type for the fallible edges of the crate: buffer allocation,
//! persistence and configuration.
//!
//! Numerical operations are not in this list. Forward and backward passes
//! work on preconditions and panic when a caller breaks them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid layer dimensions {previous}x{current}: both must be positive")]
    InvalidDimensions { previous: i64, current: i64 },

    #[error("activation tag {0} is not supported by this layer's activation")]
    UnsupportedActivation(u8),

    #[error("layer is not allocated")]
    NotAllocated,

    #[error("layer dimension {0} does not fit the 32-bit record header")]
    DimensionOverflow(usize),

    #[error("failed to allocate {elements} elements for layer buffers")]
    Allocation { elements: usize },
}

pub type Result<T> = std::result::Result<T, LayerError>;
