//! Layer abstractions for feed-forward networks
//!
//! This module provides the Layer trait, the fully-connected [`MlpLayer`]
//! and its binary weight record.

mod r#trait;
pub mod mlp;
pub mod persist;

// Re-export the Layer trait for convenience
pub use r#trait::Layer;
pub use mlp::MlpLayer;
