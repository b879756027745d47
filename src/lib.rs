//! Fully-connected feed-forward layer
//!
//! This library implements one layer of a multi-layer perceptron: forward
//! activation, error back-propagation for output and hidden layers, gradient
//! accumulation in a wider float type, and a fixed binary weight record.
//!
//! Sequencing layers, applying the accumulated gradients and loading data
//! are left to the caller.
//!
//! # Modules
//!
//! - `layers`: the Layer trait, `MlpLayer` and its binary record
//! - `utils`: precisions, activation capability, seeded RNG, execution policy
//! - `config`: JSON layer configuration
//! - `error`: error type for allocation, persistence and configuration

pub mod config;
pub mod error;
pub mod layers;
pub mod utils;

pub use error::{LayerError, Result};
pub use layers::{Layer, MlpLayer};
