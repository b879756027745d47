//! Shared utilities for the layer implementation
//!
//! Random initialization, activation functions, numeric precisions and the
//! execution policy for data-parallel loops.

pub mod activations;
pub mod parallel;
pub mod precision;
pub mod rng;

pub use activations::{Activation, ActivationKind, StandardActivation};
pub use parallel::Execution;
pub use precision::{Accum, Float};
pub use rng::SimpleRng;
