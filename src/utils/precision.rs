//! Numeric precisions used by the layer.
//!
//! Parameters and activations are stored in [`Float`]; every repeated
//! summation (net inputs, back-propagated error, gradient accumulators) runs
//! in [`Accum`].

/// Storage precision for weights, biases and activations.
#[cfg(not(feature = "double"))]
pub type Float = f32;

/// Storage precision for weights, biases and activations.
#[cfg(feature = "double")]
pub type Float = f64;

/// Accumulation precision for deltas and gradient buffers.
pub type Accum = f64;

/// Size in bytes of one serialized [`Float`].
pub const FLOAT_BYTES: usize = std::mem::size_of::<Float>();
