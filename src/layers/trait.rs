//! Layer trait definition
//!
//! The trait is the seam between neighbouring layers. During
//! back-propagation a hidden layer only sees its successor through it,
//! reading the successor's weight matrix and freshly computed delta.

use crate::utils::precision::{Accum, Float};

/// Core trait for fully-connected layers.
///
/// # Example
///
/// ```ignore
/// // Forward pass through two layers
/// let hidden_out = hidden.forward(&input).to_vec();
/// output.forward(&hidden_out);
///
/// // Backward pass, output layer first
/// output.backward_output(&hidden_out, &target);
/// hidden.backward_hidden(&input, &output);
/// ```
pub trait Layer {
    /// Number of inputs per sample (`P`).
    fn input_size(&self) -> usize;

    /// Number of neurons (`C`).
    fn output_size(&self) -> usize;

    /// Total count of weights and biases.
    fn parameter_count(&self) -> usize {
        self.input_size() * self.output_size() + self.output_size()
    }

    /// Weight matrix, `C × P` row-major by output neuron.
    fn weights(&self) -> &[Float];

    /// Error signal from the most recent backward pass.
    fn delta(&self) -> &[Accum];

    /// Activations from the most recent forward pass.
    fn output(&self) -> &[Float];

    /// Forward propagation.
    ///
    /// Computes `f(W·input + b)` into the layer's output buffer and returns
    /// it. The buffer is reused, so the result is overwritten by the next
    /// call.
    ///
    /// # Panics
    ///
    /// Panics if the layer is unallocated or `input` is shorter than
    /// [`Layer::input_size`].
    fn forward(&mut self, input: &[Float]) -> &[Float];

    /// Backward propagation for a layer with known targets.
    ///
    /// `input` must be the slice given to the matching [`Layer::forward`]
    /// call. Gradients are added to the accumulators, never overwritten.
    fn backward_output(&mut self, input: &[Float], desired: &[Float]);

    /// Backward propagation for a hidden layer.
    ///
    /// `next` is the layer that follows this one in the forward direction
    /// and must already hold its delta for the current step, so layers are
    /// processed strictly in reverse order.
    fn backward_hidden(&mut self, input: &[Float], next: &dyn Layer);
}
