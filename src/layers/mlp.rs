//! Fully-connected layer with error back-propagation
//!
//! This module provides [`MlpLayer`], which transforms an input vector of
//! size `P` into an output vector of size `C`:
//!
//! ```text
//! output[k] = f( Σ_i W[k][i] · input[i] + b[k] )
//! ```
//!
//! `W` is stored row-major by output neuron. Parameters and activations use
//! the storage precision [`Float`]; deltas and the gradient accumulators
//! `dW`/`db` use the wider [`Accum`] so that long runs of accumulation lose
//! less to rounding.
//!
//! Gradients are only ever added to. Applying them to `W`/`b` and zeroing
//! the accumulators between steps is the optimizer's job.

use crate::error::{LayerError, Result};
use crate::layers::Layer;
use crate::utils::activations::{Activation, ActivationKind, StandardActivation};
use crate::utils::parallel::{self, Execution};
use crate::utils::precision::{Accum, Float};
use crate::utils::SimpleRng;
use log::{debug, trace, warn};
use std::fmt;
use std::sync::Arc;

/// Every buffer a layer owns. A layer holds either all of them or none.
#[derive(Debug, Clone)]
pub(crate) struct LayerBuffers {
    pub(crate) previous: usize,
    pub(crate) current: usize,
    pub(crate) weights: Vec<Float>,
    pub(crate) biases: Vec<Float>,
    pub(crate) weight_gradients: Vec<Accum>,
    pub(crate) bias_gradients: Vec<Accum>,
    pub(crate) output: Vec<Float>,
    pub(crate) delta: Vec<Accum>,
}

fn zeroed<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| LayerError::Allocation { elements: len })?;
    buffer.resize(len, T::default());
    Ok(buffer)
}

impl LayerBuffers {
    /// Zero-filled buffers for a `previous → current` layer.
    pub(crate) fn zeroed(previous: usize, current: usize) -> Result<Self> {
        if previous == 0 || current == 0 {
            return Err(LayerError::InvalidDimensions {
                previous: previous as i64,
                current: current as i64,
            });
        }
        let count = previous
            .checked_mul(current)
            .ok_or(LayerError::Allocation {
                elements: usize::MAX,
            })?;

        Ok(Self {
            previous,
            current,
            weights: zeroed(count)?,
            biases: zeroed(current)?,
            weight_gradients: zeroed(count)?,
            bias_gradients: zeroed(current)?,
            output: zeroed(current)?,
            delta: zeroed(current)?,
        })
    }

    /// `dW[k][j] += -delta[k] * input[j]` and `db[k] += -delta[k]`.
    fn accumulate_gradients(&mut self, input: &[Float], execution: Execution) {
        let delta = &self.delta;

        parallel::for_each_row(
            &mut self.weight_gradients,
            self.previous,
            execution,
            |k, row| {
                let d = delta[k];
                for (grad, &x) in row.iter_mut().zip(input) {
                    *grad += -(d * Accum::from(x));
                }
            },
        );

        parallel::for_each_slot(&mut self.bias_gradients, 1, execution, |k, grad| {
            *grad += -delta[k];
        });
    }
}

/// One fully-connected layer.
///
/// # Example
///
/// ```
/// use mlp_layer::layers::{Layer, MlpLayer};
/// use mlp_layer::utils::{ActivationKind, SimpleRng};
///
/// let mut rng = SimpleRng::new(42);
/// let mut layer = MlpLayer::with_standard(ActivationKind::SIGMOID);
/// layer.allocate(3, 2, &mut rng).unwrap();
///
/// let input = [0.5, -1.0, 2.0];
/// let output = layer.forward(&input);
/// assert_eq!(output.len(), 2);
/// ```
#[derive(Clone)]
pub struct MlpLayer {
    activation: Arc<dyn Activation>,
    kind: ActivationKind,
    execution: Execution,
    pub(crate) buffers: Option<LayerBuffers>,
}

impl MlpLayer {
    /// Create an empty (unallocated) layer using `activation` for tag `kind`.
    pub fn new(activation: Arc<dyn Activation>, kind: ActivationKind) -> Self {
        Self {
            activation,
            kind,
            execution: Execution::default(),
            buffers: None,
        }
    }

    /// Create an empty layer backed by [`StandardActivation`].
    pub fn with_standard(kind: ActivationKind) -> Self {
        Self::new(Arc::new(StandardActivation), kind)
    }

    /// Initialization scale `R = 2·√2·√(6 / (P + C))`; parameters are drawn
    /// from `[-R/2, R/2]`.
    pub fn init_range(previous: usize, current: usize) -> Accum {
        2.0 * Accum::sqrt(2.0) * (6.0 / (previous + current) as Accum).sqrt()
    }

    /// Size every buffer for a `previous → current` layer.
    ///
    /// Weights and biases are drawn uniformly from `[-R/2, R/2]` (see
    /// [`MlpLayer::init_range`]) using `rng`; gradients, outputs and deltas
    /// start at zero. Any buffers held from an earlier allocation are
    /// released first.
    ///
    /// The generator is not reseeded here. Pass one generator, seeded once,
    /// to every layer of a network to get independent, reproducible streams.
    pub fn allocate(&mut self, previous: usize, current: usize, rng: &mut SimpleRng) -> Result<()> {
        let mut buffers = LayerBuffers::zeroed(previous, current)?;

        let range = Self::init_range(previous, current);
        let half = range / 2.0;
        for (row, bias) in buffers
            .weights
            .chunks_exact_mut(previous)
            .zip(buffers.biases.iter_mut())
        {
            for weight in row.iter_mut() {
                *weight = rng.gen_range(-half, half) as Float;
            }
            *bias = rng.gen_range(-half, half) as Float;
        }

        debug!(
            "allocated {}x{} layer ({}), init range ±{:.6}",
            previous, current, self.kind, half
        );
        self.buffers = Some(buffers);
        Ok(())
    }

    /// Release every owned buffer. Safe to call repeatedly and on a layer that
    /// was never allocated.
    pub fn delete(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            debug!(
                "released {}x{} layer",
                buffers.previous, buffers.current
            );
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.buffers.is_some()
    }

    /// `P`, or 0 when unallocated.
    pub fn previous_count(&self) -> usize {
        self.buffers.as_ref().map_or(0, |b| b.previous)
    }

    /// `C`, or 0 when unallocated.
    pub fn current_count(&self) -> usize {
        self.buffers.as_ref().map_or(0, |b| b.current)
    }

    pub fn activation_kind(&self) -> ActivationKind {
        self.kind
    }

    pub fn activation(&self) -> &Arc<dyn Activation> {
        &self.activation
    }

    pub(crate) fn set_activation_kind(&mut self, kind: ActivationKind) {
        self.kind = kind;
    }

    pub fn execution(&self) -> Execution {
        self.execution
    }

    pub fn set_execution(&mut self, execution: Execution) {
        self.execution = execution;
    }

    /// Weights and biases.
    pub fn parameter_count(&self) -> usize {
        self.buffers
            .as_ref()
            .map_or(0, |b| b.weights.len() + b.biases.len())
    }

    pub fn weights(&self) -> &[Float] {
        self.buffers.as_ref().map_or(&[][..], |b| &b.weights[..])
    }

    pub fn weights_mut(&mut self) -> &mut [Float] {
        self.buffers
            .as_mut()
            .map_or(Default::default(), |b| &mut b.weights[..])
    }

    pub fn biases(&self) -> &[Float] {
        self.buffers.as_ref().map_or(&[][..], |b| &b.biases[..])
    }

    pub fn biases_mut(&mut self) -> &mut [Float] {
        self.buffers
            .as_mut()
            .map_or(Default::default(), |b| &mut b.biases[..])
    }

    /// Accumulated `dW`, same layout as [`MlpLayer::weights`].
    pub fn weight_gradients(&self) -> &[Accum] {
        self.buffers
            .as_ref()
            .map_or(&[][..], |b| &b.weight_gradients[..])
    }

    /// Mutable `dW`, for the optimizer to apply and reset.
    pub fn weight_gradients_mut(&mut self) -> &mut [Accum] {
        self.buffers
            .as_mut()
            .map_or(Default::default(), |b| &mut b.weight_gradients[..])
    }

    pub fn bias_gradients(&self) -> &[Accum] {
        self.buffers
            .as_ref()
            .map_or(&[][..], |b| &b.bias_gradients[..])
    }

    pub fn bias_gradients_mut(&mut self) -> &mut [Accum] {
        self.buffers
            .as_mut()
            .map_or(Default::default(), |b| &mut b.bias_gradients[..])
    }

    pub fn delta(&self) -> &[Accum] {
        self.buffers.as_ref().map_or(&[][..], |b| &b.delta[..])
    }

    /// Activations from the last forward pass.
    pub fn output(&self) -> &[Float] {
        self.buffers.as_ref().map_or(&[][..], |b| &b.output[..])
    }

    /// Index of the largest output. Ties go to the lowest index.
    pub fn max_output_index(&self) -> usize {
        let output = self.output();
        let mut max_idx = 0;
        for (idx, &value) in output.iter().enumerate().skip(1) {
            if value > output[max_idx] {
                max_idx = idx;
            }
        }
        max_idx
    }

    /// Thresholded output of a single-neuron layer: 1.0 if the output is
    /// strictly above 0.5, else 0.0. Layers of any other width return 0.0.
    pub fn binary_output(&self) -> Float {
        match self.output() {
            [y] if *y > 0.5 => 1.0,
            [_] => 0.0,
            other => {
                warn!(
                    "binary_output called on a layer with {} outputs",
                    other.len()
                );
                0.0
            }
        }
    }
}

impl Layer for MlpLayer {
    fn input_size(&self) -> usize {
        self.previous_count()
    }

    fn output_size(&self) -> usize {
        self.current_count()
    }

    fn parameter_count(&self) -> usize {
        MlpLayer::parameter_count(self)
    }

    fn weights(&self) -> &[Float] {
        MlpLayer::weights(self)
    }

    fn delta(&self) -> &[Accum] {
        MlpLayer::delta(self)
    }

    fn output(&self) -> &[Float] {
        MlpLayer::output(self)
    }

    fn forward(&mut self, input: &[Float]) -> &[Float] {
        let execution = self.execution;
        let kind = self.kind;
        let activation: &dyn Activation = &*self.activation;
        let Some(buffers) = self.buffers.as_mut() else {
            panic!("forward called on an unallocated layer");
        };

        let p = buffers.previous;
        let input = &input[..p];
        let weights = &buffers.weights;
        let biases = &buffers.biases;

        parallel::for_each_slot(&mut buffers.output, p, execution, |k, out| {
            let row = &weights[k * p..(k + 1) * p];
            let net = parallel::reduce_sum(p, execution, |i| {
                Accum::from(input[i]) * Accum::from(row[i])
            });
            *out = activation.activate(kind, net + Accum::from(biases[k]));
        });

        trace!("forward {}x{} ({})", p, buffers.current, kind);
        &buffers.output
    }

    fn backward_output(&mut self, input: &[Float], desired: &[Float]) {
        let execution = self.execution;
        let kind = self.kind;
        let activation: &dyn Activation = &*self.activation;
        let Some(buffers) = self.buffers.as_mut() else {
            panic!("backward_output called on an unallocated layer");
        };

        let desired = &desired[..buffers.current];
        let output = &buffers.output;
        parallel::for_each_slot(&mut buffers.delta, 1, execution, |k, delta| {
            let y = output[k];
            *delta = activation.derivative(kind, y) * (Accum::from(desired[k]) - Accum::from(y));
        });

        buffers.accumulate_gradients(&input[..buffers.previous], execution);
        trace!("backward (output) {}x{}", buffers.previous, buffers.current);
    }

    fn backward_hidden(&mut self, input: &[Float], next: &dyn Layer) {
        let execution = self.execution;
        let kind = self.kind;
        let activation: &dyn Activation = &*self.activation;
        let Some(buffers) = self.buffers.as_mut() else {
            panic!("backward_hidden called on an unallocated layer");
        };

        // `next` follows this layer in the forward direction; its weight rows
        // are indexed by its own neurons k and columns by ours j.
        let c = buffers.current;
        debug_assert_eq!(
            next.input_size(),
            c,
            "next layer's input width must match this layer's output width"
        );
        let next_count = next.output_size();
        let next_weights = next.weights();
        let next_delta = next.delta();
        let output = &buffers.output;

        parallel::for_each_slot(&mut buffers.delta, next_count, execution, |j, delta| {
            let previous_sum = parallel::reduce_sum(next_count, execution, |k| {
                next_delta[k] * Accum::from(next_weights[k * c + j])
            });
            *delta = activation.derivative(kind, output[j]) * previous_sum;
        });

        buffers.accumulate_gradients(&input[..buffers.previous], execution);
        trace!("backward (hidden) {}x{}", buffers.previous, c);
    }
}

impl fmt::Debug for MlpLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MlpLayer")
            .field("previous", &self.previous_count())
            .field("current", &self.current_count())
            .field("kind", &self.kind)
            .field("execution", &self.execution)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_with_outputs(outputs: &[Float]) -> MlpLayer {
        let mut rng = SimpleRng::new(42);
        let mut layer = MlpLayer::with_standard(ActivationKind::SIGMOID);
        layer.allocate(1, outputs.len(), &mut rng).unwrap();
        layer
            .buffers
            .as_mut()
            .unwrap()
            .output
            .copy_from_slice(outputs);
        layer
    }

    #[test]
    fn test_allocate_sizes_and_zeroes() {
        let mut rng = SimpleRng::new(42);
        let mut layer = MlpLayer::with_standard(ActivationKind::SIGMOID);
        layer.allocate(10, 5, &mut rng).unwrap();

        assert_eq!(layer.previous_count(), 10);
        assert_eq!(layer.current_count(), 5);
        assert_eq!(layer.weights().len(), 50);
        assert_eq!(layer.biases().len(), 5);
        assert_eq!(layer.parameter_count(), 55);
        assert!(layer.weight_gradients().iter().all(|&g| g == 0.0));
        assert!(layer.bias_gradients().iter().all(|&g| g == 0.0));
        assert!(layer.delta().iter().all(|&d| d == 0.0));
        assert!(layer.output().iter().all(|&y| y == 0.0));
    }

    #[test]
    fn test_init_range_bounds_parameters() {
        let mut rng = SimpleRng::new(42);
        let mut layer = MlpLayer::with_standard(ActivationKind::TANH);
        layer.allocate(100, 50, &mut rng).unwrap();

        // R = 2·√2·√(6/150) = 0.5657; half-width 0.2828
        let half = (MlpLayer::init_range(100, 50) / 2.0) as Float;
        assert!((half - 0.282_842_7).abs() < 1e-5);
        for &w in layer.weights().iter().chain(layer.biases()) {
            assert!(w >= -half && w <= half, "{w} outside ±{half}");
        }
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let mut rng = SimpleRng::new(1);
        let mut layer = MlpLayer::with_standard(ActivationKind::SIGMOID);
        assert!(matches!(
            layer.allocate(0, 3, &mut rng),
            Err(LayerError::InvalidDimensions { .. })
        ));
        assert!(!layer.is_allocated());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut rng = SimpleRng::new(42);
        let mut layer = MlpLayer::with_standard(ActivationKind::SIGMOID);
        layer.delete();
        assert!(!layer.is_allocated());

        layer.allocate(3, 2, &mut rng).unwrap();
        layer.delete();
        layer.delete();
        assert!(!layer.is_allocated());
        assert!(layer.weights().is_empty());
        assert!(layer.weights_mut().is_empty());
        assert!(layer.delta().is_empty());
        assert_eq!(layer.current_count(), 0);
    }

    #[test]
    fn test_max_output_index_ties() {
        assert_eq!(layer_with_outputs(&[0.3, 0.3, 0.3]).max_output_index(), 0);
        assert_eq!(layer_with_outputs(&[0.1, 0.9, 0.9]).max_output_index(), 1);
        assert_eq!(layer_with_outputs(&[0.1, 0.2, 0.7]).max_output_index(), 2);
    }

    #[test]
    fn test_binary_output() {
        assert_eq!(layer_with_outputs(&[0.51]).binary_output(), 1.0);
        assert_eq!(layer_with_outputs(&[0.5]).binary_output(), 0.0);
        assert_eq!(layer_with_outputs(&[0.9, 0.9]).binary_output(), 0.0);
        let empty = MlpLayer::with_standard(ActivationKind::SIGMOID);
        assert_eq!(empty.binary_output(), 0.0);
        assert_eq!(empty.max_output_index(), 0);
    }

    #[test]
    #[should_panic(expected = "unallocated")]
    fn test_forward_unallocated_panics() {
        let mut layer = MlpLayer::with_standard(ActivationKind::SIGMOID);
        layer.forward(&[1.0]);
    }
}
