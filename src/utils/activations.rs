//! Activation functions for neural network layers
//!
//! A layer does not choose its nonlinearity itself. It persists a one-byte
//! [`ActivationKind`] tag and calls into an injected [`Activation`]
//! capability for `f(net)` and `f'(output)`. Derivatives are always expressed
//! in terms of the already-computed output, never the pre-activation input.
//!
//! [`StandardActivation`] implements the named tags below:
//! - Sigmoid (tag 0)
//! - Tanh (tag 1)
//! - ReLU (tag 2)
//! - Linear (tag 3)
//! - Leaky ReLU (tag 4)

use crate::utils::precision::{Accum, Float};
use std::fmt;

/// Slope of the leaky ReLU on the negative side.
pub const LEAKY_RELU_ALPHA: Accum = 0.01;

/// Persisted one-byte tag selecting a layer's activation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivationKind(pub u8);

impl ActivationKind {
    pub const SIGMOID: Self = Self(0);
    pub const TANH: Self = Self(1);
    pub const RELU: Self = Self(2);
    pub const LINEAR: Self = Self(3);
    pub const LEAKY_RELU: Self = Self(4);

    const NAMED: [(Self, &'static str); 5] = [
        (Self::SIGMOID, "sigmoid"),
        (Self::TANH, "tanh"),
        (Self::RELU, "relu"),
        (Self::LINEAR, "linear"),
        (Self::LEAKY_RELU, "leaky_relu"),
    ];

    /// Raw tag as written to disk.
    pub fn tag(self) -> u8 {
        self.0
    }

    /// Look up a named tag ("sigmoid", "tanh", "relu", "linear", "leaky_relu").
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        Self::NAMED
            .iter()
            .find(|(_, n)| *n == lower)
            .map(|(kind, _)| *kind)
    }

    /// Name of a known tag, `None` for tags outside the standard set.
    pub fn name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, n)| *n)
    }

    /// All names accepted by [`ActivationKind::from_name`].
    pub fn known_names() -> impl Iterator<Item = &'static str> {
        Self::NAMED.iter().map(|(_, n)| *n)
    }
}

impl Default for ActivationKind {
    fn default() -> Self {
        Self::SIGMOID
    }
}

impl From<u8> for ActivationKind {
    fn from(tag: u8) -> Self {
        Self(tag)
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "tag {}", self.0),
        }
    }
}

/// Activation capability injected into a layer.
///
/// Implementations must be shareable across rayon worker threads.
pub trait Activation: Send + Sync {
    /// Apply the activation selected by `kind` to a net input.
    fn activate(&self, kind: ActivationKind, net: Accum) -> Float;

    /// Derivative of the activation selected by `kind`, given the
    /// activation's own output `y = f(net)`.
    fn derivative(&self, kind: ActivationKind, output: Float) -> Accum;

    /// Whether `kind` names a function this capability implements.
    fn supports(&self, kind: ActivationKind) -> bool;
}

/// Built-in capability covering the named [`ActivationKind`] tags.
///
/// Unknown tags behave as the identity function.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardActivation;

impl Activation for StandardActivation {
    fn activate(&self, kind: ActivationKind, net: Accum) -> Float {
        let y = match kind {
            ActivationKind::SIGMOID => sigmoid(net),
            ActivationKind::TANH => net.tanh(),
            ActivationKind::RELU => relu(net),
            ActivationKind::LEAKY_RELU => leaky_relu(net),
            _ => net,
        };
        y as Float
    }

    fn derivative(&self, kind: ActivationKind, output: Float) -> Accum {
        let y = Accum::from(output);
        match kind {
            ActivationKind::SIGMOID => sigmoid_derivative(y),
            ActivationKind::TANH => tanh_derivative(y),
            ActivationKind::RELU => relu_derivative(y),
            ActivationKind::LEAKY_RELU => leaky_relu_derivative(y),
            _ => 1.0,
        }
    }

    fn supports(&self, kind: ActivationKind) -> bool {
        kind.name().is_some()
    }
}

/// Sigmoid activation function.
///
/// Returns the sigmoid of the input: 1 / (1 + exp(-x))
pub fn sigmoid(x: Accum) -> Accum {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative assuming y = sigmoid(z).
///
/// Returns the derivative: y * (1 - y)
pub fn sigmoid_derivative(y: Accum) -> Accum {
    y * (1.0 - y)
}

/// Tanh derivative assuming y = tanh(z): 1 - y²
pub fn tanh_derivative(y: Accum) -> Accum {
    1.0 - y * y
}

pub fn relu(x: Accum) -> Accum {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

/// ReLU derivative in terms of the output; zero at the kink.
pub fn relu_derivative(y: Accum) -> Accum {
    if y > 0.0 {
        1.0
    } else {
        0.0
    }
}

pub fn leaky_relu(x: Accum) -> Accum {
    if x > 0.0 {
        x
    } else {
        LEAKY_RELU_ALPHA * x
    }
}

/// Leaky ReLU derivative in terms of the output. The output keeps the sign
/// of the net input, so the branch can be taken on `y`.
pub fn leaky_relu_derivative(y: Accum) -> Accum {
    if y > 0.0 {
        1.0
    } else {
        LEAKY_RELU_ALPHA
    }
}
