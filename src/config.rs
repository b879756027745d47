//! Configuration structures for layers
//!
//! This module provides the JSON description of a single layer: its shape,
//! activation, initialization seed and execution policy.

use crate::error::{LayerError, Result};
use crate::layers::MlpLayer;
use crate::utils::activations::ActivationKind;
use crate::utils::parallel::Execution;
use crate::utils::rng::SimpleRng;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Seed used when a configuration does not name one.
pub const DEFAULT_SEED: u64 = 42;

/// Configuration for one fully-connected layer.
///
/// `execution` is optional and defaults to parallel loops with the default
/// threshold. It takes either `"sequential"` or
/// `{"parallel": {"min_len": N}}`.
///
/// Activation names: "sigmoid", "tanh", "relu", "linear", "leaky_relu".
///
/// # Example
///
/// ```json
/// {
///   "previous_count": 784,
///   "current_count": 128,
///   "activation": "sigmoid",
///   "seed": 7,
///   "execution": { "parallel": { "min_len": 4096 } }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    /// Width of the previous layer (`P`)
    pub previous_count: usize,

    /// Width of this layer (`C`)
    pub current_count: usize,

    /// Activation function name
    pub activation: String,

    /// Seed for weight initialization (default 42)
    pub seed: Option<u64>,

    /// Loop execution policy
    pub execution: Option<Execution>,
}

impl LayerConfig {
    /// Activation tag named by the configuration.
    pub fn activation_kind(&self) -> Result<ActivationKind> {
        ActivationKind::from_name(&self.activation).ok_or_else(|| {
            LayerError::InvalidConfig(format!(
                "Invalid activation function '{}'. Must be one of: {}",
                self.activation,
                ActivationKind::known_names().collect::<Vec<_>>().join(", ")
            ))
        })
    }
}

/// Loads a layer configuration from a JSON file.
///
/// Reads the file at `path` and deserializes its JSON contents into a
/// `LayerConfig`, then validates it.
///
/// # Examples
///
/// ```no_run
/// use mlp_layer::config::load_config;
///
/// let cfg = load_config("config/hidden.json").unwrap();
/// assert!(cfg.current_count > 0);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<LayerConfig> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses and validates a layer configuration from a JSON string.
pub fn parse_config(contents: &str) -> Result<LayerConfig> {
    let config: LayerConfig = serde_json::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &LayerConfig) -> Result<()> {
    if config.previous_count == 0 || config.current_count == 0 {
        return Err(LayerError::InvalidConfig(
            "previous_count and current_count must be positive".to_string(),
        ));
    }

    config.activation_kind()?;

    if let Some(Execution::Parallel { min_len: 0 }) = config.execution {
        return Err(LayerError::InvalidConfig(
            "execution.parallel.min_len must be positive".to_string(),
        ));
    }

    Ok(())
}

/// Builds an allocated layer from a configuration.
///
/// A fresh [`SimpleRng`] is seeded from `config.seed`, so the same
/// configuration always yields the same initial weights.
pub fn build_layer(config: &LayerConfig) -> Result<MlpLayer> {
    validate_config(config)?;
    let mut layer = MlpLayer::with_standard(config.activation_kind()?);
    if let Some(execution) = config.execution {
        layer.set_execution(execution);
    }
    let mut rng = SimpleRng::new(config.seed.unwrap_or(DEFAULT_SEED));
    layer.allocate(config.previous_count, config.current_count, &mut rng)?;
    Ok(layer)
}
