//! Model hyper-parameters
//!
//! [`ModelConfig`] fixes the feature count and the gradient-descent
//! schedule of a [`super::LogisticRegression`] at construction time.

use serde::{Deserialize, Serialize};

use crate::config_error;
use crate::error::ForgeResult;

/// Default gradient-descent step size
pub const DEFAULT_LEARNING_RATE: f32 = 0.1;

/// Default number of full-batch epochs per `train` call
pub const DEFAULT_EPOCHS: usize = 1000;

/// Configuration for a logistic regression model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of input features per sample
    pub n_features: usize,

    /// Step size applied to the mean gradient
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,

    /// Full-batch iterations per `train` call
    #[serde(default = "default_epochs")]
    pub epochs: usize,
}

fn default_learning_rate() -> f32 {
    DEFAULT_LEARNING_RATE
}

fn default_epochs() -> usize {
    DEFAULT_EPOCHS
}

impl ModelConfig {
    /// Config with default learning rate and epochs
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            learning_rate: DEFAULT_LEARNING_RATE,
            epochs: DEFAULT_EPOCHS,
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Reject configurations training cannot run with
    pub fn validate(&self) -> ForgeResult<()> {
        if self.n_features == 0 {
            return Err(config_error!("n_features must be > 0"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(config_error!(
                "learning_rate must be finite and > 0, got {}",
                self.learning_rate
            ));
        }
        if self.epochs == 0 {
            return Err(config_error!("epochs must be > 0"));
        }
        Ok(())
    }
}
