//! Logistic regression engine
//!
//! - `config`: hyper-parameters ([`ModelConfig`])
//! - `input`: borrowed feature/label views
//! - `padded`: aligned, zero-padded copies fed to the kernels
//! - `logistic`: training and inference ([`LogisticRegression`])

pub mod config;
pub mod input;
pub mod logistic;
pub mod padded;

pub use config::{ModelConfig, DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE};
pub use input::{labels_from_shape, FeatureMatrix};
pub use logistic::{LogisticRegression, TrainingReport};
pub use padded::{padded_len, PaddedMatrix};
