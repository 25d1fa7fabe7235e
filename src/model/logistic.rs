//! Binary logistic regression trained by full-batch gradient descent
//!
//! Every numeric step goes through the model's [`KernelDispatcher`]: one
//! dot product per sample for the logits, one vectorized sigmoid over all
//! logits per epoch. Weights live in a 32-byte aligned buffer of
//! `padded_features` floats whose padding lanes stay zero, so the padded
//! rows of a [`PaddedMatrix`] can be fed to any tier as whole vectors.

use serde::{Deserialize, Serialize};

use crate::dispatch::{self, KernelDispatcher};
use crate::error::{ForgeResult, LogForgeError};
use crate::kernels::sigmoid_f32;
use crate::memory::AlignedBuffer;
use crate::shape_error;

use super::config::ModelConfig;
use super::input::FeatureMatrix;
use super::padded::{padded_len, PaddedMatrix, PAD_ALIGNMENT};

/// Probability clamp for the log-loss
const LOSS_EPS: f32 = 1e-7;

/// Summary of one `train` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs: usize,
    pub n_samples: usize,
    /// Mean binary cross-entropy of the last epoch's predictions
    pub final_loss: f32,
}

pub struct LogisticRegression {
    config: ModelConfig,
    padded_features: usize,
    weights: AlignedBuffer,
    bias: f32,
    dispatcher: KernelDispatcher,
}

impl LogisticRegression {
    /// Build a zero-initialized model on the process-wide kernels
    ///
    /// # Errors
    /// - `KernelsNotInitialized` before [`dispatch::init_kernels`]
    /// - `InvalidConfiguration` if `config` fails validation
    /// - `Memory` if the weight buffer cannot be allocated
    pub fn new(config: ModelConfig) -> ForgeResult<Self> {
        let dispatcher = *dispatch::kernels()?;
        Self::with_dispatcher(config, dispatcher)
    }

    /// Build a zero-initialized model on an explicit dispatcher
    pub fn with_dispatcher(config: ModelConfig, dispatcher: KernelDispatcher) -> ForgeResult<Self> {
        config.validate()?;

        let padded_features = padded_len(config.n_features);
        let weights = AlignedBuffer::zeroed(padded_features, PAD_ALIGNMENT)?;

        tracing::debug!(
            n_features = config.n_features,
            padded_features,
            learning_rate = config.learning_rate,
            epochs = config.epochs,
            "LogisticRegression created"
        );

        Ok(Self {
            config,
            padded_features,
            weights,
            bias: 0.0,
            dispatcher,
        })
    }

    /// Run `epochs` full-batch gradient descent steps on `(x, y)`
    ///
    /// Continues from the current parameters. Inputs are validated before
    /// any numeric work, and parameters change only if the whole call
    /// succeeds.
    ///
    /// # Errors
    /// - `FeatureCountMismatch` if `x.cols() != n_features`
    /// - `SampleCountMismatch` if `y.len() != x.rows()`
    /// - `InvalidShape` if `x` has no rows
    /// - `InvalidLabel` for any label other than 0 or 1
    /// - `Memory` / `Kernel` if a buffer or kernel call fails
    pub fn train(&mut self, x: &FeatureMatrix<'_>, y: &[i32]) -> ForgeResult<TrainingReport> {
        self.check_features(x.cols())?;
        check_labels(x.rows(), y)?;
        if x.is_empty() {
            return Err(shape_error!("training requires at least one sample"));
        }

        let n_samples = x.rows();
        let n_features = self.config.n_features;
        let epochs = self.config.epochs;
        let dispatcher = self.dispatcher;

        tracing::debug!(
            n_samples,
            n_features,
            epochs,
            dot_tier = %dispatcher.dot_tier(),
            sigmoid_tier = %dispatcher.sigmoid_tier(),
            "training started"
        );

        let padded = PaddedMatrix::from_features(x)?;
        let mut weights = AlignedBuffer::from_slice(&self.weights, PAD_ALIGNMENT)?;
        let mut bias = self.bias;
        let mut logits = AlignedBuffer::zeroed(n_samples, PAD_ALIGNMENT)?;
        let mut dw = vec![0.0f32; n_features];

        let inv_n = 1.0 / n_samples as f32;
        let step = self.config.learning_rate * inv_n;
        let mut final_loss = f32::NAN;

        for epoch in 0..epochs {
            for (i, z) in logits.iter_mut().enumerate() {
                *z = dispatcher.dot_product(padded.row(i), &weights)? + bias;
            }
            let probs = dispatcher.sigmoid(&logits)?;

            dw.fill(0.0);
            let mut db = 0.0f32;
            for (i, (&p, &label)) in probs.iter().zip(y.iter()).enumerate() {
                let error = p - label as f32;
                // Padding columns are zero and never contribute
                for (g, &xv) in dw.iter_mut().zip(&padded.row(i)[..n_features]) {
                    *g += error * xv;
                }
                db += error;
            }

            for (w, &g) in weights[..n_features].iter_mut().zip(dw.iter()) {
                *w -= step * g;
            }
            bias -= step * db;

            if epoch + 1 == epochs {
                final_loss = log_loss(&probs, y);
            }
        }

        self.weights = weights;
        self.bias = bias;

        tracing::info!(n_samples, epochs, final_loss, "training finished");

        Ok(TrainingReport {
            epochs,
            n_samples,
            final_loss,
        })
    }

    /// Probability that sample `x` belongs to class 1
    pub fn predict(&self, x: &[f32]) -> ForgeResult<f32> {
        self.check_features(x.len())?;

        let mut scratch = AlignedBuffer::zeroed(self.padded_features, PAD_ALIGNMENT)?;
        scratch[..x.len()].copy_from_slice(x);

        let z = self.dispatcher.dot_product(&scratch, &self.weights)? + self.bias;
        Ok(sigmoid_f32(z))
    }

    /// Class of sample `x`: 1 if its probability is at least 0.5
    pub fn predict_class(&self, x: &[f32]) -> ForgeResult<i32> {
        Ok(threshold(self.predict(x)?))
    }

    /// Class-1 probabilities for every row of `x`
    pub fn predict_batch(&self, x: &FeatureMatrix<'_>) -> ForgeResult<Vec<f32>> {
        Ok(self.batch_probabilities(x)?.to_vec())
    }

    /// Classes for every row of `x`
    pub fn predict_class_batch(&self, x: &FeatureMatrix<'_>) -> ForgeResult<Vec<i32>> {
        let probs = self.batch_probabilities(x)?;
        Ok(probs.iter().copied().map(threshold).collect())
    }

    /// Fraction of rows whose predicted class equals the label
    pub fn accuracy(&self, x: &FeatureMatrix<'_>, y: &[i32]) -> ForgeResult<f32> {
        self.check_features(x.cols())?;
        check_labels(x.rows(), y)?;
        if x.is_empty() {
            return Err(shape_error!("accuracy requires at least one sample"));
        }

        let classes = self.predict_class_batch(x)?;
        let correct = classes.iter().zip(y).filter(|(p, l)| p == l).count();
        Ok(correct as f32 / y.len() as f32)
    }

    /// Logits through the dot tier, probabilities through one sigmoid call
    fn batch_probabilities(&self, x: &FeatureMatrix<'_>) -> ForgeResult<AlignedBuffer> {
        self.check_features(x.cols())?;

        let padded = PaddedMatrix::from_features(x)?;
        let mut logits = AlignedBuffer::zeroed(x.rows(), PAD_ALIGNMENT)?;
        for (i, z) in logits.iter_mut().enumerate() {
            *z = self.dispatcher.dot_product(padded.row(i), &self.weights)? + self.bias;
        }
        Ok(self.dispatcher.sigmoid(&logits)?)
    }

    fn check_features(&self, actual: usize) -> ForgeResult<()> {
        if actual == self.config.n_features {
            Ok(())
        } else {
            Err(LogForgeError::FeatureCountMismatch {
                expected: self.config.n_features,
                actual,
            })
        }
    }

    pub fn n_features(&self) -> usize {
        self.config.n_features
    }

    pub fn padded_features(&self) -> usize {
        self.padded_features
    }

    /// All `padded_features` weights; entries past `n_features` are zero
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    pub fn learning_rate(&self) -> f32 {
        self.config.learning_rate
    }

    pub fn epochs(&self) -> usize {
        self.config.epochs
    }

    pub fn dispatcher(&self) -> &KernelDispatcher {
        &self.dispatcher
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl std::fmt::Debug for LogisticRegression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogisticRegression")
            .field("n_features", &self.config.n_features)
            .field("padded_features", &self.padded_features)
            .field("bias", &self.bias)
            .field("dot_tier", &self.dispatcher.dot_tier())
            .field("sigmoid_tier", &self.dispatcher.sigmoid_tier())
            .finish()
    }
}

#[inline]
fn threshold(p: f32) -> i32 {
    if p >= 0.5 {
        1
    } else {
        0
    }
}

fn check_labels(n_samples: usize, y: &[i32]) -> ForgeResult<()> {
    if y.len() != n_samples {
        return Err(LogForgeError::SampleCountMismatch {
            samples: n_samples,
            labels: y.len(),
        });
    }
    match y.iter().position(|&label| label != 0 && label != 1) {
        Some(index) => Err(LogForgeError::InvalidLabel {
            index,
            value: y[index],
        }),
        None => Ok(()),
    }
}

/// Mean binary cross-entropy
fn log_loss(probs: &[f32], y: &[i32]) -> f32 {
    let total: f32 = probs
        .iter()
        .zip(y)
        .map(|(&p, &label)| {
            let p = p.clamp(LOSS_EPS, 1.0 - LOSS_EPS);
            if label == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / probs.len().max(1) as f32
}
