//! logforge - binary logistic regression on runtime-dispatched SIMD kernels
//!
//! At startup [`init_kernels`] inspects the host CPU and binds the dot
//! product and sigmoid primitives to the fastest supported tier (scalar,
//! SSE, AVX, or AVX2 + FMA). [`LogisticRegression`] trains and predicts
//! exclusively through that selection, on 32-byte aligned buffers.
//!
//! ```no_run
//! use logforge::{init_kernels, FeatureMatrix, LogisticRegression, ModelConfig};
//!
//! # fn main() -> logforge::ForgeResult<()> {
//! init_kernels();
//! let data = [0.0, 0.0, 1.0, 1.0];
//! let x = FeatureMatrix::new(&data, 2, 2)?;
//! let mut model = LogisticRegression::new(ModelConfig::new(2))?;
//! model.train(&x, &[0, 1])?;
//! let p = model.predict(&[1.0, 1.0])?;
//! # Ok(())
//! # }
//! ```

#![allow(clippy::missing_safety_doc)]

pub mod backend;
pub mod dispatch;
pub mod error;
pub mod kernels;
pub mod logging;
pub mod memory;
pub mod model;

pub use backend::cpu::{CpuArch, CpuFeatures};
pub use dispatch::{init_kernels, kernels, KernelDispatcher};
pub use error::{ErrorCategory, ForgeResult, LogForgeError};
pub use kernels::{KernelError, KernelResult, KernelTier};
pub use logging::{init_logging_default, init_logging_from_env, init_with_config, LoggingConfig};
pub use memory::{AlignedBuffer, MemoryError};
pub use model::{FeatureMatrix, LogisticRegression, ModelConfig, TrainingReport};
