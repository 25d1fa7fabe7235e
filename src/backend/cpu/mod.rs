//! CPU backend module
//!
//! Host capability detection for the SIMD kernel tiers.

pub mod cpu_features;

pub use cpu_features::{CpuArch, CpuFeatures};
