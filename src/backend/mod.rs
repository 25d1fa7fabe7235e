//! Execution backends
//!
//! Only the host CPU is targeted; its SIMD capabilities decide which
//! kernel tier runs.

pub mod cpu;

pub use cpu::{CpuArch, CpuFeatures};
