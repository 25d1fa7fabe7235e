//! Aligned host memory for the SIMD kernels
//!
//! Every buffer the kernels read or write goes through [`AlignedBuffer`]:
//! model weights, padded feature copies, logits and sigmoid outputs.
//! 16-byte alignment serves the 128-bit tier, 32-byte alignment the
//! 256-bit tiers.

pub mod aligned;

pub use aligned::{is_aligned, AlignedBuffer, MemoryError, MemoryResult};
