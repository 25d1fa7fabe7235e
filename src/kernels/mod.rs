//! Numeric kernels in four tiers
//!
//! This module organizes the two primitives the model is built on:
//! - `dot`: dot product (scalar, SSE, AVX, AVX2+FMA)
//! - `sigmoid`: elementwise logistic function into an aligned buffer
//! - `exp`: the range-reduced exponential the vector sigmoid tiers share
//!
//! [`dot_product`] and [`sigmoid`] are the checked entry points: they
//! verify tier support, operand lengths and alignment before any vector
//! instruction runs.

pub mod dot;
pub mod exp;
pub mod sigmoid;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::cpu::CpuFeatures;
use crate::memory::{is_aligned, AlignedBuffer, MemoryError};

pub use dot::dot_scalar;
pub use sigmoid::{sigmoid_f32, sigmoid_scalar};

/// Kernel implementation tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KernelTier {
    /// Portable loop, no alignment requirement
    Scalar,
    /// 128-bit, 4 lanes
    Sse,
    /// 256-bit, 8 lanes
    Avx,
    /// 256-bit with fused multiply-add, 8 lanes
    Avx2Fma,
}

impl KernelTier {
    /// Every tier, slowest first
    pub const ALL: [KernelTier; 4] = [
        KernelTier::Scalar,
        KernelTier::Sse,
        KernelTier::Avx,
        KernelTier::Avx2Fma,
    ];

    /// f32 lanes processed per vector step
    pub const fn lane_width(self) -> usize {
        match self {
            KernelTier::Scalar => 1,
            KernelTier::Sse => 4,
            KernelTier::Avx | KernelTier::Avx2Fma => 8,
        }
    }

    /// Required start alignment of input operands, in bytes
    ///
    /// Applies to every input of 4 or more elements, whatever path the
    /// tier takes internally. A 256-bit tier therefore wants 32-byte
    /// alignment even for 4 to 7 elements, which only its 128-bit
    /// remainder reads. Inputs shorter than 4 elements are never checked.
    pub const fn input_alignment(self) -> usize {
        match self {
            KernelTier::Scalar => 4,
            KernelTier::Sse => 16,
            KernelTier::Avx | KernelTier::Avx2Fma => 32,
        }
    }

    /// Alignment of the buffers `sigmoid` returns, in bytes
    pub const fn output_alignment(self) -> usize {
        match self {
            KernelTier::Scalar | KernelTier::Sse => 16,
            KernelTier::Avx | KernelTier::Avx2Fma => 32,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            KernelTier::Scalar => "scalar",
            KernelTier::Sse => "SSE",
            KernelTier::Avx => "AVX",
            KernelTier::Avx2Fma => "AVX2 + FMA",
        }
    }

    /// Whether a CPU with `features` can execute this tier
    pub fn is_supported(self, features: &CpuFeatures) -> bool {
        match self {
            KernelTier::Scalar => true,
            KernelTier::Sse => features.has_sse() && features.has_sse2(),
            KernelTier::Avx => features.has_avx(),
            KernelTier::Avx2Fma => features.has_avx2() && features.has_fma(),
        }
    }

    /// Fastest supported tier: AVX2+FMA, then AVX, then SSE, then scalar
    pub fn select(features: &CpuFeatures) -> Self {
        Self::ALL
            .into_iter()
            .rev()
            .find(|tier| tier.is_supported(features))
            .unwrap_or(KernelTier::Scalar)
    }

    /// Supported tiers, slowest first
    pub fn supported(features: &CpuFeatures) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|tier| tier.is_supported(features))
            .collect()
    }
}

impl fmt::Display for KernelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kernel precondition and allocation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("{tier} kernels are not supported on this CPU ({features})")]
    UnsupportedTier {
        tier: KernelTier,
        features: CpuFeatures,
    },

    #[error("{tier} kernel needs {required}-byte aligned operands, got address {address:#x}")]
    Misaligned {
        tier: KernelTier,
        required: usize,
        address: usize,
    },

    #[error("Operand length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Kernel output allocation failed: {0}")]
    Memory(#[from] MemoryError),
}

/// Result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

fn ensure_supported(tier: KernelTier) -> KernelResult<()> {
    let features = CpuFeatures::get();
    if tier.is_supported(&features) {
        Ok(())
    } else {
        Err(KernelError::UnsupportedTier { tier, features })
    }
}

fn ensure_aligned(tier: KernelTier, data: &[f32], required: usize) -> KernelResult<()> {
    // One threshold for all tiers; see `KernelTier::input_alignment`
    if data.len() < KernelTier::Sse.lane_width() || is_aligned(data.as_ptr(), required) {
        Ok(())
    } else {
        Err(KernelError::Misaligned {
            tier,
            required,
            address: data.as_ptr() as usize,
        })
    }
}

/// Checked dot product through a specific tier
///
/// # Errors
/// - `LengthMismatch` if `a` and `b` differ in length
/// - `UnsupportedTier` if this CPU cannot run `tier`
/// - `Misaligned` if either operand misses `tier.input_alignment()`
pub fn dot_product(tier: KernelTier, a: &[f32], b: &[f32]) -> KernelResult<f32> {
    if a.len() != b.len() {
        return Err(KernelError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    ensure_supported(tier)?;
    ensure_aligned(tier, a, tier.input_alignment())?;
    ensure_aligned(tier, b, tier.input_alignment())?;

    // SAFETY: support, equal lengths and alignment verified above.
    Ok(unsafe { dot::dot_unchecked(tier, a, b) })
}

/// Checked sigmoid through a specific tier
///
/// Returns a fresh buffer aligned to `tier.output_alignment()`.
///
/// # Errors
/// - `UnsupportedTier` if this CPU cannot run `tier`
/// - `Misaligned` if `a` misses `tier.input_alignment()`
/// - `Memory` if the output buffer cannot be allocated
pub fn sigmoid(tier: KernelTier, a: &[f32]) -> KernelResult<AlignedBuffer> {
    ensure_supported(tier)?;
    ensure_aligned(tier, a, tier.input_alignment())?;

    let mut out = AlignedBuffer::zeroed(a.len(), tier.output_alignment())?;
    // SAFETY: support and input alignment verified above; `out` was just
    // allocated with the tier's output alignment and the same length.
    unsafe { sigmoid::sigmoid_unchecked(tier, a, &mut out) };
    Ok(out)
}
