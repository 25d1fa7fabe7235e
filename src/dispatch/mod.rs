//! Kernel dispatcher and process-wide registry
//!
//! A [`KernelDispatcher`] binds each primitive to exactly one tier. The
//! process registry holds the one selected at startup by [`init_kernels`];
//! it is written once and never swapped. Models copy the dispatcher they
//! were built with, so tests can also pin explicit tiers through
//! [`KernelDispatcher::with_tiers`] without touching global state.

use once_cell::sync::OnceCell;

use crate::backend::cpu::CpuFeatures;
use crate::error::{ForgeResult, LogForgeError};
use crate::kernels::{self, KernelError, KernelResult, KernelTier};
use crate::memory::AlignedBuffer;

static KERNELS: OnceCell<KernelDispatcher> = OnceCell::new();

/// Selected tier per primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelDispatcher {
    features: CpuFeatures,
    dot_tier: KernelTier,
    sigmoid_tier: KernelTier,
}

impl KernelDispatcher {
    /// Select the fastest supported tier for each primitive
    pub fn detect() -> Self {
        let features = CpuFeatures::get();
        features.log_features();

        let dispatcher = Self {
            features,
            dot_tier: KernelTier::select(&features),
            sigmoid_tier: KernelTier::select(&features),
        };
        dispatcher.log_selection();
        dispatcher
    }

    /// Pin explicit tiers
    ///
    /// # Errors
    /// `UnsupportedTier` if the running CPU cannot execute either tier.
    pub fn with_tiers(dot_tier: KernelTier, sigmoid_tier: KernelTier) -> KernelResult<Self> {
        let features = CpuFeatures::get();
        for tier in [dot_tier, sigmoid_tier] {
            if !tier.is_supported(&features) {
                return Err(KernelError::UnsupportedTier { tier, features });
            }
        }
        Ok(Self {
            features,
            dot_tier,
            sigmoid_tier,
        })
    }

    /// Scalar tiers for both primitives; runs everywhere
    pub fn scalar() -> Self {
        Self {
            features: CpuFeatures::get(),
            dot_tier: KernelTier::Scalar,
            sigmoid_tier: KernelTier::Scalar,
        }
    }

    fn log_selection(&self) {
        tracing::info!("[dispatcher] dot_product : {}", self.dot_tier);
        tracing::info!("[dispatcher] sigmoid     : {}", self.sigmoid_tier);
    }

    #[inline]
    pub fn dot_product(&self, a: &[f32], b: &[f32]) -> KernelResult<f32> {
        kernels::dot_product(self.dot_tier, a, b)
    }

    #[inline]
    pub fn sigmoid(&self, a: &[f32]) -> KernelResult<AlignedBuffer> {
        kernels::sigmoid(self.sigmoid_tier, a)
    }

    pub fn dot_tier(&self) -> KernelTier {
        self.dot_tier
    }

    pub fn sigmoid_tier(&self) -> KernelTier {
        self.sigmoid_tier
    }

    pub fn features(&self) -> CpuFeatures {
        self.features
    }

    /// Widest alignment any selected tier requires of its operands
    pub fn required_alignment(&self) -> usize {
        self.dot_tier
            .input_alignment()
            .max(self.sigmoid_tier.input_alignment())
    }
}

/// Detect and install the process-wide dispatcher
///
/// Only the first call selects; later calls return the same dispatcher.
pub fn init_kernels() -> &'static KernelDispatcher {
    if let Some(existing) = KERNELS.get() {
        tracing::debug!("init_kernels: already initialized, keeping current selection");
        return existing;
    }
    KERNELS.get_or_init(KernelDispatcher::detect)
}

/// The process-wide dispatcher
///
/// # Errors
/// `KernelsNotInitialized` before the first [`init_kernels`] call.
pub fn kernels() -> ForgeResult<&'static KernelDispatcher> {
    KERNELS.get().ok_or(LogForgeError::KernelsNotInitialized)
}

pub fn is_initialized() -> bool {
    KERNELS.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_picks_supported_tiers() {
        let d = KernelDispatcher::detect();
        let features = CpuFeatures::get();
        assert!(d.dot_tier().is_supported(&features));
        assert!(d.sigmoid_tier().is_supported(&features));
        assert_eq!(d.dot_tier(), KernelTier::select(&features));
        assert_eq!(d, KernelDispatcher::detect());
    }

    #[test]
    fn test_with_tiers() {
        let d = KernelDispatcher::with_tiers(KernelTier::Scalar, KernelTier::Scalar).unwrap();
        assert_eq!(d, KernelDispatcher::scalar());
        assert_eq!(d.required_alignment(), 4);

        let features = CpuFeatures::get();
        for tier in KernelTier::ALL {
            let result = KernelDispatcher::with_tiers(tier, KernelTier::Scalar);
            assert_eq!(result.is_ok(), tier.is_supported(&features), "{}", tier);
        }
    }

    #[test]
    fn test_init_kernels_is_idempotent() {
        let first = init_kernels();
        let second = init_kernels();
        assert!(std::ptr::eq(first, second));
        assert!(is_initialized());
        assert_eq!(kernels().unwrap(), first);
    }

    #[test]
    fn test_dispatcher_calls_kernels() {
        let d = KernelDispatcher::detect();
        let a = AlignedBuffer::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0], 32)
            .unwrap();
        let dot = d.dot_product(&a, &a).unwrap();
        assert!((dot - 285.0).abs() < 1e-3);

        let p = d.sigmoid(&a).unwrap();
        assert_eq!(p.len(), 9);
        assert!(p.windows(2).all(|w| w[0] <= w[1]));
    }
}
