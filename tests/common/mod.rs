//! Common test utilities
//!
//! Shared datasets and tier helpers for the integration tests. Every
//! helper only hands out tiers the running CPU supports, so the suites
//! run unchanged on scalar-only hosts.

#![allow(dead_code)] // each test binary uses a different subset

use logforge::memory::AlignedBuffer;
use logforge::{CpuFeatures, KernelDispatcher, KernelTier};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

/// 8-point dataset separable by the line y = x
pub const SEPARABLE_X: [f32; 16] = [
    1.0, 3.0, //
    2.0, 4.0, //
    3.0, 5.0, //
    0.5, 2.5, //
    3.0, 1.0, //
    4.0, 2.0, //
    5.0, 3.0, //
    2.5, 0.5, //
];
pub const SEPARABLE_Y: [i32; 8] = [1, 1, 1, 1, 0, 0, 0, 0];

/// Kernel tiers the host can run, slowest first
pub fn supported_tiers() -> Vec<KernelTier> {
    KernelTier::supported(&CpuFeatures::get())
}

/// One dispatcher per supported tier, both primitives pinned to it
pub fn tier_dispatchers() -> Vec<KernelDispatcher> {
    supported_tiers()
        .into_iter()
        .map(|tier| KernelDispatcher::with_tiers(tier, tier).expect("tier is supported"))
        .collect()
}

/// 32-byte aligned copy of `data`
pub fn aligned(data: &[f32]) -> AlignedBuffer {
    AlignedBuffer::from_slice(data, 32).expect("aligned allocation")
}

/// Seeded standard-normal features, row-major
pub fn gaussian_features(rows: usize, cols: usize, seed: u64) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..rows * cols).map(|_| StandardNormal.sample(&mut rng)).collect()
}

/// Labels from a fixed hyperplane: `x . w + bias > 0`
pub fn hyperplane_labels(x: &[f32], cols: usize, w: &[f32], bias: f32) -> Vec<i32> {
    x.chunks_exact(cols)
        .map(|row| {
            let z: f32 = row.iter().zip(w.iter().cycle()).map(|(a, b)| a * b).sum();
            i32::from(z + bias > 0.0)
        })
        .collect()
}
