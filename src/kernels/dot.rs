//! Dot product kernels
//!
//! Vector tiers accumulate full lane chunks with aligned loads, reduce the
//! accumulator horizontally once after the bulk loop, then add the
//! `len % lanes` tail with scalar multiply-accumulate.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::KernelTier;

/// Scalar reference: `sum(a[i] * b[i])`
pub fn dot_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Run the given tier without any precondition checks
///
/// # Safety
/// `tier` must be supported by the running CPU, `a` and `b` must have the
/// same length, and both must start on `tier.input_alignment()` when they
/// hold at least one full lane chunk.
pub(crate) unsafe fn dot_unchecked(tier: KernelTier, a: &[f32], b: &[f32]) -> f32 {
    match tier {
        KernelTier::Scalar => dot_scalar(a, b),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        KernelTier::Sse => dot_sse(a, b),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        KernelTier::Avx => dot_avx(a, b),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        KernelTier::Avx2Fma => dot_avx2_fma(a, b),
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        _ => dot_scalar(a, b),
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[inline]
#[target_feature(enable = "sse")]
unsafe fn hsum_ps(v: __m128) -> f32 {
    let hi = _mm_movehl_ps(v, v);
    let pair = _mm_add_ps(v, hi);
    let odd = _mm_shuffle_ps::<0x55>(pair, pair);
    _mm_cvtss_f32(_mm_add_ss(pair, odd))
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[inline]
#[target_feature(enable = "avx")]
unsafe fn hsum256_ps(v: __m256) -> f32 {
    let lo = _mm256_castps256_ps128(v);
    let hi = _mm256_extractf128_ps::<1>(v);
    hsum_ps(_mm_add_ps(lo, hi))
}

/// 128-bit dot product, 4 lanes
///
/// # Safety
/// The CPU must support SSE; `a` and `b` must be 16-byte aligned and of
/// equal length.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "sse")]
pub unsafe fn dot_sse(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let (pa, pb) = (a.as_ptr(), b.as_ptr());

    let mut acc = _mm_setzero_ps();
    let mut i = 0;
    while i + 4 <= n {
        let va = _mm_load_ps(pa.add(i));
        let vb = _mm_load_ps(pb.add(i));
        acc = _mm_add_ps(acc, _mm_mul_ps(va, vb));
        i += 4;
    }

    let mut sum = hsum_ps(acc);
    while i < n {
        sum += a[i] * b[i];
        i += 1;
    }
    sum
}

/// 256-bit dot product, 8 lanes
///
/// # Safety
/// The CPU must support AVX; `a` and `b` must be 32-byte aligned and of
/// equal length.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx")]
pub unsafe fn dot_avx(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let (pa, pb) = (a.as_ptr(), b.as_ptr());

    let mut acc = _mm256_setzero_ps();
    let mut i = 0;
    while i + 8 <= n {
        let va = _mm256_load_ps(pa.add(i));
        let vb = _mm256_load_ps(pb.add(i));
        acc = _mm256_add_ps(acc, _mm256_mul_ps(va, vb));
        i += 8;
    }

    let mut sum = hsum256_ps(acc);
    while i < n {
        sum += a[i] * b[i];
        i += 1;
    }
    sum
}

/// 256-bit fused dot product, 8 lanes
///
/// # Safety
/// The CPU must support AVX2 and FMA; `a` and `b` must be 32-byte aligned
/// and of equal length.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx2,fma")]
pub unsafe fn dot_avx2_fma(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let (pa, pb) = (a.as_ptr(), b.as_ptr());

    let mut acc = _mm256_setzero_ps();
    let mut i = 0;
    while i + 8 <= n {
        let va = _mm256_load_ps(pa.add(i));
        let vb = _mm256_load_ps(pb.add(i));
        acc = _mm256_fmadd_ps(va, vb, acc);
        i += 8;
    }

    let mut sum = hsum256_ps(acc);
    while i < n {
        sum += a[i] * b[i];
        i += 1;
    }
    sum
}
