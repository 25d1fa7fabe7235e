//! Logistic sigmoid kernels
//!
//! `sigmoid(x) = 1 / (1 + e^-x)`. The scalar tier uses `f32::exp`; the
//! vector tiers use the range-reduced exponential from [`super::exp`].
//! 256-bit tiers hand a remainder of four or more to the 128-bit path and
//! finish the last `< 4` elements with the scalar formula.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
use super::exp::{exp_avx, exp_avx2_fma, exp_sse};
use super::KernelTier;

/// Scalar logistic function
#[inline]
pub fn sigmoid_f32(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Scalar tier: `out[i] = sigmoid(a[i])`
pub fn sigmoid_scalar(a: &[f32], out: &mut [f32]) {
    for (o, &x) in out.iter_mut().zip(a.iter()) {
        *o = sigmoid_f32(x);
    }
}

/// Run the given tier without any precondition checks
///
/// # Safety
/// `tier` must be supported by the running CPU, `out.len() >= a.len()`,
/// `a` must start on `tier.input_alignment()` and `out` on
/// `tier.output_alignment()` when `a` holds at least four elements.
pub(crate) unsafe fn sigmoid_unchecked(tier: KernelTier, a: &[f32], out: &mut [f32]) {
    match tier {
        KernelTier::Scalar => sigmoid_scalar(a, out),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        KernelTier::Sse => sigmoid_sse(a, out),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        KernelTier::Avx => sigmoid_avx(a, out),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        KernelTier::Avx2Fma => sigmoid_avx2_fma(a, out),
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        _ => sigmoid_scalar(a, out),
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[inline]
#[target_feature(enable = "sse,sse2")]
unsafe fn sigmoid4(x: __m128) -> __m128 {
    let one = _mm_set1_ps(1.0);
    let e = exp_sse(_mm_sub_ps(_mm_setzero_ps(), x));
    _mm_div_ps(one, _mm_add_ps(one, e))
}

/// 128-bit sigmoid over 4-lane chunks, scalar tail
///
/// # Safety
/// The CPU must support SSE and SSE2; `a` and `out` must be 16-byte aligned
/// and `out.len() >= a.len()`.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "sse,sse2")]
pub unsafe fn sigmoid_sse(a: &[f32], out: &mut [f32]) {
    let n = a.len().min(out.len());
    let (src, dst) = (a.as_ptr(), out.as_mut_ptr());

    let mut i = 0;
    while i + 4 <= n {
        _mm_store_ps(dst.add(i), sigmoid4(_mm_load_ps(src.add(i))));
        i += 4;
    }
    sigmoid_scalar(&a[i..n], &mut out[i..n]);
}

/// 256-bit sigmoid with the AVX exponential
///
/// # Safety
/// The CPU must support AVX; `a` and `out` must be 32-byte aligned and
/// `out.len() >= a.len()`.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx")]
pub unsafe fn sigmoid_avx(a: &[f32], out: &mut [f32]) {
    let n = a.len().min(out.len());
    let (src, dst) = (a.as_ptr(), out.as_mut_ptr());
    let one = _mm256_set1_ps(1.0);

    let mut i = 0;
    while i + 8 <= n {
        let x = _mm256_load_ps(src.add(i));
        let e = exp_avx(_mm256_sub_ps(_mm256_setzero_ps(), x));
        _mm256_store_ps(dst.add(i), _mm256_div_ps(one, _mm256_add_ps(one, e)));
        i += 8;
    }
    // i is a multiple of 8, so the 128-bit path stays aligned
    sigmoid_sse(&a[i..n], &mut out[i..n]);
}

/// 256-bit sigmoid with the fused exponential
///
/// # Safety
/// The CPU must support AVX2 and FMA; `a` and `out` must be 32-byte aligned
/// and `out.len() >= a.len()`.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx2,fma")]
pub unsafe fn sigmoid_avx2_fma(a: &[f32], out: &mut [f32]) {
    let n = a.len().min(out.len());
    let (src, dst) = (a.as_ptr(), out.as_mut_ptr());
    let one = _mm256_set1_ps(1.0);

    let mut i = 0;
    while i + 8 <= n {
        let x = _mm256_load_ps(src.add(i));
        let e = exp_avx2_fma(_mm256_sub_ps(_mm256_setzero_ps(), x));
        _mm256_store_ps(dst.add(i), _mm256_div_ps(one, _mm256_add_ps(one, e)));
        i += 8;
    }
    sigmoid_sse(&a[i..n], &mut out[i..n]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cpu::CpuFeatures;
    use crate::memory::AlignedBuffer;

    const FLOAT_TOL: f32 = 1e-4;

    fn run(tier: KernelTier, input: &[f32]) -> Vec<f32> {
        let a = AlignedBuffer::from_slice(input, 32).unwrap();
        let mut out = AlignedBuffer::zeroed(input.len(), 32).unwrap();
        // SAFETY: callers only pass supported tiers; buffers are 32-byte aligned.
        unsafe { sigmoid_unchecked(tier, &a, &mut out) };
        out.to_vec()
    }

    fn supported_tiers() -> Vec<KernelTier> {
        let features = CpuFeatures::get();
        KernelTier::ALL
            .into_iter()
            .filter(|t| t.is_supported(&features))
            .collect()
    }

    #[test]
    fn test_sigmoid_f32_reference_points() {
        assert_eq!(sigmoid_f32(0.0), 0.5);
        assert!((sigmoid_f32(2.0) - 0.880_797).abs() < 1e-6);
        assert!((sigmoid_f32(-2.0) - 0.119_203).abs() < 1e-6);
    }

    #[test]
    fn test_tiers_match_scalar_across_remainders() {
        // 13 = one 8-chunk + one 4-chunk + 1 scalar
        for len in [1usize, 3, 4, 5, 8, 12, 13, 15, 21] {
            let input: Vec<f32> = (0..len).map(|i| (i as f32 - 6.0) * 1.7).collect();
            let expected: Vec<f32> = input.iter().map(|&x| sigmoid_f32(x)).collect();
            for tier in supported_tiers() {
                let got = run(tier, &input);
                for (j, (g, e)) in got.iter().zip(expected.iter()).enumerate() {
                    assert!(
                        (g - e).abs() <= FLOAT_TOL,
                        "{} len={} idx={} got={} expected={}",
                        tier,
                        len,
                        j,
                        g,
                        e
                    );
                }
            }
        }
    }

    #[test]
    fn test_sigmoid_zero_is_half_on_every_tier() {
        let input = [0.0f32; 13];
        for tier in supported_tiers() {
            assert!(run(tier, &input).iter().all(|&v| v == 0.5), "{}", tier);
        }
    }

    #[test]
    fn test_extreme_logits_stay_in_unit_interval() {
        let input = [-1e30f32, -500.0, -100.0, -88.5, 88.5, 100.0, 500.0, 1e30];
        for tier in supported_tiers() {
            let out = run(tier, &input);
            for (x, y) in input.iter().zip(out.iter()) {
                assert!(y.is_finite() && (0.0..=1.0).contains(y), "{} x={} y={}", tier, x, y);
            }
            assert!(out[7] > 0.999, "{}", tier);
            assert!(out[0] < 1e-6, "{}", tier);
        }
    }
}
