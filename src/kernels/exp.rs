//! Range-reduced polynomial exponential
//!
//! `e^x = 2^k * e^r` with `k = round(x * log2(e))` and `r = x - k * ln2`,
//! so `|r| <= ln2 / 2`. `e^r` is a degree-5 Horner polynomial and `2^k` is
//! built directly in the exponent field: `(k + 127) << 23` read as `f32`.
//!
//! Inputs are clamped to `[EXP_CLAMP_MIN, EXP_CLAMP_MAX]` first, which keeps
//! `k + 127` inside the normal exponent range `[1, 254]`. NaN is not
//! clamped and comes out as NaN.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Lower input clamp; `e^-87` is still a normal f32
pub const EXP_CLAMP_MIN: f32 = -87.0;

/// Upper input clamp; `e^88` is below `f32::MAX`
pub const EXP_CLAMP_MAX: f32 = 88.0;

pub const LOG2E: f32 = std::f32::consts::LOG2_E;
pub const LN2: f32 = std::f32::consts::LN_2;

/// Taylor coefficients of `e^r`, lowest order first
pub const EXP_POLY: [f32; 6] = [1.0, 1.0, 0.5, 1.0 / 6.0, 1.0 / 24.0, 1.0 / 120.0];

const EXPONENT_BIAS: i32 = 127;
const MANTISSA_BITS: u32 = 23;

// ============================================================================
// Scalar model
// ============================================================================

/// Scalar rendition of the vector exponential
///
/// Bit-for-bit the same recipe the SIMD tiers use (modulo FMA rounding), so
/// the approximation can be tested without vector hardware.
pub fn exp_reduced_scalar(x: f32) -> f32 {
    let x = x.clamp(EXP_CLAMP_MIN, EXP_CLAMP_MAX);
    let k = (x * LOG2E).round_ties_even();
    let r = x - k * LN2;

    let mut p = EXP_POLY[5];
    for &c in EXP_POLY[..5].iter().rev() {
        p = p * r + c;
    }

    let scale = f32::from_bits(((k as i32 + EXPONENT_BIAS) as u32) << MANTISSA_BITS);
    p * scale
}

// ============================================================================
// 128-bit (SSE + SSE2)
// ============================================================================

/// Four-lane exponential
///
/// `_mm_cvtps_epi32` rounds to nearest-even under the default MXCSR mode.
///
/// # Safety
/// The CPU must support SSE and SSE2.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "sse,sse2")]
pub unsafe fn exp_sse(x: __m128) -> __m128 {
    // Clamp bound first: max/min return the second operand on NaN
    let x = _mm_min_ps(
        _mm_set1_ps(EXP_CLAMP_MAX),
        _mm_max_ps(_mm_set1_ps(EXP_CLAMP_MIN), x),
    );

    let k = _mm_cvtps_epi32(_mm_mul_ps(x, _mm_set1_ps(LOG2E)));
    let kf = _mm_cvtepi32_ps(k);
    let r = _mm_sub_ps(x, _mm_mul_ps(kf, _mm_set1_ps(LN2)));

    let mut p = _mm_set1_ps(EXP_POLY[5]);
    p = _mm_add_ps(_mm_mul_ps(p, r), _mm_set1_ps(EXP_POLY[4]));
    p = _mm_add_ps(_mm_mul_ps(p, r), _mm_set1_ps(EXP_POLY[3]));
    p = _mm_add_ps(_mm_mul_ps(p, r), _mm_set1_ps(EXP_POLY[2]));
    p = _mm_add_ps(_mm_mul_ps(p, r), _mm_set1_ps(EXP_POLY[1]));
    p = _mm_add_ps(_mm_mul_ps(p, r), _mm_set1_ps(EXP_POLY[0]));

    let bits = _mm_slli_epi32::<23>(_mm_add_epi32(k, _mm_set1_epi32(EXPONENT_BIAS)));
    _mm_mul_ps(p, _mm_castsi128_ps(bits))
}

// ============================================================================
// 256-bit (AVX)
// ============================================================================

/// Eight-lane exponential without AVX2
///
/// AVX has no 256-bit integer add or shift, so the `2^k` construction runs
/// on the two 128-bit halves with SSE2.
///
/// # Safety
/// The CPU must support AVX.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx")]
pub unsafe fn exp_avx(x: __m256) -> __m256 {
    let x = _mm256_min_ps(
        _mm256_set1_ps(EXP_CLAMP_MAX),
        _mm256_max_ps(_mm256_set1_ps(EXP_CLAMP_MIN), x),
    );

    let kf = _mm256_round_ps::<{ _MM_FROUND_TO_NEAREST_INT | _MM_FROUND_NO_EXC }>(
        _mm256_mul_ps(x, _mm256_set1_ps(LOG2E)),
    );
    let r = _mm256_sub_ps(x, _mm256_mul_ps(kf, _mm256_set1_ps(LN2)));

    let mut p = _mm256_set1_ps(EXP_POLY[5]);
    p = _mm256_add_ps(_mm256_mul_ps(p, r), _mm256_set1_ps(EXP_POLY[4]));
    p = _mm256_add_ps(_mm256_mul_ps(p, r), _mm256_set1_ps(EXP_POLY[3]));
    p = _mm256_add_ps(_mm256_mul_ps(p, r), _mm256_set1_ps(EXP_POLY[2]));
    p = _mm256_add_ps(_mm256_mul_ps(p, r), _mm256_set1_ps(EXP_POLY[1]));
    p = _mm256_add_ps(_mm256_mul_ps(p, r), _mm256_set1_ps(EXP_POLY[0]));

    let k = _mm256_cvtps_epi32(kf);
    let bias = _mm_set1_epi32(EXPONENT_BIAS);
    let lo = _mm_slli_epi32::<23>(_mm_add_epi32(_mm256_castsi256_si128(k), bias));
    let hi = _mm_slli_epi32::<23>(_mm_add_epi32(_mm256_extractf128_si256::<1>(k), bias));
    let bits = _mm256_set_m128i(hi, lo);

    _mm256_mul_ps(p, _mm256_castsi256_ps(bits))
}

// ============================================================================
// 256-bit fused (AVX2 + FMA)
// ============================================================================

/// Eight-lane exponential with fused range reduction and Horner steps
///
/// # Safety
/// The CPU must support AVX2 and FMA.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx2,fma")]
pub unsafe fn exp_avx2_fma(x: __m256) -> __m256 {
    let x = _mm256_min_ps(
        _mm256_set1_ps(EXP_CLAMP_MAX),
        _mm256_max_ps(_mm256_set1_ps(EXP_CLAMP_MIN), x),
    );

    let kf = _mm256_round_ps::<{ _MM_FROUND_TO_NEAREST_INT | _MM_FROUND_NO_EXC }>(
        _mm256_mul_ps(x, _mm256_set1_ps(LOG2E)),
    );
    // r = x - k * ln2
    let r = _mm256_fnmadd_ps(kf, _mm256_set1_ps(LN2), x);

    let mut p = _mm256_set1_ps(EXP_POLY[5]);
    p = _mm256_fmadd_ps(p, r, _mm256_set1_ps(EXP_POLY[4]));
    p = _mm256_fmadd_ps(p, r, _mm256_set1_ps(EXP_POLY[3]));
    p = _mm256_fmadd_ps(p, r, _mm256_set1_ps(EXP_POLY[2]));
    p = _mm256_fmadd_ps(p, r, _mm256_set1_ps(EXP_POLY[1]));
    p = _mm256_fmadd_ps(p, r, _mm256_set1_ps(EXP_POLY[0]));

    let k = _mm256_cvtps_epi32(kf);
    let bits = _mm256_slli_epi32::<23>(_mm256_add_epi32(k, _mm256_set1_epi32(EXPONENT_BIAS)));

    _mm256_mul_ps(p, _mm256_castsi256_ps(bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REL_TOL: f32 = 1e-5;

    fn rel_err(approx: f32, exact: f32) -> f32 {
        (approx - exact).abs() / exact.abs().max(f32::MIN_POSITIVE)
    }

    #[test]
    fn test_exp_reduced_scalar_matches_std() {
        let mut x = -20.0f32;
        while x <= 20.0 {
            let err = rel_err(exp_reduced_scalar(x), x.exp());
            assert!(err < REL_TOL, "x={} rel_err={}", x, err);
            x += 0.125;
        }
    }

    #[test]
    fn test_exp_reduced_scalar_exact_at_zero() {
        assert_eq!(exp_reduced_scalar(0.0), 1.0);
    }

    #[test]
    fn test_exp_reduced_scalar_clamps() {
        let hi = exp_reduced_scalar(1000.0);
        assert!(hi.is_finite());
        assert!(rel_err(hi, exp_reduced_scalar(EXP_CLAMP_MAX)) == 0.0);

        let lo = exp_reduced_scalar(-1000.0);
        assert!(lo > 0.0 && lo.is_normal());
    }

    #[test]
    fn test_exp_reduced_scalar_nan() {
        assert!(exp_reduced_scalar(f32::NAN).is_nan());
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    #[test]
    fn test_exp_sse_matches_scalar_model() {
        let features = crate::backend::cpu::CpuFeatures::get();
        if !(features.has_sse() && features.has_sse2()) {
            return;
        }
        let inputs = [-90.0f32, -3.5, 0.0, 2.25];
        let mut out = [0.0f32; 4];
        // SAFETY: SSE/SSE2 checked above; unaligned load/store used.
        unsafe {
            let v = exp_sse(_mm_loadu_ps(inputs.as_ptr()));
            _mm_storeu_ps(out.as_mut_ptr(), v);
        }
        for (x, y) in inputs.iter().zip(out.iter()) {
            assert!(rel_err(*y, exp_reduced_scalar(*x)) < REL_TOL, "x={}", x);
        }
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    #[test]
    fn test_exp_avx_tiers_match_scalar_model() {
        let features = crate::backend::cpu::CpuFeatures::get();
        let inputs = [-100.0f32, -10.0, -1.0, -0.5, 0.0, 0.5, 1.0, 87.5];
        let mut out = [0.0f32; 8];

        if features.has_avx() {
            // SAFETY: AVX checked above.
            unsafe {
                let v = exp_avx(_mm256_loadu_ps(inputs.as_ptr()));
                _mm256_storeu_ps(out.as_mut_ptr(), v);
            }
            for (x, y) in inputs.iter().zip(out.iter()) {
                assert!(rel_err(*y, exp_reduced_scalar(*x)) < REL_TOL, "avx x={}", x);
            }
        }

        if features.has_avx2() && features.has_fma() {
            // SAFETY: AVX2 and FMA checked above.
            unsafe {
                let v = exp_avx2_fma(_mm256_loadu_ps(inputs.as_ptr()));
                _mm256_storeu_ps(out.as_mut_ptr(), v);
            }
            for (x, y) in inputs.iter().zip(out.iter()) {
                assert!(rel_err(*y, exp_reduced_scalar(*x)) < REL_TOL, "fma x={}", x);
            }
        }
    }
}
