//! Runtime CPU feature detection for kernel dispatch
//!
//! Queries CPUID (via the raw-cpuid crate) for the SSE, SSE2, AVX, AVX2 and
//! FMA feature bits. AVX is only reported when the operating system has
//! enabled YMM state save/restore, which is confirmed by reading XCR0.
//! Results are cached so CPUID runs once per process.
//!
//! # Example
//!
//! ```rust
//! use logforge::backend::cpu::cpu_features::CpuFeatures;
//!
//! let features = CpuFeatures::get();
//! if features.has_avx2() && features.has_fma() {
//!     println!("AVX2 + FMA available!");
//! } else if features.has_avx() {
//!     println!("AVX available!");
//! }
//! ```

use once_cell::sync::Lazy;
use std::fmt;

/// Cached CPU features detected at first use
static CPU_FEATURES: Lazy<CpuFeatures> = Lazy::new(CpuFeatures::detect);

/// XCR0 bits 1 (SSE state) and 2 (AVX state)
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const XCR0_SSE_AVX_STATE: u64 = 0x6;

/// CPU SIMD feature flags
///
/// An immutable snapshot of the vector instruction sets the running
/// processor (and, for AVX, the operating system) supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuFeatures {
    /// SSE (128-bit float SIMD)
    pub sse: bool,
    /// SSE2 (128-bit integer SIMD, needed for the 2^k bit trick)
    pub sse2: bool,
    /// AVX (256-bit float SIMD), CPU and OS support
    pub avx: bool,
    /// AVX2 (256-bit integer SIMD)
    pub avx2: bool,
    /// Fused multiply-add
    pub fma: bool,
    /// CPU architecture the process is running on
    pub arch: CpuArch,
}

/// CPU architecture enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuArch {
    X86,
    X86_64,
    Aarch64,
    Arm,
    Other,
}

impl CpuArch {
    /// Architecture of the current compilation target
    pub const fn current() -> Self {
        if cfg!(target_arch = "x86_64") {
            CpuArch::X86_64
        } else if cfg!(target_arch = "x86") {
            CpuArch::X86
        } else if cfg!(target_arch = "aarch64") {
            CpuArch::Aarch64
        } else if cfg!(target_arch = "arm") {
            CpuArch::Arm
        } else {
            CpuArch::Other
        }
    }

    /// Whether this is an ARM-family architecture
    pub fn is_arm(&self) -> bool {
        matches!(self, CpuArch::Aarch64 | CpuArch::Arm)
    }
}

impl fmt::Display for CpuArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuArch::X86 => write!(f, "x86"),
            CpuArch::X86_64 => write!(f, "x86_64"),
            CpuArch::Aarch64 => write!(f, "aarch64"),
            CpuArch::Arm => write!(f, "arm"),
            CpuArch::Other => write!(f, "unknown"),
        }
    }
}

impl fmt::Display for CpuFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CpuFeatures({}", self.arch)?;
        if self.sse {
            write!(f, " +SSE")?;
        }
        if self.sse2 {
            write!(f, " +SSE2")?;
        }
        if self.avx {
            write!(f, " +AVX")?;
        }
        if self.avx2 {
            write!(f, " +AVX2")?;
        }
        if self.fma {
            write!(f, " +FMA")?;
        }
        write!(f, ")")
    }
}

impl CpuFeatures {
    /// Detect CPU features at runtime
    ///
    /// Runs CPUID on x86/x86_64. On ARM targets FMA is architecturally
    /// guaranteed and every x86 flag is false. Absence of a feature is a
    /// normal outcome, so there is no error path.
    ///
    /// Prefer [`CpuFeatures::get`], which caches the result.
    pub fn detect() -> Self {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            Self::detect_x86()
        }

        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        {
            Self::detect_non_x86(CpuArch::current())
        }
    }

    /// Get cached CPU features (detected once per process)
    #[inline]
    pub fn get() -> Self {
        *CPU_FEATURES
    }

    /// A feature set with nothing but the scalar path available
    pub const fn scalar_only(arch: CpuArch) -> Self {
        Self {
            sse: false,
            sse2: false,
            avx: false,
            avx2: false,
            fma: false,
            arch,
        }
    }

    /// Detect x86 CPU features using CPUID leaves 1 and 7 plus XCR0
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    fn detect_x86() -> Self {
        use raw_cpuid::CpuId;

        let cpuid = CpuId::new();

        // Leaf 1: EDX bits 25/26, ECX bits 12/27/28
        let Some(info) = cpuid.get_feature_info() else {
            return Self::scalar_only(CpuArch::current());
        };
        let sse = info.has_sse();
        let sse2 = info.has_sse2();
        let fma = info.has_fma();

        let avx = if info.has_avx() && info.has_oxsave() {
            // SAFETY: OSXSAVE is set, so XGETBV is enabled by the OS.
            let xcr0 = unsafe { read_xcr0() };
            xcr0 & XCR0_SSE_AVX_STATE == XCR0_SSE_AVX_STATE
        } else {
            false
        };

        // Leaf 7: EBX bit 5, only meaningful once AVX state is usable
        let avx2 = avx
            && cpuid
                .get_extended_feature_info()
                .map(|ext| ext.has_avx2())
                .unwrap_or(false);

        Self {
            sse,
            sse2,
            avx,
            avx2,
            fma,
            arch: CpuArch::current(),
        }
    }

    /// Detection for every non-x86 architecture
    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    fn detect_non_x86(arch: CpuArch) -> Self {
        Self {
            fma: arch.is_arm(),
            ..Self::scalar_only(arch)
        }
    }

    /// Check if SSE is available
    #[inline]
    pub fn has_sse(&self) -> bool {
        self.sse
    }

    /// Check if SSE2 is available
    #[inline]
    pub fn has_sse2(&self) -> bool {
        self.sse2
    }

    /// Check if AVX is available and enabled by the OS
    #[inline]
    pub fn has_avx(&self) -> bool {
        self.avx
    }

    /// Check if AVX2 is available
    #[inline]
    pub fn has_avx2(&self) -> bool {
        self.avx2
    }

    /// Check if FMA is available
    #[inline]
    pub fn has_fma(&self) -> bool {
        self.fma
    }

    /// Widest f32 lane count any usable tier offers
    ///
    /// * 8 for AVX / AVX2 (256-bit / 32-bit)
    /// * 4 for SSE (128-bit / 32-bit)
    /// * 1 for scalar
    pub fn optimal_f32_width(&self) -> usize {
        if self.avx {
            8
        } else if self.sse && self.sse2 {
            4
        } else {
            1
        }
    }

    /// Log CPU features through tracing
    pub fn log_features(&self) {
        tracing::info!("CPU Architecture: {}", self.arch);
        tracing::info!(
            "SIMD Features: SSE={}, SSE2={}, AVX={}, AVX2={}, FMA={}",
            self.sse,
            self.sse2,
            self.avx,
            self.avx2,
            self.fma
        );
        tracing::debug!(
            "Optimal f32 SIMD width: {} elements per vector",
            self.optimal_f32_width()
        );
    }
}

/// Read extended control register 0
///
/// # Safety
///
/// The caller must have verified the CPUID OSXSAVE bit.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "xsave")]
unsafe fn read_xcr0() -> u64 {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::_xgetbv;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::_xgetbv;

    unsafe { _xgetbv(0) }
}
