//! Unified error handling for logforge
//!
//! Module-level errors (`MemoryError`, `KernelError`) fold into
//! [`LogForgeError`], which the model API returns. Errors are categorized:
//! - User errors (bad shapes, labels, configuration, missing init)
//! - Resource errors (allocation failures)
//! - Internal errors (kernel precondition violations, i.e. bugs)

use std::fmt;

use crate::kernels::KernelError;
use crate::memory::MemoryError;

/// Unified error type for logforge
#[derive(Debug, thiserror::Error)]
pub enum LogForgeError {
    // ========== Validation Errors ==========
    /// Input does not have the expected dimensionality or size
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Column count or sample length differs from the model's feature count
    #[error("Feature count mismatch: model expects {expected}, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    /// X and Y disagree on the number of samples
    #[error("Sample count mismatch: {samples} samples but {labels} labels")]
    SampleCountMismatch { samples: usize, labels: usize },

    /// Label outside {0, 1}
    #[error("Invalid label {value} at index {index}: labels must be 0 or 1")]
    InvalidLabel { index: usize, value: i32 },

    /// Invalid model configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // ========== Resource Errors ==========
    /// Aligned allocation failed
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // ========== Kernel Errors ==========
    /// A kernel rejected its operands
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    // ========== Lifecycle Errors ==========
    /// `init_kernels()` has not been called yet
    #[error("Kernels not initialized: call init_kernels() first")]
    KernelsNotInitialized,
}

impl LogForgeError {
    /// Categorize the error for handling decisions
    pub fn category(&self) -> ErrorCategory {
        match self {
            LogForgeError::InvalidShape(_)
            | LogForgeError::FeatureCountMismatch { .. }
            | LogForgeError::SampleCountMismatch { .. }
            | LogForgeError::InvalidLabel { .. }
            | LogForgeError::InvalidConfiguration(_)
            | LogForgeError::KernelsNotInitialized => ErrorCategory::User,

            LogForgeError::Memory(_) | LogForgeError::Kernel(KernelError::Memory(_)) => {
                ErrorCategory::Resource
            }

            // The model sizes and aligns every operand itself, so a kernel
            // precondition failure means a bug.
            LogForgeError::Kernel(_) => ErrorCategory::Internal,
        }
    }

    /// Check if this is a user-facing error (actionable by the caller)
    pub fn is_user_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::User)
    }

    /// Check if this error came from resource exhaustion
    pub fn is_resource_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::Resource)
    }

    /// Check if this is an internal error (indicates a bug)
    pub fn is_internal_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::Internal)
    }
}

/// Error category for handling decisions
///
/// - User: fix the input or call order
/// - Resource: out of memory, nothing to retry
/// - Internal: report as bug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid input, configuration, or call order
    User,
    /// Allocation failure
    Resource,
    /// Indicates a bug
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::User => write!(f, "User"),
            ErrorCategory::Resource => write!(f, "Resource"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

/// Result type using LogForgeError
pub type ForgeResult<T> = std::result::Result<T, LogForgeError>;

/// Create an `InvalidShape` error with a formatted message
///
/// # Examples
/// ```ignore
/// return Err(shape_error!("expected 2-D input, got {} dimensions", shape.len()));
/// ```
#[macro_export]
macro_rules! shape_error {
    ($msg:expr) => {
        $crate::error::LogForgeError::InvalidShape($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::LogForgeError::InvalidShape(format!($fmt, $($arg)*))
    };
}

/// Create an `InvalidConfiguration` error with a formatted message
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::LogForgeError::InvalidConfiguration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::LogForgeError::InvalidConfiguration(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cpu::{CpuArch, CpuFeatures};
    use crate::kernels::KernelTier;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            LogForgeError::InvalidShape("x".to_string()).category(),
            ErrorCategory::User
        );
        assert_eq!(
            LogForgeError::KernelsNotInitialized.category(),
            ErrorCategory::User
        );
        assert_eq!(
            LogForgeError::Memory(MemoryError::AllocationFailed {
                bytes: 64,
                alignment: 32
            })
            .category(),
            ErrorCategory::Resource
        );
        assert_eq!(
            LogForgeError::Kernel(KernelError::Memory(MemoryError::InvalidAlignment(3)))
                .category(),
            ErrorCategory::Resource
        );
        assert_eq!(
            LogForgeError::Kernel(KernelError::Misaligned {
                tier: KernelTier::Avx,
                required: 32,
                address: 0x1004
            })
            .category(),
            ErrorCategory::Internal
        );
        assert_eq!(
            LogForgeError::Kernel(KernelError::UnsupportedTier {
                tier: KernelTier::Avx2Fma,
                features: CpuFeatures::scalar_only(CpuArch::Other),
            })
            .category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_predicates() {
        assert!(LogForgeError::InvalidLabel { index: 0, value: 2 }.is_user_error());
        assert!(LogForgeError::Memory(MemoryError::InvalidAlignment(3)).is_resource_error());
        assert!(LogForgeError::Kernel(KernelError::LengthMismatch { left: 1, right: 2 })
            .is_internal_error());
        assert!(!LogForgeError::KernelsNotInitialized.is_internal_error());
    }

    #[test]
    fn test_error_display() {
        let err = LogForgeError::FeatureCountMismatch {
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Feature count mismatch: model expects 2, got 3"
        );

        let err = LogForgeError::SampleCountMismatch {
            samples: 5,
            labels: 4,
        };
        assert_eq!(
            err.to_string(),
            "Sample count mismatch: 5 samples but 4 labels"
        );
        assert_eq!(ErrorCategory::Resource.to_string(), "Resource");
    }

    #[test]
    fn test_macros() {
        let err = shape_error!("expected 2-D input");
        assert!(matches!(err, LogForgeError::InvalidShape(_)));

        let err = shape_error!("got {} dimensions", 3);
        assert_eq!(err.to_string(), "Invalid shape: got 3 dimensions");

        let err = config_error!("epochs must be > 0");
        assert!(matches!(err, LogForgeError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_from_conversions() {
        let err: LogForgeError = MemoryError::InvalidAlignment(3).into();
        assert!(matches!(err, LogForgeError::Memory(_)));

        let err: LogForgeError = KernelError::LengthMismatch { left: 1, right: 2 }.into();
        assert!(matches!(err, LogForgeError::Kernel(_)));
    }
}
