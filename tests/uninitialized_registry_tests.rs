//! Behavior before `init_kernels()`
//!
//! Lives in its own test binary so no other test can initialize the
//! registry first.

use logforge::dispatch::{is_initialized, kernels};
use logforge::model::{LogisticRegression, ModelConfig};
use logforge::{KernelDispatcher, LogForgeError};

#[test]
fn test_registry_requires_initialization() {
    assert!(!is_initialized());
    assert!(matches!(kernels(), Err(LogForgeError::KernelsNotInitialized)));

    let err = LogisticRegression::new(ModelConfig::new(3)).unwrap_err();
    assert!(matches!(err, LogForgeError::KernelsNotInitialized));
    assert!(err.is_user_error());

    // Explicit dispatchers work without the registry
    let model = LogisticRegression::with_dispatcher(ModelConfig::new(3), KernelDispatcher::detect())
        .expect("explicit dispatcher");
    assert_eq!(model.n_features(), 3);
    assert!(!is_initialized());
}
