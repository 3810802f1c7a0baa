//! Classifier backend implementations.
//!
//! `build(config)` is the factory called at startup.
//! Adding a new backend = new module + new match arm.

pub mod fixed;
#[cfg(feature = "backend-remote")]
pub mod remote;

use std::time::Duration;

use crate::backend::{BackendError, ClassifierBackend};
use crate::config::ClassificationConfig;

/// Construct a `ClassifierBackend` from config.
pub fn build(config: &ClassificationConfig) -> Result<ClassifierBackend, BackendError> {
    match config.backend.as_str() {
        "static" => {
            let s = &config.static_model;
            let backend = if s.available {
                fixed::StaticClassifier::new(s.label.clone(), s.score)
            } else {
                fixed::StaticClassifier::unavailable("static model disabled in config")
            };
            Ok(ClassifierBackend::Static(
                backend.with_latency(Duration::from_millis(s.latency_ms)),
            ))
        }
        #[cfg(feature = "backend-remote")]
        "remote" => {
            let r = &config.remote;
            let backend = remote::RemoteClassifier::new(r.url.clone(), r.timeout_seconds)?;
            Ok(ClassifierBackend::Remote(backend))
        }
        _ => Err(BackendError::UnknownBackend(config.backend.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_static_backend() {
        let cfg = ClassificationConfig::test_default();
        let backend = build(&cfg).unwrap();
        assert_eq!(backend.kind(), "static");
    }

    #[tokio::test]
    async fn disabled_static_backend_fails_warm_up() {
        let mut cfg = ClassificationConfig::test_default();
        cfg.static_model.available = false;
        let backend = build(&cfg).unwrap();
        assert!(backend.warm_up().await.is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut cfg = ClassificationConfig::test_default();
        cfg.backend = "onnx".into();
        assert!(matches!(build(&cfg), Err(BackendError::UnknownBackend(ref k)) if k == "onnx"));
    }
}
