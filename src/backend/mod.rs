//! Classifier backend abstraction.
//!
//! `ClassifierBackend` is an enum over concrete backend implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Backend instances are shared immutable capabilities; clone them freely.
//! The gateway treats every call as a black box: errors and timeouts are
//! turned into strategy declines by the caller, never surfaced to clients.

pub mod providers;

use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("unknown backend: {0}")]
    UnknownBackend(String),
    #[error("backend request failed: {0}")]
    Request(String),
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

// ── Classification ────────────────────────────────────────────────────────────

/// Raw model output. `score` is unvalidated until the strategy checks it.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub score: f64,
}

// ── Backend enum ──────────────────────────────────────────────────────────────

/// All available classifier backends.
#[derive(Debug, Clone)]
pub enum ClassifierBackend {
    Static(providers::fixed::StaticClassifier),
    #[cfg(feature = "backend-remote")]
    Remote(providers::remote::RemoteClassifier),
}

impl ClassifierBackend {
    /// Short kind name for logs and health details.
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierBackend::Static(_) => "static",
            #[cfg(feature = "backend-remote")]
            ClassifierBackend::Remote(_) => "remote",
        }
    }

    /// Classify `text` and return the model's label and score.
    pub async fn classify(&self, text: &str) -> Result<Classification, BackendError> {
        match self {
            ClassifierBackend::Static(b) => b.classify(text).await,
            #[cfg(feature = "backend-remote")]
            ClassifierBackend::Remote(b) => b.classify(text).await,
        }
    }

    /// Initialization / liveness probe. `Ok` means the backend may be marked ready.
    pub async fn warm_up(&self) -> Result<(), BackendError> {
        match self {
            ClassifierBackend::Static(b) => b.warm_up().await,
            #[cfg(feature = "backend-remote")]
            ClassifierBackend::Remote(b) => b.warm_up().await,
        }
    }
}
