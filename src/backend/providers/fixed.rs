//! Static classifier: returns one configured label and score for any input.
//! Stands in for an offline pretrained model and doubles as the test backend.

use std::time::Duration;

use crate::backend::{BackendError, Classification};

#[derive(Debug, Clone)]
pub struct StaticClassifier {
    output: Classification,
    /// `Some(reason)` simulates a model that failed to load.
    unavailable: Option<String>,
    latency: Duration,
}

impl StaticClassifier {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            output: Classification { label: label.into(), score },
            unavailable: None,
            latency: Duration::ZERO,
        }
    }

    /// A backend whose warm-up and every call fail with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            output: Classification { label: String::new(), score: 0.0 },
            unavailable: Some(reason.into()),
            latency: Duration::ZERO,
        }
    }

    /// Delay every `classify` call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub async fn classify(&self, _text: &str) -> Result<Classification, BackendError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.unavailable {
            Some(reason) => Err(BackendError::Request(reason.clone())),
            None => Ok(self.output.clone()),
        }
    }

    pub async fn warm_up(&self) -> Result<(), BackendError> {
        match &self.unavailable {
            Some(reason) => Err(BackendError::Request(format!("model load failed: {reason}"))),
            None => Ok(()),
        }
    }
}
