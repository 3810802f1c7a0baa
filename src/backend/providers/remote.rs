//! Remote classifier: POSTs `{"text": ...}` to an external model server.
//!
//! Accepts either a single `{label, score}` object or a pipeline-style list
//! `[{label, score}, ...]` (first element wins).  All wire types are private
//! to this module.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::backend::{BackendError, Classification};

/// Adapter for an HTTP classification endpoint.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct RemoteClassifier {
    client: Client,
    url: String,
}

impl RemoteClassifier {
    pub fn new(url: String, timeout_seconds: u64) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| BackendError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, url })
    }

    /// Reachability probe.
    ///
    /// Any HTTP response (including 4xx) means the server is up; only a
    /// transport failure counts as unreachable.  Hard 5-second timeout.
    pub async fn warm_up(&self) -> Result<(), BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| BackendError::Request(format!("failed to build probe client: {e}")))?;
        client
            .head(&self.url)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| BackendError::Request(format!("unreachable: {e}")))
    }

    pub async fn classify(&self, text: &str) -> Result<Classification, BackendError> {
        debug!(url = %self.url, text_len = text.len(), "sending classify request");

        let response = self
            .client
            .post(&self.url)
            .json(&ClassifyRequest { text })
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.url, error = %e, "classify request failed (transport)");
                BackendError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            error!(%status, "classify request returned HTTP error");
            return Err(BackendError::Request(format!("HTTP {status}: {body}")));
        }

        let parsed = response
            .json::<ClassifyResponse>()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("failed to parse response body: {e}")))?;

        let label = match parsed {
            ClassifyResponse::One(l) => Some(l),
            ClassifyResponse::Many(list) => list.into_iter().next(),
        }
        .ok_or_else(|| BackendError::InvalidResponse("empty label list".into()))?;

        Ok(Classification { label: label.label, score: label.score })
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    One(WireLabel),
    Many(Vec<WireLabel>),
}

#[derive(Deserialize)]
struct WireLabel {
    label: String,
    #[serde(alias = "confidence")]
    score: f64,
}
