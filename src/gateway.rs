//! Gateway assembly: registry, backend and both dispatchers.
//!
//! Start-up sequence ([`Gateway::start`]):
//!   1. Build the classifier backend from config
//!   2. Register the classifier (unready) and the chatbot (ready)
//!   3. Warm up the classifier and record the outcome in the registry
//!
//! The registry is created here and handed to dispatchers explicitly; there is
//! no process-global instance.  [`spawn_probe`] keeps readiness current after
//! start-up.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::{ClassifierBackend, providers};
use crate::config::Config;
use crate::dispatch::{ClassificationDispatcher, ConversationDispatcher};
use crate::error::AppError;
use crate::health::{self, HealthReport};
use crate::registry::{BackendDescriptor, BackendRegistry};
use crate::types::Capability;

pub struct Gateway {
    registry: BackendRegistry,
    classifier: ClassifierBackend,
    classifier_name: String,
    classification: ClassificationDispatcher,
    conversation: ConversationDispatcher,
}

impl Gateway {
    /// Build everything from config, including the configured classifier backend.
    pub async fn start(config: &Config) -> Result<Self, AppError> {
        let backend = providers::build(&config.classification)?;
        Self::with_backend(config, backend).await
    }

    /// Same as [`start`](Self::start) with an injected classifier backend.
    pub async fn with_backend(config: &Config, classifier: ClassifierBackend) -> Result<Self, AppError> {
        let registry = BackendRegistry::new();
        let classifier_name = config.classification.name.clone();

        registry
            .register(BackendDescriptor::new(&classifier_name, Capability::Classification, false))
            .await?;
        registry
            .register(BackendDescriptor::new(&config.conversation.name, Capability::Conversation, true))
            .await?;

        let classification =
            ClassificationDispatcher::new(&config.classification, registry.clone(), classifier.clone());
        let conversation = ConversationDispatcher::new(&config.conversation);

        let gateway = Self { registry, classifier, classifier_name, classification, conversation };
        gateway.probe().await;
        Ok(gateway)
    }

    /// Warm up the classifier and record readiness. Returns the new state.
    pub async fn probe(&self) -> bool {
        let ready = match self.classifier.warm_up().await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    backend = %self.classifier_name,
                    kind = self.classifier.kind(),
                    error = %e,
                    "classifier unavailable, keyword fallback active"
                );
                false
            }
        };
        if let Err(e) = self.registry.set_ready(&self.classifier_name, ready).await {
            error!(backend = %self.classifier_name, error = %e, "failed to record readiness");
        }
        ready
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn classification(&self) -> &ClassificationDispatcher {
        &self.classification
    }

    pub fn conversation(&self) -> &ConversationDispatcher {
        &self.conversation
    }

    pub async fn health(&self) -> HealthReport {
        health::report(&self.registry).await
    }
}

/// Re-probe the classifier every `interval` until `shutdown` is cancelled.
pub fn spawn_probe(
    gateway: Arc<Gateway>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "readiness probe started");
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately; start-up already probed.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let ready = gateway.probe().await;
                    debug!(ready, "readiness probe tick");
                }
            }
        }
        info!("readiness probe stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::providers::fixed::StaticClassifier;
    use crate::health::OverallStatus;
    use crate::types::Source;

    #[tokio::test]
    async fn start_registers_both_backends() {
        let gw = Gateway::start(&Config::test_default()).await.unwrap();
        let names: Vec<_> = gw.registry().snapshot().await.into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["text_classifier", "chatbot"]);
        assert_eq!(gw.health().await.overall, OverallStatus::Healthy);
    }

    #[tokio::test]
    async fn failed_warm_up_degrades_and_falls_back() {
        let cfg = Config::test_default();
        let backend = ClassifierBackend::Static(StaticClassifier::unavailable("no weights"));
        let gw = Gateway::with_backend(&cfg, backend).await.unwrap();

        assert!(!gw.registry().is_ready("text_classifier").await);
        assert_eq!(gw.health().await.overall, OverallStatus::Degraded);
        let res = gw.classification().classify("好").await.unwrap();
        assert_eq!(res.source, Source::Fallback(0));
    }

    #[tokio::test]
    async fn unknown_backend_fails_start() {
        let mut cfg = Config::test_default();
        cfg.classification.backend = "tensorrt".into();
        assert!(matches!(Gateway::start(&cfg).await, Err(AppError::Backend(_))));
    }

    #[tokio::test]
    async fn probe_recovers_readiness() {
        let gw = Gateway::start(&Config::test_default()).await.unwrap();
        gw.registry().set_ready("text_classifier", false).await.unwrap();
        assert!(gw.probe().await);
        assert!(gw.registry().is_ready("text_classifier").await);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_task_runs_and_stops() {
        let gw = Arc::new(Gateway::start(&Config::test_default()).await.unwrap());
        gw.registry().set_ready("text_classifier", false).await.unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn_probe(gw.clone(), Duration::from_secs(30), shutdown.clone());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(gw.registry().is_ready("text_classifier").await);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
