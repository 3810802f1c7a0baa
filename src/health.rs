//! Health reporter: folds registry readiness into one status snapshot.
//!
//! Conversation backends are pure logic and always ready, so only
//! classification backends can degrade the gateway.  [`report`] has no side
//! effects; endpoints call it on every request.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::registry::{BackendDescriptor, BackendRegistry};
use crate::types::Capability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendHealth {
    pub name: String,
    pub capability: Capability,
    pub ready: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub overall: OverallStatus,
    /// Same order as registry registration.
    pub backends: Vec<BackendHealth>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// Build a report from a registry snapshot.
    pub fn from_snapshot(snapshot: Vec<BackendDescriptor>) -> Self {
        let degraded = snapshot
            .iter()
            .any(|d| d.capability == Capability::Classification && !d.ready);
        let backends = snapshot
            .into_iter()
            .map(|d| BackendHealth { name: d.name, capability: d.capability, ready: d.ready })
            .collect();
        Self {
            overall: if degraded { OverallStatus::Degraded } else { OverallStatus::Healthy },
            backends,
            checked_at: Utc::now(),
        }
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name.as_str()).collect()
    }
}

/// Snapshot the registry and summarise it.
pub async fn report(registry: &BackendRegistry) -> HealthReport {
    HealthReport::from_snapshot(registry.snapshot().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry(entries: &[(&str, Capability, bool)]) -> BackendRegistry {
        let r = BackendRegistry::new();
        for (name, cap, ready) in entries {
            r.register(BackendDescriptor::new(*name, *cap, *ready)).await.unwrap();
        }
        r
    }

    #[tokio::test]
    async fn all_ready_is_healthy() {
        let r = registry(&[
            ("text_classifier", Capability::Classification, true),
            ("chatbot", Capability::Conversation, true),
        ])
        .await;
        let rep = report(&r).await;
        assert_eq!(rep.overall, OverallStatus::Healthy);
        assert_eq!(rep.service_names(), vec!["text_classifier", "chatbot"]);
    }

    #[tokio::test]
    async fn unready_classifier_degrades() {
        let r = registry(&[
            ("text_classifier", Capability::Classification, false),
            ("chatbot", Capability::Conversation, true),
        ])
        .await;
        let rep = report(&r).await;
        assert_eq!(rep.overall, OverallStatus::Degraded);
        assert!(!rep.backends[0].ready);
    }

    #[tokio::test]
    async fn unready_conversation_does_not_degrade() {
        let r = registry(&[
            ("text_classifier", Capability::Classification, true),
            ("chatbot", Capability::Conversation, false),
        ])
        .await;
        assert_eq!(report(&r).await.overall, OverallStatus::Healthy);
    }

    #[tokio::test]
    async fn empty_registry_is_healthy() {
        let rep = report(&BackendRegistry::new()).await;
        assert_eq!(rep.overall, OverallStatus::Healthy);
        assert!(rep.backends.is_empty());
    }

    #[tokio::test]
    async fn degraded_iff_any_classifier_unready() {
        for (a, b) in [(true, true), (true, false), (false, true), (false, false)] {
            let r = registry(&[
                ("c1", Capability::Classification, a),
                ("chat", Capability::Conversation, false),
                ("c2", Capability::Classification, b),
            ])
            .await;
            let expected = if a && b { OverallStatus::Healthy } else { OverallStatus::Degraded };
            assert_eq!(report(&r).await.overall, expected, "c1={a} c2={b}");
        }
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(OverallStatus::Degraded).unwrap(), "degraded");
    }
}
