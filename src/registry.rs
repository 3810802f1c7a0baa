//! Backend registry: the one shared mutable resource in the gateway.
//!
//! Holds a [`BackendDescriptor`] per named backend in registration order.
//! Dispatchers keep only the backend *name* and read readiness through a
//! [`BackendRegistry`] handle; initialization and the probe task flip
//! `ready` through [`BackendRegistry::set_ready`].
//!
//! All access goes through a single `RwLock`; readers never observe a
//! partially updated entry.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::GatewayError;
use crate::types::Capability;

// ── BackendDescriptor ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendDescriptor {
    pub name: String,
    pub capability: Capability,
    pub ready: bool,
}

impl BackendDescriptor {
    pub fn new(name: impl Into<String>, capability: Capability, ready: bool) -> Self {
        Self { name: name.into(), capability, ready }
    }
}

// ── BackendRegistry ───────────────────────────────────────────────────────────

/// Shared registry of backend descriptors.
///
/// Clone freely; it is backed by an `Arc` and is `Send + Sync`.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    inner: Arc<RwLock<Vec<BackendDescriptor>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a backend. Names are unique for the lifetime of the process.
    pub async fn register(&self, descriptor: BackendDescriptor) -> Result<(), GatewayError> {
        let mut entries = self.inner.write().await;
        if entries.iter().any(|d| d.name == descriptor.name) {
            return Err(GatewayError::DuplicateName(descriptor.name));
        }
        info!(
            backend = %descriptor.name,
            capability = %descriptor.capability,
            ready = descriptor.ready,
            "backend registered"
        );
        entries.push(descriptor);
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Result<BackendDescriptor, GatewayError> {
        self.inner
            .read()
            .await
            .iter()
            .find(|d| d.name == name)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(name.to_string()))
    }

    /// Update liveness. Setting the current value again is a no-op.
    pub async fn set_ready(&self, name: &str, ready: bool) -> Result<(), GatewayError> {
        let mut entries = self.inner.write().await;
        let entry = entries
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| GatewayError::NotFound(name.to_string()))?;
        if entry.ready != ready {
            info!(backend = %name, ready, "backend readiness changed");
        } else {
            debug!(backend = %name, ready, "backend readiness unchanged");
        }
        entry.ready = ready;
        Ok(())
    }

    /// `false` for unknown names as well as unready backends.
    pub async fn is_ready(&self, name: &str) -> bool {
        self.inner
            .read()
            .await
            .iter()
            .any(|d| d.name == name && d.ready)
    }

    /// All descriptors in registration order.
    pub async fn snapshot(&self) -> Vec<BackendDescriptor> {
        self.inner.read().await.clone()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_get() {
        let registry = BackendRegistry::new();
        registry
            .register(BackendDescriptor::new("primary", Capability::Classification, true))
            .await
            .unwrap();

        let d = registry.get("primary").await.unwrap();
        assert_eq!(d.capability, Capability::Classification);
        assert!(d.ready);
    }

    #[tokio::test]
    async fn duplicate_name_rejected() {
        let registry = BackendRegistry::new();
        registry
            .register(BackendDescriptor::new("chatbot", Capability::Conversation, true))
            .await
            .unwrap();

        let err = registry
            .register(BackendDescriptor::new("chatbot", Capability::Classification, false))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::DuplicateName(ref n) if n == "chatbot"));
        // The original entry is untouched.
        assert_eq!(registry.get("chatbot").await.unwrap().capability, Capability::Conversation);
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let registry = BackendRegistry::new();
        assert!(matches!(registry.get("nope").await, Err(GatewayError::NotFound(_))));
        assert!(matches!(registry.set_ready("nope", true).await, Err(GatewayError::NotFound(_))));
        assert!(!registry.is_ready("nope").await);
    }

    #[tokio::test]
    async fn set_ready_is_idempotent() {
        let registry = BackendRegistry::new();
        registry
            .register(BackendDescriptor::new("primary", Capability::Classification, true))
            .await
            .unwrap();

        registry.set_ready("primary", false).await.unwrap();
        registry.set_ready("primary", false).await.unwrap();
        assert!(!registry.get("primary").await.unwrap().ready);

        registry.set_ready("primary", true).await.unwrap();
        assert!(registry.is_ready("primary").await);
    }

    #[tokio::test]
    async fn snapshot_keeps_registration_order() {
        let registry = BackendRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(BackendDescriptor::new(name, Capability::Conversation, true))
                .await
                .unwrap();
        }

        let names: Vec<_> = registry.snapshot().await.into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        // Stable across calls.
        let again: Vec<_> = registry.snapshot().await.into_iter().map(|d| d.name).collect();
        assert_eq!(names, again);
    }

    #[tokio::test]
    async fn cloned_handle_shares_state() {
        let registry = BackendRegistry::new();
        let cloned = registry.clone();
        registry
            .register(BackendDescriptor::new("primary", Capability::Classification, false))
            .await
            .unwrap();

        cloned.set_ready("primary", true).await.unwrap();
        assert!(registry.is_ready("primary").await);
    }

    #[tokio::test]
    async fn concurrent_writers_and_readers() {
        let registry = BackendRegistry::new();
        registry
            .register(BackendDescriptor::new("primary", Capability::Classification, false))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for i in 0..16 {
            let r = registry.clone();
            tasks.push(tokio::spawn(async move {
                r.set_ready("primary", i % 2 == 0).await.unwrap();
                let d = r.get("primary").await.unwrap();
                assert_eq!(d.name, "primary");
                assert_eq!(d.capability, Capability::Classification);
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(registry.snapshot().await.len(), 1);
    }
}
