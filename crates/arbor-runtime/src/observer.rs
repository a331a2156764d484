//! Settlement observers.
//!
//! Observers replace inline callbacks: they are registered once on the
//! runtime and notified after the corresponding reducer event has been
//! dispatched, so a notified observer always sees the settled state.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, RwLock};

/// Receives settlement notifications for async operations.
///
/// All methods default to no-ops; implement the ones of interest.
/// Cancelled commands settle silently and notify nothing.
#[async_trait]
pub trait Observer: Send + Sync {
    /// An operation resolved with data; the store already holds it.
    async fn on_success(&self, path: &str, request_id: &str, data: &Value) {
        let _ = (path, request_id, data);
    }

    /// An operation failed terminally; the store holds the error record.
    async fn on_error(&self, path: &str, request_id: &str, error: &str) {
        let _ = (path, request_id, error);
    }

    /// An operation settled, successfully or not.
    async fn on_settled(&self, path: &str, request_id: &str) {
        let _ = (path, request_id);
    }
}

/// Shared set of registered observers.
#[derive(Default)]
pub(crate) struct ObserverSet {
    observers: RwLock<Vec<Arc<dyn Observer>>>,
}

impl ObserverSet {
    pub(crate) fn register(&self, observer: Arc<dyn Observer>) {
        self.observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(observer);
    }

    fn snapshot(&self) -> Vec<Arc<dyn Observer>> {
        self.observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub(crate) async fn notify_success(&self, path: &str, request_id: &str, data: &Value) {
        for observer in self.snapshot() {
            observer.on_success(path, request_id, data).await;
            observer.on_settled(path, request_id).await;
        }
    }

    pub(crate) async fn notify_error(&self, path: &str, request_id: &str, error: &str) {
        for observer in self.snapshot() {
            observer.on_error(path, request_id, error).await;
            observer.on_settled(path, request_id).await;
        }
    }
}
