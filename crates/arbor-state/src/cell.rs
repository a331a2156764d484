//! Shared store handle with atomic event application.
//!
//! `Store` wraps a `Mutex<StoreState>` so that every dispatched event is
//! applied as one atomic reducer transition and reads always observe a
//! fully-applied state. The store is constructed explicitly with an
//! injected initial state and passed by handle; there is no ambient
//! singleton.

use crate::{reduce, Event, OptimisticUpdate, Path, QueueState, StatusRecord, StoreState};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Shared handle to one document store.
pub struct Store(Mutex<StoreState>);

impl Store {
    /// Create a store from an initial state.
    pub fn new(state: StoreState) -> Self {
        Self(Mutex::new(state))
    }

    /// Create a store from an initial document and path.
    pub fn with_initial(data: Value, path: &str) -> Self {
        Self::new(StoreState::new(data, path))
    }

    /// Apply one event atomically.
    pub fn dispatch(&self, event: &Event) {
        let mut guard = self.lock();
        *guard = reduce(&guard, event);
    }

    /// Acquire a read lock on the state.
    ///
    /// The returned guard dereferences to `&StoreState`. Callers should
    /// clone any needed data before dropping the guard.
    #[inline]
    pub fn state(&self) -> MutexGuard<'_, StoreState> {
        self.lock()
    }

    /// Clone the full current state.
    pub fn snapshot(&self) -> StoreState {
        self.lock().clone()
    }

    /// Clone the current document.
    pub fn document(&self) -> Value {
        self.lock().data.clone()
    }

    /// The current absolute path.
    pub fn xpath(&self) -> Path {
        self.lock().xpath.clone()
    }

    /// Clone the navigation history, most recent first.
    pub fn history(&self) -> Vec<Path> {
        self.lock().history.clone()
    }

    /// Read the value at a path expression, resolved against the current
    /// path.
    pub fn data_at(&self, path: &str) -> Option<Value> {
        self.lock().data_at(path).cloned()
    }

    /// Status record for a path expression, if one is tracked.
    pub fn status_at(&self, path: &str) -> Option<StatusRecord> {
        self.lock().status_at(path).cloned()
    }

    /// Clone the queue mirror.
    pub fn queue(&self) -> QueueState {
        self.lock().queue.clone()
    }

    /// Clone the optimistic update table.
    pub fn optimistic(&self) -> HashMap<String, OptimisticUpdate> {
        self.lock().optimistic.clone()
    }

    /// Whether a request id has an operation in flight.
    pub fn is_request_pending(&self, request_id: &str) -> bool {
        self.lock().pending_requests.contains(request_id)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Store").field(&"<StoreState>").finish()
    }
}
