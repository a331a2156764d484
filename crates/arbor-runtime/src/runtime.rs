//! The runtime: one store, one scheduler, and the submission surface.
//!
//! A `Runtime` is constructed explicitly from an injected initial state and
//! passed by handle to every consumer. It wires the store and the command
//! queue together and carries the per-path timing registry used for
//! staleness checks and cache sweeping.

use crate::clock::now_ms;
use crate::config::OperationConfig;
use crate::observer::{Observer, ObserverSet};
use crate::operation::Operation;
use crate::queue::CommandQueue;
use arbor_state::{CommandKind, Event, OpStatus, Priority, Store, StoreState};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Stale/cache horizons remembered per path, captured at submission.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct PathTiming {
    pub(crate) stale_time_ms: Option<u64>,
    pub(crate) cache_time_ms: Option<u64>,
}

/// Handle owning one document store and its command queue.
pub struct Runtime {
    store: Arc<Store>,
    queue: Arc<CommandQueue>,
    observers: Arc<ObserverSet>,
    timings: Mutex<HashMap<String, PathTiming>>,
}

impl Runtime {
    /// Create a runtime from an initial document and path.
    pub fn new(data: Value, path: &str) -> Self {
        Self::with_state(StoreState::new(data, path))
    }

    /// Create a runtime from a fully specified initial state.
    ///
    /// The queue concurrency bound is taken from the state's queue table.
    pub fn with_state(state: StoreState) -> Self {
        let max_concurrent = state.queue.max_concurrent;
        let store = Arc::new(Store::new(state));
        let observers = Arc::new(ObserverSet::default());
        let queue = Arc::new(CommandQueue::new(
            Arc::clone(&store),
            Arc::clone(&observers),
            max_concurrent,
        ));
        Self {
            store,
            queue,
            observers,
            timings: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying store handle.
    #[inline]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// The underlying command queue.
    #[inline]
    pub fn queue(&self) -> &Arc<CommandQueue> {
        &self.queue
    }

    /// Apply one event to the store.
    #[inline]
    pub fn dispatch(&self, event: &Event) {
        self.store.dispatch(event);
    }

    /// Register a settlement observer.
    pub fn register_observer(&self, observer: Arc<dyn Observer>) {
        self.observers.register(observer);
    }

    /// Schedule a fetch at high priority with default config.
    ///
    /// Returns the request id shared by the command and its status records.
    pub fn fetch(&self, path: &str, operation: Arc<dyn Operation>) -> String {
        self.submit(
            path,
            CommandKind::Fetch,
            Priority::High,
            operation,
            OperationConfig::default(),
        )
    }

    /// Schedule a fetch with explicit config.
    pub fn fetch_with_config(
        &self,
        path: &str,
        operation: Arc<dyn Operation>,
        config: OperationConfig,
    ) -> String {
        self.submit(path, CommandKind::Fetch, Priority::High, operation, config)
    }

    /// Schedule a mutation at normal priority with default config.
    pub fn mutate(&self, path: &str, operation: Arc<dyn Operation>) -> String {
        self.submit(
            path,
            CommandKind::Mutate,
            Priority::Normal,
            operation,
            OperationConfig::default(),
        )
    }

    /// Schedule a mutation with explicit config.
    pub fn mutate_with_config(
        &self,
        path: &str,
        operation: Arc<dyn Operation>,
        config: OperationConfig,
    ) -> String {
        self.submit(path, CommandKind::Mutate, Priority::Normal, operation, config)
    }

    /// Schedule an async operation against a path.
    ///
    /// Dispatches the start event (applying any optimistic value computed
    /// from the data read at this moment) and enqueues the command. The
    /// read-then-dispatch window is racy under concurrent submissions to
    /// the same path; settlement order decides the final value.
    pub fn submit(
        &self,
        path: &str,
        kind: CommandKind,
        priority: Priority,
        operation: Arc<dyn Operation>,
        config: OperationConfig,
    ) -> String {
        let resolved = self.store.state().resolve(path).to_string();

        let optimistic_data = config.optimistic.as_ref().map(|spec| {
            let current = self.store.data_at(&resolved).unwrap_or(Value::Null);
            spec.evaluate(&current, config.variables.as_ref())
        });

        self.timings.lock().unwrap_or_else(|p| p.into_inner()).insert(
            resolved.clone(),
            PathTiming {
                stale_time_ms: config.stale_time_ms,
                cache_time_ms: config.cache_time_ms,
            },
        );

        let rollback_on_error = config.rollback_on_error;
        let command = self
            .queue
            .create_command(&resolved, kind, priority, operation, config);
        let request_id = command.info.id.clone();

        self.store.dispatch(&Event::AsyncStart {
            path: resolved,
            request_id: request_id.clone(),
            kind,
            priority,
            timestamp: command.info.timestamp,
            optimistic_data,
            rollback_on_error,
        });
        self.queue.enqueue(command);
        request_id
    }

    /// Re-issue a fetch-priority start for a path that already has a
    /// tracked status record.
    ///
    /// The surrounding binding layer is responsible for re-invoking the
    /// actual fetch operation; this only re-marks the path as loading.
    /// Returns false when the path is untracked.
    pub fn revalidate(&self, path: &str) -> bool {
        let resolved = self.store.state().resolve(path).to_string();
        if self.store.state().status.get(&resolved).is_none() {
            return false;
        }
        self.store.dispatch(&Event::AsyncStart {
            path: resolved,
            request_id: Uuid::new_v4().to_string(),
            kind: CommandKind::Fetch,
            priority: Priority::High,
            timestamp: now_ms(),
            optimistic_data: None,
            rollback_on_error: false,
        });
        true
    }

    /// Whether a path's data needs refreshing.
    ///
    /// True when the path has no status record at all, or its last success
    /// is older than the stale horizon it was submitted with. Loading and
    /// error records are not stale: there is either work in flight or a
    /// failure to surface first.
    pub fn is_stale(&self, path: &str) -> bool {
        let resolved = self.store.state().resolve(path).to_string();
        let record = self.store.state().status.get(&resolved).cloned();
        match record {
            None => true,
            Some(record) if record.status == OpStatus::Success => {
                match self.timing_for(&resolved).stale_time_ms {
                    Some(horizon) => now_ms().saturating_sub(record.timestamp) > horizon,
                    None => false,
                }
            }
            Some(_) => false,
        }
    }

    /// Invalidate every path whose last success outlived its cache
    /// horizon, clearing its stored data. Returns the number of paths
    /// swept.
    pub fn sweep_expired(&self) -> usize {
        let now = now_ms();
        let expired: Vec<String> = {
            let state = self.store.state();
            state
                .status
                .iter()
                .filter(|(path, record)| {
                    record.status == OpStatus::Success
                        && self
                            .timing_for(path)
                            .cache_time_ms
                            .is_some_and(|horizon| now.saturating_sub(record.timestamp) > horizon)
                })
                .map(|(path, _)| path.clone())
                .collect()
        };
        for path in &expired {
            self.invalidate(
                path,
                &crate::invalidate::InvalidateOptions {
                    clear_data: true,
                    ..Default::default()
                },
            );
            self.timings
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .remove(path);
        }
        expired.len()
    }

    pub(crate) fn timing_for(&self, path: &str) -> PathTiming {
        self.timings
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(path)
            .copied()
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").field("queue", &self.queue).finish()
    }
}
