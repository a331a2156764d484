//! The document store state and its event reducer.
//!
//! State is advanced exclusively by [`reduce`], a pure total function:
//! every event yields a new state value, malformed transitions are absorbed
//! as no-ops, and the input state is never mutated.

use crate::{
    apply_op, optimistic_key, Event, Op, OpStatus, OptimisticUpdate, Path, QueueState,
    StatusRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Aggregate state of one document store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    /// The document tree.
    pub data: Value,
    /// Current absolute path.
    pub xpath: Path,
    /// Previously visited paths, most recent first.
    pub history: Vec<Path>,
    /// Offset into `history` for back/forward stepping; `0` is the live
    /// edge. Invariant: `location <= history.len()`.
    pub location: usize,
    /// Per-path status records, keyed by absolute path string.
    pub status: HashMap<String, StatusRecord>,
    /// Request ids with operations currently in flight.
    pub pending_requests: HashSet<String>,
    /// Pending optimistic updates, keyed by `{request_id}_{path}`.
    pub optimistic: HashMap<String, OptimisticUpdate>,
    /// Mirror of the command queue.
    pub queue: QueueState,
}

impl StoreState {
    /// Create the initial state from a caller-supplied document and path.
    pub fn new(data: Value, path: &str) -> Self {
        Self {
            data,
            xpath: Path::parse(path),
            history: Vec::new(),
            location: 0,
            status: HashMap::new(),
            pending_requests: HashSet::new(),
            optimistic: HashMap::new(),
            queue: QueueState::default(),
        }
    }

    /// Override the queue concurrency bound (default 3).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.queue.max_concurrent = max_concurrent;
        self
    }

    /// Resolve a path expression against the current path.
    #[inline]
    pub fn resolve(&self, path: &str) -> Path {
        self.xpath.resolve(path)
    }

    /// Read the value at a path expression, resolved against the current
    /// path.
    pub fn data_at(&self, path: &str) -> Option<&Value> {
        crate::get_at_path(&self.data, &self.resolve(path))
    }

    /// Status record for a path expression, if one is tracked.
    pub fn status_at(&self, path: &str) -> Option<&StatusRecord> {
        self.status.get(&self.resolve(path).to_string())
    }
}

impl Default for StoreState {
    fn default() -> Self {
        Self::new(Value::Object(Default::default()), "/")
    }
}

/// Apply one event to a state, producing the next state.
pub fn reduce(state: &StoreState, event: &Event) -> StoreState {
    match event {
        Event::Navigate { path } => navigate(state, path),
        Event::Back { steps } => step_back(state, *steps),
        Event::Forward { steps } => step_forward(state, *steps),
        Event::DataOperation { path, kind, value } => {
            let resolved = state.resolve(path);
            let op = Op::from_kind(*kind, resolved, value.clone().unwrap_or(Value::Null));
            match apply_op(&state.data, &op) {
                Ok(data) => {
                    let mut next = state.clone();
                    next.data = data;
                    next
                }
                // Write failures leave the state untouched; validation is
                // the engine API's concern, the reducer stays total.
                Err(_) => state.clone(),
            }
        }
        Event::AsyncStart {
            path,
            request_id,
            timestamp,
            optimistic_data,
            rollback_on_error,
            ..
        } => {
            let resolved = state.resolve(path);
            let key = resolved.to_string();
            let mut next = state.clone();
            if let Some(speculative) = optimistic_data {
                next.optimistic.insert(
                    optimistic_key(request_id, &key),
                    OptimisticUpdate {
                        original_data: state.data.clone(),
                        optimistic_data: speculative.clone(),
                        rollback_on_error: *rollback_on_error,
                    },
                );
                if let Ok(data) =
                    apply_op(&state.data, &Op::replace(resolved.clone(), speculative.clone()))
                {
                    next.data = data;
                }
            }
            next.status.insert(
                key,
                StatusRecord::new(OpStatus::Loading, *timestamp, request_id.clone()),
            );
            next.pending_requests.insert(request_id.clone());
            next
        }
        Event::AsyncSuccess {
            path,
            request_id,
            data,
            timestamp,
        } => {
            let resolved = state.resolve(path);
            let key = resolved.to_string();
            let mut next = state.clone();
            if let Ok(updated) = apply_op(&state.data, &Op::replace(resolved.clone(), data.clone()))
            {
                next.data = updated;
            }
            next.status.insert(
                key.clone(),
                StatusRecord::new(OpStatus::Success, *timestamp, request_id.clone()),
            );
            next.pending_requests.remove(request_id);
            next.optimistic.remove(&optimistic_key(request_id, &key));
            next
        }
        Event::AsyncError {
            path,
            request_id,
            error,
            should_rollback,
            timestamp,
        } => {
            let resolved = state.resolve(path);
            let key = resolved.to_string();
            let mut next = state.clone();
            next.status.insert(
                key.clone(),
                StatusRecord::error(*timestamp, request_id.clone(), error.clone()),
            );
            next.pending_requests.remove(request_id);
            if let Some(record) = next.optimistic.remove(&optimistic_key(request_id, &key)) {
                if *should_rollback && record.rollback_on_error {
                    next.data = record.original_data;
                }
            }
            next
        }
        Event::AsyncCancel {
            path,
            request_id,
            timestamp,
        } => {
            let resolved = state.resolve(path);
            let key = resolved.to_string();
            let mut next = state.clone();
            next.status.insert(
                key.clone(),
                StatusRecord::new(OpStatus::Idle, *timestamp, request_id.clone()),
            );
            next.pending_requests.remove(request_id);
            // Cancellation always rolls back speculative data.
            if let Some(record) = next.optimistic.remove(&optimistic_key(request_id, &key)) {
                next.data = record.original_data;
            }
            next
        }
        Event::CommandQueueUpdate { update } => {
            let mut next = state.clone();
            next.queue = state.queue.apply(update);
            next
        }
    }
}

fn navigate(state: &StoreState, path: &str) -> StoreState {
    let resolved = state.resolve(path);
    if resolved == state.xpath {
        return state.clone();
    }
    let mut next = state.clone();
    // Drop the first `location` entries: forward history plus the entry
    // for the current path, which is re-pushed at the head below.
    let mut history: Vec<Path> = state.history[state.location.min(state.history.len())..].to_vec();
    history.insert(0, state.xpath.clone());
    next.history = history;
    next.location = 0;
    next.xpath = resolved;
    next
}

fn step_back(state: &StoreState, steps: usize) -> StoreState {
    let steps = steps.max(1);
    let target = state.location + steps;
    // The live-edge path is not part of history, so the deepest reachable
    // offset is history.len() - 1; going past it is a no-op.
    if target >= state.history.len() {
        return state.clone();
    }
    let mut next = state.clone();
    next.location = target;
    next.xpath = state.history[target - 1].clone();
    next
}

fn step_forward(state: &StoreState, steps: usize) -> StoreState {
    let steps = steps.max(1);
    if steps > state.location {
        return state.clone();
    }
    let target = state.location - steps;
    let mut next = state.clone();
    next.location = target;
    if target > 0 {
        next.xpath = state.history[target - 1].clone();
    }
    next
}
