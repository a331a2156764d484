//! Events accepted by the store reducer.
//!
//! Every state transition is expressed as one of these events. Paths in
//! events are expressions, resolved against the store's current path when
//! the event is applied; async events carry caller-supplied timestamps so
//! the reducer itself stays pure.

use crate::{CommandKind, OpKind, Priority, QueueUpdate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A state transition request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Change the current path, pushing the old one onto history.
    Navigate {
        /// Path expression, resolved against the current path.
        path: String,
    },

    /// Step backwards through navigation history.
    Back {
        /// Number of steps; zero is treated as one.
        steps: usize,
    },

    /// Step forwards through navigation history.
    Forward {
        /// Number of steps; zero is treated as one.
        steps: usize,
    },

    /// Apply a structural write to the document.
    DataOperation {
        /// Path expression, resolved against the current path.
        path: String,
        /// Which write to perform.
        kind: OpKind,
        /// Payload; ignored for deletes.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },

    /// An async operation started for a path.
    AsyncStart {
        /// Path expression, resolved against the current path.
        path: String,
        /// Identifier of the operation.
        request_id: String,
        /// Fetch or mutate.
        kind: CommandKind,
        /// Scheduling priority the operation ran with.
        priority: Priority,
        /// Milliseconds timestamp of the start.
        timestamp: u64,
        /// Speculative value to apply immediately, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        optimistic_data: Option<Value>,
        /// Whether an error settlement should restore the snapshot.
        #[serde(default)]
        rollback_on_error: bool,
    },

    /// An async operation resolved with data.
    AsyncSuccess {
        /// Path expression, resolved against the current path.
        path: String,
        /// Identifier of the operation.
        request_id: String,
        /// Authoritative value for the path.
        data: Value,
        /// Milliseconds timestamp of the settlement.
        timestamp: u64,
    },

    /// An async operation failed terminally.
    AsyncError {
        /// Path expression, resolved against the current path.
        path: String,
        /// Identifier of the operation.
        request_id: String,
        /// Failure payload.
        error: String,
        /// Whether to restore the optimistic snapshot, if one exists.
        should_rollback: bool,
        /// Milliseconds timestamp of the settlement.
        timestamp: u64,
    },

    /// An async operation was cancelled. Always rolls back optimistic data.
    AsyncCancel {
        /// Path expression, resolved against the current path.
        path: String,
        /// Identifier of the operation.
        request_id: String,
        /// Milliseconds timestamp of the cancellation.
        timestamp: u64,
    },

    /// Mirror a scheduler transition into the queue table.
    CommandQueueUpdate {
        /// The queue transition.
        update: QueueUpdate,
    },
}

impl Event {
    /// Create a navigation event.
    #[inline]
    pub fn navigate(path: impl Into<String>) -> Self {
        Event::Navigate { path: path.into() }
    }

    /// Create a back event.
    #[inline]
    pub fn back(steps: usize) -> Self {
        Event::Back { steps }
    }

    /// Create a forward event.
    #[inline]
    pub fn forward(steps: usize) -> Self {
        Event::Forward { steps }
    }

    /// Create a data operation event.
    #[inline]
    pub fn data_operation(path: impl Into<String>, kind: OpKind, value: Option<Value>) -> Self {
        Event::DataOperation {
            path: path.into(),
            kind,
            value,
        }
    }

    /// Short label for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Navigate { .. } => "navigate",
            Event::Back { .. } => "back",
            Event::Forward { .. } => "forward",
            Event::DataOperation { .. } => "data_operation",
            Event::AsyncStart { .. } => "async_start",
            Event::AsyncSuccess { .. } => "async_success",
            Event::AsyncError { .. } => "async_error",
            Event::AsyncCancel { .. } => "async_cancel",
            Event::CommandQueueUpdate { .. } => "command_queue_update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serde_tagged() {
        let event = Event::data_operation("/users", OpKind::Replace, Some(json!({"a": 1})));
        let encoded = serde_json::to_string(&event).unwrap();
        assert!(encoded.contains("\"type\":\"data_operation\""));
        let parsed: Event = serde_json::from_str(&encoded).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_delete_event_omits_value() {
        let event = Event::data_operation("/users", OpKind::Delete, None);
        let encoded = serde_json::to_string(&event).unwrap();
        assert!(!encoded.contains("\"value\""));
    }

    #[test]
    fn test_event_names() {
        assert_eq!(Event::navigate("/x").name(), "navigate");
        assert_eq!(Event::back(1).name(), "back");
    }
}
