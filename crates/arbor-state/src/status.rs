//! Per-path operation status and optimistic update records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of the most recent async operation on a path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpStatus {
    /// No operation in flight; any previous one was cancelled or never ran.
    #[default]
    Idle,
    /// An operation is in flight.
    Loading,
    /// The last operation completed with data.
    Success,
    /// The last operation failed terminally.
    Error,
}

/// Status record tracked per absolute path.
///
/// Exactly one record exists per path at a time; a newer operation on the
/// same path overwrites the previous record's identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Current lifecycle status.
    pub status: OpStatus,
    /// Milliseconds timestamp of the last transition.
    pub timestamp: u64,
    /// Identifier of the operation that owns this record.
    pub request_id: String,
    /// Error payload for `Error` records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusRecord {
    /// Create a record in the given status with no error payload.
    pub fn new(status: OpStatus, timestamp: u64, request_id: impl Into<String>) -> Self {
        Self {
            status,
            timestamp,
            request_id: request_id.into(),
            error: None,
        }
    }

    /// Create an `Error` record carrying the failure payload.
    pub fn error(timestamp: u64, request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: OpStatus::Error,
            timestamp,
            request_id: request_id.into(),
            error: Some(error.into()),
        }
    }
}

/// A pending speculative write, reversible via the stored snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimisticUpdate {
    /// Full document snapshot taken before the speculative write.
    pub original_data: Value,
    /// The speculative value applied at the path.
    pub optimistic_data: Value,
    /// Whether an error settlement restores `original_data`.
    pub rollback_on_error: bool,
}

/// Key for the optimistic update table: `{request_id}_{absolute_path}`.
#[inline]
pub fn optimistic_key(request_id: &str, path: &str) -> String {
    format!("{request_id}_{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_record_constructors() {
        let rec = StatusRecord::new(OpStatus::Loading, 100, "req-1");
        assert_eq!(rec.status, OpStatus::Loading);
        assert_eq!(rec.error, None);

        let rec = StatusRecord::error(200, "req-1", "boom");
        assert_eq!(rec.status, OpStatus::Error);
        assert_eq!(rec.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_optimistic_key_format() {
        assert_eq!(optimistic_key("r1", "/users[0]"), "r1_/users[0]");
    }

    #[test]
    fn test_status_serde() {
        let rec = StatusRecord::new(OpStatus::Success, 1, "r");
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"success\""));
        assert!(!json.contains("\"error\""));
        let parsed: StatusRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rec);
    }
}
