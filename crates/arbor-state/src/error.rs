//! Error types for arbor-state operations.

use crate::Path;
use thiserror::Error;

/// Result type alias for arbor-state operations.
pub type ArborResult<T> = Result<T, ArborError>;

/// Errors that can occur during document and store operations.
#[derive(Debug, Error)]
pub enum ArborError {
    /// Path does not exist in the document.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was not found.
        path: Path,
    },

    /// Array index is out of bounds for an explicit item operation.
    #[error("index {index} out of bounds (len: {len}) at path {path}")]
    IndexOutOfBounds {
        /// The path to the array.
        path: Path,
        /// The index that was accessed.
        index: usize,
        /// The actual length of the array.
        len: usize,
    },

    /// Append operation requires an array value at the leaf.
    #[error("append requires array value at {path}")]
    AppendRequiresArray {
        /// The path where a non-array was found.
        path: Path,
    },

    /// A path pattern could not be compiled into a matcher.
    #[error("invalid pattern: {pattern}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
    },

    /// Invalid operation error.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of what went wrong.
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ArborError {
    /// Create a path not found error.
    #[inline]
    pub fn path_not_found(path: Path) -> Self {
        ArborError::PathNotFound { path }
    }

    /// Create an index out of bounds error.
    #[inline]
    pub fn index_out_of_bounds(path: Path, index: usize, len: usize) -> Self {
        ArborError::IndexOutOfBounds { path, index, len }
    }

    /// Create an append requires array error.
    #[inline]
    pub fn append_requires_array(path: Path) -> Self {
        ArborError::AppendRequiresArray { path }
    }

    /// Create an invalid pattern error.
    #[inline]
    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        ArborError::InvalidPattern {
            pattern: pattern.into(),
        }
    }

    /// Create an invalid operation error.
    #[inline]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        ArborError::InvalidOperation {
            message: message.into(),
        }
    }
}

/// Get the type name of a JSON value.
#[inline]
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArborError::index_out_of_bounds(Path::parse("/items"), 5, 2);
        assert_eq!(err.to_string(), "index 5 out of bounds (len: 2) at path /items");
    }

    #[test]
    fn test_value_type_name() {
        use serde_json::json;

        assert_eq!(value_type_name(&json!(null)), "null");
        assert_eq!(value_type_name(&json!([1])), "array");
        assert_eq!(value_type_name(&json!({"a": 1})), "object");
    }
}
