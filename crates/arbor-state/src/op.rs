//! Structural operations on document trees.
//!
//! Each operation describes a single change applied at a path. Operations
//! are applied immutably: the engine in [`crate::apply`] always produces a
//! new document value.

use crate::Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of a structural operation, without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Set the value at the path.
    Replace,
    /// Shallow-merge an object into the value at the path.
    Merge,
    /// Push a value onto the array at the path.
    Append,
    /// Remove the value at the path.
    Delete,
}

/// A single structural operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    /// Set a value at the path.
    ///
    /// Creates intermediate containers as needed; at the document root it
    /// replaces the document wholesale.
    Replace {
        /// Target path.
        path: Path,
        /// Value to set.
        value: Value,
    },

    /// Shallow-merge an object into the value at the path.
    ///
    /// When either side is not an object the incoming value replaces the
    /// existing one.
    Merge {
        /// Target path.
        path: Path,
        /// Object to merge.
        value: Value,
    },

    /// Append a value to the array at the path.
    ///
    /// Creates the array if the leaf is absent. Fails if the leaf exists
    /// but is not an array.
    Append {
        /// Target path (must address an array or nothing).
        path: Path,
        /// Value to append.
        value: Value,
    },

    /// Delete the value at the path.
    ///
    /// Removes the leaf key from an object, or splices the indexed element
    /// out of an array. At the root it clears the document to an empty
    /// object.
    Delete {
        /// Target path.
        path: Path,
    },
}

impl Op {
    /// Create a Replace operation.
    #[inline]
    pub fn replace(path: Path, value: impl Into<Value>) -> Self {
        Op::Replace {
            path,
            value: value.into(),
        }
    }

    /// Create a Merge operation.
    #[inline]
    pub fn merge(path: Path, value: impl Into<Value>) -> Self {
        Op::Merge {
            path,
            value: value.into(),
        }
    }

    /// Create an Append operation.
    #[inline]
    pub fn append(path: Path, value: impl Into<Value>) -> Self {
        Op::Append {
            path,
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    #[inline]
    pub fn delete(path: Path) -> Self {
        Op::Delete { path }
    }

    /// Build an operation from its kind and payload.
    ///
    /// `Delete` ignores the value.
    pub fn from_kind(kind: OpKind, path: Path, value: Value) -> Self {
        match kind {
            OpKind::Replace => Op::Replace { path, value },
            OpKind::Merge => Op::Merge { path, value },
            OpKind::Append => Op::Append { path, value },
            OpKind::Delete => Op::Delete { path },
        }
    }

    /// Get the path this operation targets.
    #[inline]
    pub fn path(&self) -> &Path {
        match self {
            Op::Replace { path, .. } => path,
            Op::Merge { path, .. } => path,
            Op::Append { path, .. } => path,
            Op::Delete { path } => path,
        }
    }

    /// Get the operation kind.
    #[inline]
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Replace { .. } => OpKind::Replace,
            Op::Merge { .. } => OpKind::Merge,
            Op::Append { .. } => OpKind::Append,
            Op::Delete { .. } => OpKind::Delete,
        }
    }

    /// Get the operation name.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Op::Replace { .. } => "replace",
            Op::Merge { .. } => "merge",
            Op::Append { .. } => "append",
            Op::Delete { .. } => "delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_op_constructors() {
        let set = Op::replace(path!("a"), json!(1));
        assert_eq!(set.name(), "replace");
        assert_eq!(set.path(), &path!("a"));
        assert_eq!(set.kind(), OpKind::Replace);

        let del = Op::delete(path!("b"));
        assert_eq!(del.name(), "delete");
    }

    #[test]
    fn test_op_from_kind() {
        let op = Op::from_kind(OpKind::Merge, path!("user"), json!({"a": 1}));
        assert_eq!(op, Op::merge(path!("user"), json!({"a": 1})));

        let op = Op::from_kind(OpKind::Delete, path!("user"), json!("ignored"));
        assert_eq!(op, Op::delete(path!("user")));
    }

    #[test]
    fn test_op_serde() {
        let op = Op::replace(path!("users[0]", "name"), json!("Alice"));
        let encoded = serde_json::to_string(&op).unwrap();
        assert!(encoded.contains("\"op\":\"replace\""));
        let parsed: Op = serde_json::from_str(&encoded).unwrap();
        assert_eq!(op, parsed);
    }
}
