//! Per-operation configuration.

use serde_json::Value;
use std::sync::Arc;

/// Function computing a speculative value from the current data at the
/// target path and the operation's variables.
pub type OptimisticFn = Arc<dyn Fn(&Value, Option<&Value>) -> Value + Send + Sync>;

/// How to derive the speculative value applied before settlement.
#[derive(Clone)]
pub enum OptimisticSpec {
    /// A fixed speculative value.
    Value(Value),
    /// Compute the speculative value at start time.
    ///
    /// The current data is read immediately before dispatching the start
    /// event; concurrent commands targeting the same path can race that
    /// read. Settlement order decides the final value.
    Compute(OptimisticFn),
}

impl OptimisticSpec {
    /// Evaluate the spec against the current data and variables.
    pub fn evaluate(&self, current: &Value, variables: Option<&Value>) -> Value {
        match self {
            OptimisticSpec::Value(value) => value.clone(),
            OptimisticSpec::Compute(f) => f(current, variables),
        }
    }
}

impl std::fmt::Debug for OptimisticSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimisticSpec::Value(value) => f.debug_tuple("Value").field(value).finish(),
            OptimisticSpec::Compute(_) => f.debug_tuple("Compute").field(&"<fn>").finish(),
        }
    }
}

impl From<Value> for OptimisticSpec {
    fn from(value: Value) -> Self {
        OptimisticSpec::Value(value)
    }
}

/// Configuration recognized per async operation.
#[derive(Clone, Debug)]
pub struct OperationConfig {
    /// Max retry attempts after the first failure.
    pub retry_count: usize,
    /// Base backoff in milliseconds; actual delay is `base * 2^attempt`.
    pub retry_delay_ms: u64,
    /// Milliseconds before a successful result is considered stale.
    pub stale_time_ms: Option<u64>,
    /// Milliseconds to retain a successful result before it can be swept.
    pub cache_time_ms: Option<u64>,
    /// Whether an error settlement restores optimistic data.
    pub rollback_on_error: bool,
    /// Sibling paths whose commands are cancelled when this one succeeds.
    pub invalidate: Vec<String>,
    /// Variables handed to mutate operations.
    pub variables: Option<Value>,
    /// Speculative value applied at start, if any.
    pub optimistic: Option<OptimisticSpec>,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            retry_count: 0,
            retry_delay_ms: 250,
            stale_time_ms: None,
            cache_time_ms: None,
            rollback_on_error: true,
            invalidate: Vec::new(),
            variables: None,
            optimistic: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = OperationConfig::default();
        assert_eq!(config.retry_count, 0);
        assert_eq!(config.retry_delay_ms, 250);
        assert!(config.rollback_on_error);
        assert!(config.optimistic.is_none());
    }

    #[test]
    fn test_optimistic_spec_value() {
        let spec = OptimisticSpec::from(json!([1]));
        assert_eq!(spec.evaluate(&json!([]), None), json!([1]));
    }

    #[test]
    fn test_optimistic_spec_compute() {
        let spec = OptimisticSpec::Compute(Arc::new(|current, variables| {
            let mut items = current.as_array().cloned().unwrap_or_default();
            if let Some(v) = variables {
                items.push(v.clone());
            }
            Value::Array(items)
        }));
        let out = spec.evaluate(&json!([1]), Some(&json!(2)));
        assert_eq!(out, json!([1, 2]));
    }
}
