//! The opaque async work a command performs.
//!
//! The runtime imposes no shape on the data beyond "serializable value
//! placeable at a path". Fetch operations receive no variables; mutate
//! operations receive the caller-supplied variables from their config.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Error returned by operations.
#[derive(Debug, Clone, Error)]
pub enum OperationError {
    /// The operation observed its cancellation token and stopped.
    /// Cancellation is not a failure and never produces an error status.
    #[error("operation cancelled")]
    Cancelled,
    /// The operation failed; retried up to the configured attempt budget.
    #[error("operation failed: {message}")]
    Failed {
        /// Description of what went wrong.
        message: String,
    },
}

impl OperationError {
    /// Create a failure error.
    #[inline]
    pub fn failed(message: impl Into<String>) -> Self {
        OperationError::Failed {
            message: message.into(),
        }
    }
}

/// Result alias for operation execution.
pub type OperationResult = Result<Value, OperationError>;

/// An opaque fetch/mutate callable.
///
/// The cancellation token is informational: operations should check it at
/// convenient points and return [`OperationError::Cancelled`], but the
/// runtime does not rely on them doing so.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Run the operation once.
    async fn run(&self, variables: Option<&Value>, token: &CancellationToken) -> OperationResult;

    /// Stable label for logs.
    fn name(&self) -> &'static str {
        "operation"
    }
}

type BoxedOperationFn =
    Box<dyn Fn(Option<Value>) -> BoxFuture<'static, OperationResult> + Send + Sync>;

/// [`Operation`] built from a plain async closure.
pub struct FnOperation {
    inner: BoxedOperationFn,
}

#[async_trait]
impl Operation for FnOperation {
    async fn run(&self, variables: Option<&Value>, _token: &CancellationToken) -> OperationResult {
        (self.inner)(variables.cloned()).await
    }

    fn name(&self) -> &'static str {
        "fn_operation"
    }
}

/// Wrap an async closure as an [`Operation`].
///
/// The closure receives the caller-supplied variables (owned) and its
/// future is driven under the command's cancellation token.
pub fn operation_fn<F, Fut>(f: F) -> Arc<dyn Operation>
where
    F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = OperationResult> + Send + 'static,
{
    Arc::new(FnOperation {
        inner: Box::new(move |variables| Box::pin(f(variables))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_operation_fn_passes_variables() {
        let op = operation_fn(|variables| async move {
            Ok(variables.unwrap_or_else(|| json!("none")))
        });
        let token = CancellationToken::new();
        let out = op.run(Some(&json!({"v": 1})), &token).await.unwrap();
        assert_eq!(out, json!({"v": 1}));
        let out = op.run(None, &token).await.unwrap();
        assert_eq!(out, json!("none"));
    }

    #[tokio::test]
    async fn test_operation_fn_propagates_failure() {
        let op = operation_fn(|_| async { Err(OperationError::failed("nope")) });
        let token = CancellationToken::new();
        let err = op.run(None, &token).await.unwrap_err();
        assert!(matches!(err, OperationError::Failed { .. }));
        assert_eq!(err.to_string(), "operation failed: nope");
    }
}
