//! Retrying execution of a single operation with exponential backoff.

use crate::cancel::{await_or_cancel, CancelAware};
use crate::operation::{Operation, OperationError};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Terminal outcome of running one operation through its attempt budget.
#[derive(Debug)]
pub(crate) enum AttemptOutcome {
    /// An attempt resolved with data.
    Success { value: Value, attempts: usize },
    /// The command's token fired, or the operation reported cancellation.
    Cancelled,
    /// Every attempt failed.
    Exhausted { last_error: String, attempts: usize },
}

/// Backoff before retry number `attempt` (zero-based): `base * 2^attempt`.
#[inline]
pub(crate) fn backoff_delay_ms(base_ms: u64, attempt: usize) -> u64 {
    base_ms.saturating_mul(1u64.checked_shl(attempt as u32).unwrap_or(u64::MAX))
}

/// Sleep out a backoff window. Returns true if cancelled while waiting.
async fn wait_backoff(delay_ms: u64, token: &CancellationToken) -> bool {
    matches!(
        await_or_cancel(
            token,
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)),
        )
        .await,
        CancelAware::Cancelled
    )
}

/// Run an operation, retrying failures up to `retry_count` extra attempts.
///
/// Cancellation short-circuits at every stage: before an attempt, during
/// an attempt, and during the backoff wait.
pub(crate) async fn execute_with_retry(
    operation: &dyn Operation,
    variables: Option<&Value>,
    retry_count: usize,
    base_delay_ms: u64,
    token: &CancellationToken,
) -> AttemptOutcome {
    let max_attempts = retry_count + 1;
    let mut last_error = String::from("operation failed");

    for attempt in 0..max_attempts {
        if token.is_cancelled() {
            return AttemptOutcome::Cancelled;
        }
        match await_or_cancel(token, operation.run(variables, token)).await {
            CancelAware::Cancelled => return AttemptOutcome::Cancelled,
            CancelAware::Value(Ok(value)) => {
                return AttemptOutcome::Success {
                    value,
                    attempts: attempt + 1,
                }
            }
            CancelAware::Value(Err(OperationError::Cancelled)) => {
                return AttemptOutcome::Cancelled;
            }
            CancelAware::Value(Err(err)) => {
                last_error = err.to_string();
                if attempt + 1 < max_attempts {
                    let delay = backoff_delay_ms(base_delay_ms, attempt);
                    tracing::debug!(
                        operation = operation.name(),
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay,
                        "operation failed, backing off before retry"
                    );
                    if wait_backoff(delay, token).await {
                        return AttemptOutcome::Cancelled;
                    }
                }
            }
        }
    }

    AttemptOutcome::Exhausted {
        last_error,
        attempts: max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationResult;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyOperation {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Operation for FlakyOperation {
        async fn run(
            &self,
            _variables: Option<&Value>,
            _token: &CancellationToken,
        ) -> OperationResult {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(OperationError::failed(format!("attempt {call} failed")))
            } else {
                Ok(json!("ok"))
            }
        }
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay_ms(250, 0), 250);
        assert_eq!(backoff_delay_ms(250, 1), 500);
        assert_eq!(backoff_delay_ms(250, 3), 2000);
        assert_eq!(backoff_delay_ms(u64::MAX, 5), u64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let op = FlakyOperation {
            failures: 2,
            calls: AtomicUsize::new(0),
        };
        let token = CancellationToken::new();
        let outcome = execute_with_retry(&op, None, 3, 10, &token).await;
        match outcome {
            AttemptOutcome::Success { value, attempts } => {
                assert_eq!(value, json!("ok"));
                assert_eq!(attempts, 3);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted() {
        let op = FlakyOperation {
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
        };
        let token = CancellationToken::new();
        let outcome = execute_with_retry(&op, None, 2, 10, &token).await;
        match outcome {
            AttemptOutcome::Exhausted {
                last_error,
                attempts,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("attempt 2 failed"));
            }
            other => panic!("expected exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_short_circuits() {
        let op = FlakyOperation {
            failures: 0,
            calls: AtomicUsize::new(0),
        };
        let token = CancellationToken::new();
        token.cancel();
        let outcome = execute_with_retry(&op, None, 0, 10, &token).await;
        assert!(matches!(outcome, AttemptOutcome::Cancelled));
        assert_eq!(op.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_operation_reported_cancellation() {
        struct CancellingOperation;

        #[async_trait]
        impl Operation for CancellingOperation {
            async fn run(
                &self,
                _variables: Option<&Value>,
                _token: &CancellationToken,
            ) -> OperationResult {
                Err(OperationError::Cancelled)
            }
        }

        let token = CancellationToken::new();
        let outcome = execute_with_retry(&CancellingOperation, None, 5, 10, &token).await;
        assert!(matches!(outcome, AttemptOutcome::Cancelled));
    }
}
