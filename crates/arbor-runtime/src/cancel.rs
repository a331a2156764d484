//! Cancellation-aware awaiting.
//!
//! Cancellation is cooperative: the token is signalled, and operations are
//! expected to observe it. True preemption is not guaranteed; an operation
//! that ignores its token runs to completion, and only its settlement is
//! suppressed.

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Result of racing a future against a cancellation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelAware<T> {
    /// The future completed first.
    Value(T),
    /// The token was cancelled first.
    Cancelled,
}

/// Await a future, resolving early if the token is cancelled.
pub async fn await_or_cancel<T, F>(token: &CancellationToken, fut: F) -> CancelAware<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        _ = token.cancelled() => CancelAware::Cancelled,
        value = fut => CancelAware::Value(value),
    }
}
