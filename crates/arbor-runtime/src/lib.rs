//! Async operation layer for arbor documents.
//!
//! Commands (fetches and mutations) run against an `arbor-state` store
//! through a priority- and concurrency-bounded queue, with retries,
//! cooperative cancellation, optimistic updates, and invalidation.
//!
//! Scheduling is cooperative and event-loop-driven: reducer transitions
//! are atomic, the queue bounds how many operations are outstanding (not
//! CPU parallelism), and when two operations race on one path the last
//! settlement wins. Callers needing stricter ordering can compare request
//! ids on the status records.
//!
//! # Example
//!
//! ```no_run
//! use arbor_runtime::{operation_fn, Runtime};
//! use serde_json::json;
//!
//! # async fn demo() {
//! let runtime = Runtime::new(json!({"users": []}), "/");
//! let fetch = operation_fn(|_| async { Ok(json!([{"name": "Alice"}])) });
//! let request_id = runtime.fetch("/users", fetch);
//! # let _ = request_id;
//! # }
//! ```

pub use arbor_state as state;

mod cancel;
mod clock;
mod config;
mod invalidate;
mod observer;
mod operation;
mod queue;
mod retry;
mod runtime;

pub use cancel::{await_or_cancel, CancelAware};
pub use clock::now_ms;
pub use config::{OperationConfig, OptimisticFn, OptimisticSpec};
pub use invalidate::InvalidateOptions;
pub use observer::Observer;
pub use operation::{operation_fn, FnOperation, Operation, OperationError, OperationResult};
pub use queue::{Command, CommandQueue};
pub use runtime::Runtime;
