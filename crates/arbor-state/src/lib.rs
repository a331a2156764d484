//! Path-addressed document state.
//!
//! This crate is the pure core of arbor: path expressions over tree-shaped
//! JSON documents, immutable structural operations, and an event-driven
//! reducer that advances the whole store state one transition at a time.
//!
//! The async layer (command scheduling, retries, cancellation,
//! invalidation) lives in `arbor-runtime` and drives this crate through
//! [`Store::dispatch`].
//!
//! # Example
//!
//! ```
//! use arbor_state::{Event, OpKind, Store};
//! use serde_json::json;
//!
//! let store = Store::with_initial(json!({"users": []}), "/");
//! store.dispatch(&Event::navigate("/users"));
//! store.dispatch(&Event::data_operation("[0]", OpKind::Replace, Some(json!({"name": "Alice"}))));
//! assert_eq!(store.data_at("[0]/name"), Some(json!("Alice")));
//! ```

mod apply;
mod cell;
mod error;
mod event;
mod op;
mod path;
mod queue;
mod status;
mod store;

pub use apply::{apply_op, get_at_path};
pub use cell::Store;
pub use error::{value_type_name, ArborError, ArborResult};
pub use event::Event;
pub use op::{Op, OpKind};
pub use path::{extract_params, Path, Seg};
pub use queue::{
    CommandInfo, CommandKind, Priority, QueueState, QueueUpdate, DEFAULT_MAX_CONCURRENT,
};
pub use status::{optimistic_key, OpStatus, OptimisticUpdate, StatusRecord};
pub use store::{reduce, StoreState};
