//! Store-side view of the command queue.
//!
//! The scheduler in `arbor-runtime` owns the live commands (operations and
//! cancellation handles); the store tracks a serializable mirror so that
//! queue contents are observable through the same state snapshots as
//! everything else.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default bound on concurrently executing commands.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// The kind of async work a command performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Read data for a path.
    Fetch,
    /// Write data for a path.
    Mutate,
}

/// Scheduling priority. Higher priorities dispatch first; ties break by
/// earliest enqueue timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Dispatch rank; lower dispatches first.
    #[inline]
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }
}

/// Descriptive metadata for one scheduled command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandInfo {
    /// Unique command/request identifier.
    pub id: String,
    /// Absolute path the command targets.
    pub xpath: String,
    /// Fetch or mutate.
    pub kind: CommandKind,
    /// Scheduling priority.
    pub priority: Priority,
    /// Milliseconds timestamp of enqueue, used for tie-breaking.
    pub timestamp: u64,
}

/// Queue table: commands waiting to start and commands in flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    /// Commands waiting for a slot. Order is irrelevant; the scheduler
    /// re-sorts on dispatch.
    pub pending: Vec<CommandInfo>,
    /// Commands currently executing, keyed by id.
    pub executing: HashMap<String, CommandInfo>,
    /// Bound on `executing.len()`.
    pub max_concurrent: usize,
}

impl QueueState {
    /// Create an empty queue with the given concurrency bound.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            pending: Vec::new(),
            executing: HashMap::new(),
            max_concurrent,
        }
    }
}

impl Default for QueueState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}

/// Queue table transitions carried by
/// [`Event::CommandQueueUpdate`](crate::Event::CommandQueueUpdate).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueueUpdate {
    /// Append a command to `pending`.
    Add {
        /// The command being enqueued.
        command: CommandInfo,
    },
    /// Move a pending command into `executing`.
    Execute {
        /// Id of the command to start.
        command_id: String,
    },
    /// Remove a command from `executing` after settlement.
    Remove {
        /// Id of the settled command.
        command_id: String,
    },
    /// Drop a still-pending command that was cancelled before starting.
    Drop {
        /// Id of the dropped command.
        command_id: String,
    },
}

impl QueueState {
    /// Apply one queue transition. Unknown ids and malformed transitions
    /// are absorbed as no-ops.
    pub(crate) fn apply(&self, update: &QueueUpdate) -> QueueState {
        let mut next = self.clone();
        match update {
            QueueUpdate::Add { command } => {
                next.pending.push(command.clone());
            }
            QueueUpdate::Execute { command_id } => {
                if let Some(pos) = next.pending.iter().position(|c| &c.id == command_id) {
                    let command = next.pending.remove(pos);
                    next.executing.insert(command.id.clone(), command);
                }
            }
            QueueUpdate::Remove { command_id } => {
                next.executing.remove(command_id);
            }
            QueueUpdate::Drop { command_id } => {
                next.pending.retain(|c| &c.id != command_id);
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str) -> CommandInfo {
        CommandInfo {
            id: id.to_string(),
            xpath: "/users".to_string(),
            kind: CommandKind::Fetch,
            priority: Priority::Normal,
            timestamp: 1,
        }
    }

    #[test]
    fn test_priority_rank_order() {
        assert!(Priority::High.rank() < Priority::Normal.rank());
        assert!(Priority::Normal.rank() < Priority::Low.rank());
    }

    #[test]
    fn test_add_then_execute_then_remove() {
        let q = QueueState::default();
        let q = q.apply(&QueueUpdate::Add { command: info("c1") });
        assert_eq!(q.pending.len(), 1);

        let q = q.apply(&QueueUpdate::Execute {
            command_id: "c1".to_string(),
        });
        assert!(q.pending.is_empty());
        assert!(q.executing.contains_key("c1"));

        let q = q.apply(&QueueUpdate::Remove {
            command_id: "c1".to_string(),
        });
        assert!(q.executing.is_empty());
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let q = QueueState::default();
        let q2 = q.apply(&QueueUpdate::Execute {
            command_id: "nope".to_string(),
        });
        assert_eq!(q2, q);
        let q2 = q.apply(&QueueUpdate::Remove {
            command_id: "nope".to_string(),
        });
        assert_eq!(q2, q);
    }

    #[test]
    fn test_drop_removes_pending() {
        let q = QueueState::default()
            .apply(&QueueUpdate::Add { command: info("c1") })
            .apply(&QueueUpdate::Add { command: info("c2") });
        let q = q.apply(&QueueUpdate::Drop {
            command_id: "c1".to_string(),
        });
        assert_eq!(q.pending.len(), 1);
        assert_eq!(q.pending[0].id, "c2");
    }
}
