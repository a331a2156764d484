//! Priority- and concurrency-bounded command scheduling.
//!
//! The queue is the stateful scheduler in front of the pure store: it owns
//! the live commands (operations, cancellation tokens), executes at most
//! `max_concurrent` of them at once, and reports every transition into the
//! store's reducer so queue contents stay observable as plain state.

use crate::clock::now_ms;
use crate::config::OperationConfig;
use crate::observer::ObserverSet;
use crate::operation::Operation;
use crate::retry::{execute_with_retry, AttemptOutcome};
use arbor_state::{CommandInfo, CommandKind, Event, Priority, QueueUpdate, Store};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A scheduled unit of async work.
///
/// Lives in exactly one of the queue's two collections: waiting in
/// `pending`, or keyed by id in `executing`. Once executing it never
/// re-enters `pending`.
#[derive(Clone)]
pub struct Command {
    /// Descriptive metadata, mirrored into the store.
    pub info: CommandInfo,
    pub(crate) operation: Arc<dyn Operation>,
    pub(crate) config: OperationConfig,
    pub(crate) token: CancellationToken,
}

impl Command {
    /// The command's unique id, shared with its status records.
    #[inline]
    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// Absolute path this command targets.
    #[inline]
    pub fn xpath(&self) -> &str {
        &self.info.xpath
    }

    /// The command's cancellation handle.
    #[inline]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("info", &self.info)
            .field("operation", &self.operation.name())
            .finish()
    }
}

#[derive(Default)]
struct QueueInner {
    pending: Vec<Command>,
    executing: HashMap<String, Command>,
}

/// The scheduler. All methods are synchronous; execution happens on
/// spawned tasks that report back through the store.
pub struct CommandQueue {
    store: Arc<Store>,
    observers: Arc<ObserverSet>,
    max_concurrent: usize,
    inner: Mutex<QueueInner>,
}

impl CommandQueue {
    pub(crate) fn new(
        store: Arc<Store>,
        observers: Arc<ObserverSet>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            store,
            observers,
            max_concurrent: max_concurrent.max(1),
            inner: Mutex::new(QueueInner::default()),
        }
    }

    /// Allocate a command without starting it.
    ///
    /// The command gets a fresh id, an enqueue timestamp, and its own
    /// cancellation token. Settlement always frees its `executing` slot,
    /// whatever the outcome.
    pub fn create_command(
        &self,
        xpath: &str,
        kind: CommandKind,
        priority: Priority,
        operation: Arc<dyn Operation>,
        config: OperationConfig,
    ) -> Command {
        Command {
            info: CommandInfo {
                id: Uuid::new_v4().to_string(),
                xpath: self.resolve(xpath),
                kind,
                priority,
                timestamp: now_ms(),
            },
            operation,
            config,
            token: CancellationToken::new(),
        }
    }

    /// Add a command to the queue and start draining.
    pub fn enqueue(self: &Arc<Self>, command: Command) {
        self.store.dispatch(&Event::CommandQueueUpdate {
            update: QueueUpdate::Add {
                command: command.info.clone(),
            },
        });
        self.lock_inner().pending.push(command);
        self.drain();
    }

    /// Start pending commands while capacity allows.
    ///
    /// Selection order: highest priority first, then earliest enqueue
    /// timestamp. The capacity check and the move into `executing` happen
    /// under one lock, so `executing` never exceeds the bound even under
    /// concurrent drains.
    pub fn drain(self: &Arc<Self>) {
        loop {
            let command = {
                let mut inner = self.lock_inner();
                if inner.executing.len() >= self.max_concurrent {
                    break;
                }
                let best = inner
                    .pending
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, c)| (c.info.priority.rank(), c.info.timestamp))
                    .map(|(index, _)| index);
                let Some(index) = best else {
                    break;
                };
                let command = inner.pending.remove(index);
                inner
                    .executing
                    .insert(command.info.id.clone(), command.clone());
                command
            };
            self.store.dispatch(&Event::CommandQueueUpdate {
                update: QueueUpdate::Execute {
                    command_id: command.info.id.clone(),
                },
            });
            self.spawn_execution(command);
        }
    }

    /// Cancel one command by id.
    ///
    /// An executing command has its token signalled and its slot freed
    /// immediately; a pending command is dropped. Either way no
    /// success/error event fires for it.
    pub fn cancel(self: &Arc<Self>, command_id: &str) -> bool {
        let executing = self.lock_inner().executing.remove(command_id);
        if let Some(command) = executing {
            command.token.cancel();
            self.store.dispatch(&Event::CommandQueueUpdate {
                update: QueueUpdate::Remove {
                    command_id: command_id.to_string(),
                },
            });
            self.drain();
            return true;
        }

        let dropped = {
            let mut inner = self.lock_inner();
            let position = inner.pending.iter().position(|c| c.info.id == command_id);
            position.map(|index| inner.pending.remove(index))
        };
        match dropped {
            Some(command) => {
                command.token.cancel();
                self.store.dispatch(&Event::CommandQueueUpdate {
                    update: QueueUpdate::Drop {
                        command_id: command_id.to_string(),
                    },
                });
                true
            }
            None => false,
        }
    }

    /// Cancel every pending and executing command for one path.
    ///
    /// Returns the number of commands cancelled.
    pub fn cancel_by_xpath(self: &Arc<Self>, path: &str) -> usize {
        let resolved = self.resolve(path);
        self.cancel_where(|info| info.xpath == resolved)
    }

    /// Cancel every pending and executing command unconditionally.
    pub fn cancel_all(self: &Arc<Self>) -> usize {
        self.cancel_where(|_| true)
    }

    fn cancel_where(self: &Arc<Self>, matches: impl Fn(&CommandInfo) -> bool) -> usize {
        let (cancelled_executing, dropped_pending) = {
            let mut inner = self.lock_inner();
            let ids: Vec<String> = inner
                .executing
                .values()
                .filter(|c| matches(&c.info))
                .map(|c| c.info.id.clone())
                .collect();
            let cancelled: Vec<Command> = ids
                .iter()
                .filter_map(|id| inner.executing.remove(id))
                .collect();

            let mut dropped = Vec::new();
            let mut kept = Vec::new();
            for command in inner.pending.drain(..) {
                if matches(&command.info) {
                    dropped.push(command);
                } else {
                    kept.push(command);
                }
            }
            inner.pending = kept;
            (cancelled, dropped)
        };

        for command in &cancelled_executing {
            command.token.cancel();
            self.store.dispatch(&Event::CommandQueueUpdate {
                update: QueueUpdate::Remove {
                    command_id: command.info.id.clone(),
                },
            });
        }
        for command in &dropped_pending {
            command.token.cancel();
            self.store.dispatch(&Event::CommandQueueUpdate {
                update: QueueUpdate::Drop {
                    command_id: command.info.id.clone(),
                },
            });
        }

        let count = cancelled_executing.len() + dropped_pending.len();
        if !cancelled_executing.is_empty() {
            self.drain();
        }
        count
    }

    /// Whether any command (pending or executing) targets the path, or any
    /// exists at all when no path is given.
    pub fn has_pending_operations(&self, path: Option<&str>) -> bool {
        let resolved = path.map(|p| self.resolve(p));
        let inner = self.lock_inner();
        let hit = |c: &Command| resolved.as_deref().is_none_or(|p| c.info.xpath == p);
        inner.pending.iter().any(|c| hit(c)) || inner.executing.values().any(|c| hit(c))
    }

    /// Snapshot of queued command metadata, optionally filtered to a path.
    /// Pending commands come first, then executing ones.
    pub fn queued_operations(&self, path: Option<&str>) -> Vec<CommandInfo> {
        let resolved = path.map(|p| self.resolve(p));
        let inner = self.lock_inner();
        let hit = |c: &Command| resolved.as_deref().is_none_or(|p| c.info.xpath == p);
        inner
            .pending
            .iter()
            .filter(|c| hit(c))
            .chain(inner.executing.values().filter(|c| hit(c)))
            .map(|c| c.info.clone())
            .collect()
    }

    /// Number of commands currently executing.
    pub fn executing_count(&self) -> usize {
        self.lock_inner().executing.len()
    }

    fn spawn_execution(self: &Arc<Self>, command: Command) {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = execute_with_retry(
                command.operation.as_ref(),
                command.config.variables.as_ref(),
                command.config.retry_count,
                command.config.retry_delay_ms,
                &command.token,
            )
            .await;
            queue.settle(&command, outcome).await;
        });
    }

    async fn settle(self: &Arc<Self>, command: &Command, outcome: AttemptOutcome) {
        let info = &command.info;
        match outcome {
            AttemptOutcome::Success { value, attempts } => {
                tracing::debug!(id = %info.id, xpath = %info.xpath, attempts, "command resolved");
                self.store.dispatch(&Event::AsyncSuccess {
                    path: info.xpath.clone(),
                    request_id: info.id.clone(),
                    data: value.clone(),
                    timestamp: now_ms(),
                });
                for sibling in &command.config.invalidate {
                    self.cancel_by_xpath(sibling);
                }
                self.observers
                    .notify_success(&info.xpath, &info.id, &value)
                    .await;
            }
            AttemptOutcome::Exhausted {
                last_error,
                attempts,
            } => {
                tracing::warn!(id = %info.id, xpath = %info.xpath, attempts, error = %last_error, "command failed");
                self.store.dispatch(&Event::AsyncError {
                    path: info.xpath.clone(),
                    request_id: info.id.clone(),
                    error: last_error.clone(),
                    should_rollback: true,
                    timestamp: now_ms(),
                });
                self.observers
                    .notify_error(&info.xpath, &info.id, &last_error)
                    .await;
            }
            AttemptOutcome::Cancelled => {
                // A cancelled command settles silently; status cleanup is
                // the canceller's responsibility.
                tracing::debug!(id = %info.id, xpath = %info.xpath, "command cancelled");
            }
        }
        self.finish(&info.id);
    }

    /// Free the command's slot and continue draining. Idempotent: a
    /// command cancelled mid-flight was already removed by `cancel`.
    fn finish(self: &Arc<Self>, command_id: &str) {
        let removed = self.lock_inner().executing.remove(command_id).is_some();
        if removed {
            self.store.dispatch(&Event::CommandQueueUpdate {
                update: QueueUpdate::Remove {
                    command_id: command_id.to_string(),
                },
            });
        }
        self.drain();
    }

    fn resolve(&self, path: &str) -> String {
        self.store.state().resolve(path).to_string()
    }

    fn lock_inner(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock_inner();
        f.debug_struct("CommandQueue")
            .field("max_concurrent", &self.max_concurrent)
            .field("pending", &inner.pending.len())
            .field("executing", &inner.executing.len())
            .finish()
    }
}
