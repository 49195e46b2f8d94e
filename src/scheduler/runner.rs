//! Scheduler core: admission, dispatch, and completion marshaling.
//!
//! A [`Scheduler`] is owned by exactly one logical context (one Tokio task).
//! `submit`, the running set, and listener registration take `&mut self`
//! or `&self` and are never shared across threads; task bodies run on
//! spawned Tokio tasks and post their outcome back over an mpsc channel.
//! The owning context applies those outcomes with [`Scheduler::next_completion`],
//! [`Scheduler::drain_completions`], or [`Scheduler::run_until_idle`].
//!
//! Per key the lifecycle is `absent -> running -> absent`. Cooldown is an
//! admission check against the [`CooldownStore`], not a tracked state.

use crate::error::{Result, SyncError};
use crate::scheduler::cooldown::CooldownStore;
use crate::scheduler::events::{ListenerId, Listeners, TaskEvent};
use crate::scheduler::tasks::{Task, TaskOutput};
use futures_util::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, warn};

/// Default worker-pool size.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Result of a submission's admission check.
///
/// Rejections are silent: they emit no events and are not errors. The
/// value is informational for callers that want to log or test it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Inserted into the running set and dispatched.
    Admitted,
    /// A task with the same key is already in flight.
    DuplicateInFlight,
    /// The key completed successfully less than one cooldown period ago.
    OnCooldown {
        /// Time left until the key may run again.
        remaining: Duration,
    },
    /// [`Scheduler::shutdown`] was called.
    ShutDown,
}

impl Admission {
    /// `true` when the task was dispatched.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

struct InFlight {
    task: Arc<dyn Task>,
    dispatched_at: Instant,
}

/// Outcome posted from a worker back to the owning context.
pub(crate) struct Completion {
    key: String,
    outcome: Result<TaskOutput>,
}

/// Deduplicating, cooldown-aware task scheduler.
pub struct Scheduler {
    running: HashMap<String, InFlight>,
    cooldowns: CooldownStore,
    listeners: Listeners,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    workers: Arc<Semaphore>,
    max_workers: usize,
    accepting: bool,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("running", &self.running_keys())
            .field("listeners", &self.listeners.len())
            .field("max_workers", &self.max_workers)
            .field("accepting", &self.accepting)
            .finish()
    }
}

impl Scheduler {
    /// Create a scheduler whose worker pool runs at most `max_workers`
    /// task bodies at once (minimum 1).
    ///
    /// Submissions spawn onto the current Tokio runtime, so `submit` must
    /// be called from within one.
    pub fn new(cooldowns: CooldownStore, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            running: HashMap::new(),
            cooldowns,
            listeners: Listeners::default(),
            completion_tx,
            completion_rx,
            workers: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            accepting: true,
        }
    }

    /// Submit a task. See [`Scheduler::submit_arc`].
    pub fn submit<T: Task>(&mut self, task: T) -> Admission {
        self.submit_arc(Arc::new(task))
    }

    /// Submit a task for execution.
    ///
    /// 1. A key already in flight is ignored.
    /// 2. A key still inside its cooldown window is ignored.
    /// 3. Otherwise the key enters the running set, `Started` is delivered
    ///    to listeners, and the body is dispatched to the worker pool.
    ///
    /// Never blocks on the task itself.
    pub fn submit_arc(&mut self, task: Arc<dyn Task>) -> Admission {
        let key = task.key();
        debug!(key = %key, "task submitted");

        if !self.accepting {
            debug!(key = %key, "scheduler shut down, ignoring task");
            return Admission::ShutDown;
        }

        if self.running.contains_key(&key) {
            debug!(key = %key, "task already running, ignoring duplicate");
            return Admission::DuplicateInFlight;
        }

        let remaining = self.cooldowns.remaining_cooldown(task.as_ref());
        if !remaining.is_zero() {
            debug!(
                key = %key,
                remaining_ms = remaining.as_millis() as u64,
                "task on cooldown, ignoring"
            );
            return Admission::OnCooldown { remaining };
        }

        self.running.insert(
            key.clone(),
            InFlight {
                task: Arc::clone(&task),
                dispatched_at: Instant::now(),
            },
        );
        debug!(key = %key, "task started");
        self.listeners.notify(&TaskEvent::Started { key: key.clone() });
        self.dispatch(key, task);
        Admission::Admitted
    }

    fn dispatch(&self, key: String, task: Arc<dyn Task>) {
        let completion_tx = self.completion_tx.clone();
        let workers = Arc::clone(&self.workers);

        tokio::spawn(async move {
            let outcome = match workers.acquire_owned().await {
                Ok(_permit) => AssertUnwindSafe(task.call())
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        Err(SyncError::Task(format!(
                            "task panicked: {}",
                            panic_message(panic.as_ref())
                        )))
                    }),
                Err(_) => Err(SyncError::Scheduler("worker pool closed".to_owned())),
            };
            if completion_tx.send(Completion { key, outcome }).is_err() {
                debug!("scheduler dropped before task completion was delivered");
            }
        });
    }

    /// `true` if a task with `key` is in flight.
    pub fn is_running(&self, key: &str) -> bool {
        self.running.contains_key(key)
    }

    /// Snapshot of in-flight tasks. Not live after return.
    pub fn running_tasks(&self) -> Vec<Arc<dyn Task>> {
        self.running.values().map(|f| Arc::clone(&f.task)).collect()
    }

    /// Sorted snapshot of in-flight keys.
    pub fn running_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.running.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of in-flight tasks.
    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Register a listener. Listeners run synchronously on this context,
    /// in registration order.
    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&TaskEvent) + Send + 'static,
    {
        self.listeners.add(Box::new(listener))
    }

    /// Remove a listener. Returns `true` if it was registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Stop admitting new tasks. In-flight tasks keep running and still
    /// deliver their terminal events.
    pub fn shutdown(&mut self) {
        if self.accepting {
            info!(in_flight = self.running.len(), "scheduler shutting down");
        }
        self.accepting = false;
    }

    /// `true` after [`Scheduler::shutdown`].
    pub fn is_shut_down(&self) -> bool {
        !self.accepting
    }

    /// The cooldown store used for admission.
    pub fn cooldowns(&self) -> &CooldownStore {
        &self.cooldowns
    }

    /// Wait for the next task to finish and apply its outcome. Returns the
    /// finished key, or `None` when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<String> {
        if self.running.is_empty() {
            return None;
        }
        let completion = self.recv_completion().await?;
        let key = completion.key.clone();
        self.finish(completion);
        Some(key)
    }

    /// Apply every outcome already posted, without waiting.
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.finish(completion);
            applied += 1;
        }
        applied
    }

    /// Apply outcomes until the running set is empty.
    pub async fn run_until_idle(&mut self) {
        while self.next_completion().await.is_some() {}
    }

    /// Receive the next posted outcome. Pends while nothing is in flight;
    /// only yields `None` if the channel is closed, which cannot happen
    /// while `self` holds a sender.
    pub(crate) async fn recv_completion(&mut self) -> Option<Completion> {
        self.completion_rx.recv().await
    }

    /// Apply one outcome: leave the running set, record cooldown on
    /// success, then notify listeners.
    pub(crate) fn finish(&mut self, completion: Completion) {
        let Completion { key, outcome } = completion;
        let Some(in_flight) = self.running.remove(&key) else {
            warn!(key = %key, "completion for unknown task ignored");
            return;
        };
        let elapsed = in_flight.dispatched_at.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        let event = match outcome {
            Ok(output) => {
                if let Err(e) = self.cooldowns.record_completion(in_flight.task.as_ref()) {
                    error!(key = %key, "cannot record cooldown: {e}");
                }
                info!(key = %key, elapsed_ms, output = %output, "task completed");
                TaskEvent::Completed {
                    key,
                    output,
                    elapsed,
                }
            }
            Err(error) => {
                warn!(key = %key, elapsed_ms, error = %error, "task failed");
                TaskEvent::Failed {
                    key,
                    error: Arc::new(error),
                    elapsed,
                }
            }
        };
        self.listeners.notify(&event);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
