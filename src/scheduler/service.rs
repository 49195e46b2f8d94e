//! Scheduler service: one Tokio task owns the [`Scheduler`] and acts as its
//! single logical context.
//!
//! Callers hold a cloneable [`SchedulerHandle`] and talk to the service over
//! a command channel. Lifecycle events are fanned out on a `broadcast`
//! channel so any number of observers can follow along. Observers that must
//! see every event use [`SchedulerHandle::follow`] instead, which is
//! unbounded and never lags.

use crate::error::{Result, SyncError};
use crate::scheduler::events::TaskEvent;
use crate::scheduler::runner::{Admission, Scheduler};
use crate::scheduler::tasks::Task;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

enum Command {
    Submit {
        task: Arc<dyn Task>,
        reply: Option<oneshot::Sender<Admission>>,
    },
    Running(oneshot::Sender<Vec<String>>),
    IsRunning {
        key: String,
        reply: oneshot::Sender<bool>,
    },
    WaitIdle(oneshot::Sender<()>),
    Follow(mpsc::UnboundedSender<TaskEvent>),
    Shutdown,
}

type Followers = Arc<Mutex<Vec<mpsc::UnboundedSender<TaskEvent>>>>;

/// Terminal outcomes seen by [`SchedulerHandle::follow_until_idle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowSummary {
    pub completed: usize,
    pub failed: usize,
}

impl FollowSummary {
    fn record(&mut self, event: &TaskEvent) {
        match event {
            TaskEvent::Started { .. } => {}
            TaskEvent::Completed { .. } => self.completed += 1,
            TaskEvent::Failed { .. } => self.failed += 1,
        }
    }
}

/// Cloneable client for a running [`SchedulerService`].
#[derive(Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::UnboundedSender<Command>,
    event_tx: broadcast::Sender<TaskEvent>,
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("closed", &self.command_tx.is_closed())
            .finish()
    }
}

fn stopped() -> SyncError {
    SyncError::Scheduler("scheduler service stopped".to_owned())
}

impl SchedulerHandle {
    /// Submit a task without waiting for its admission result.
    pub fn submit<T: Task>(&self, task: T) -> Result<()> {
        self.submit_arc(Arc::new(task))
    }

    /// Submit a shared task without waiting for its admission result.
    pub fn submit_arc(&self, task: Arc<dyn Task>) -> Result<()> {
        self.command_tx
            .send(Command::Submit { task, reply: None })
            .map_err(|_| stopped())
    }

    /// Submit a task and report how the scheduler admitted it.
    pub async fn submit_checked(&self, task: Arc<dyn Task>) -> Result<Admission> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::Submit {
                task,
                reply: Some(reply),
            })
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }

    /// Sorted keys of in-flight tasks.
    pub async fn running_tasks(&self) -> Result<Vec<String>> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::Running(reply))
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }

    pub async fn is_running(&self, key: &str) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::IsRunning {
                key: key.to_owned(),
                reply,
            })
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }

    /// Resolve once the running set is empty.
    ///
    /// Commands are applied in order, so every submission sent before this
    /// call has been admitted or rejected by the time it resolves.
    pub async fn wait_idle(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::WaitIdle(reply))
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }

    /// Stop admitting new tasks. In-flight work finishes normally.
    pub fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(Command::Shutdown)
            .map_err(|_| stopped())
    }

    /// Receive lifecycle events emitted after this call. Slow receivers
    /// lag and lose the oldest events once the channel capacity fills.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.event_tx.subscribe()
    }

    /// Receive every lifecycle event for submissions sent after this call.
    ///
    /// The registration travels on the command channel, so it is ordered
    /// with submissions. The stream is unbounded; it closes when the
    /// service stops.
    pub fn follow(&self) -> Result<mpsc::UnboundedReceiver<TaskEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.command_tx
            .send(Command::Follow(tx))
            .map_err(|_| stopped())?;
        Ok(rx)
    }

    /// Hand each event from `events` to `on_event` as it arrives, until the
    /// scheduler is idle. Events already queued at that point are handed
    /// over before returning.
    pub async fn follow_until_idle<F>(
        &self,
        mut events: mpsc::UnboundedReceiver<TaskEvent>,
        mut on_event: F,
    ) -> Result<FollowSummary>
    where
        F: FnMut(&TaskEvent),
    {
        let mut summary = FollowSummary::default();
        let idle = self.wait_idle();
        tokio::pin!(idle);

        loop {
            tokio::select! {
                biased;
                Some(event) = events.recv() => {
                    summary.record(&event);
                    on_event(&event);
                }
                result = &mut idle => {
                    result?;
                    break;
                }
            }
        }

        // Listeners run before idle waiters are released.
        while let Ok(event) = events.try_recv() {
            summary.record(&event);
            on_event(&event);
        }
        Ok(summary)
    }
}

/// Event loop owning a [`Scheduler`].
pub struct SchedulerService {
    scheduler: Scheduler,
    command_rx: mpsc::UnboundedReceiver<Command>,
    idle_waiters: Vec<oneshot::Sender<()>>,
    followers: Followers,
}

/// Wrap `scheduler` in a service. Call [`SchedulerService::run`] to start it.
#[must_use]
pub fn scheduler_service(
    mut scheduler: Scheduler,
    event_capacity: usize,
) -> (SchedulerHandle, SchedulerService) {
    let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let forward = event_tx.clone();
    scheduler.add_listener(move |event: &TaskEvent| {
        // No subscribers is fine.
        let _ = forward.send(event.clone());
    });

    let followers: Followers = Arc::default();
    let fan_out = Arc::clone(&followers);
    scheduler.add_listener(move |event: &TaskEvent| match fan_out.lock() {
        Ok(mut followers) => followers.retain(|tx| tx.send(event.clone()).is_ok()),
        Err(_) => warn!("follower list poisoned, event dropped"),
    });

    (
        SchedulerHandle {
            command_tx,
            event_tx,
        },
        SchedulerService {
            scheduler,
            command_rx,
            idle_waiters: Vec::new(),
            followers,
        },
    )
}

impl SchedulerService {
    /// Spawn the event loop. It exits once every handle has been dropped
    /// and no task is in flight.
    pub fn run(self) -> JoinHandle<()> {
        tokio::spawn(self.run_loop())
    }

    async fn run_loop(mut self) {
        info!("scheduler service started");
        let mut commands_open = true;

        loop {
            let busy = self.scheduler.running_count() > 0;
            if !commands_open && !busy {
                break;
            }

            tokio::select! {
                command = self.command_rx.recv(), if commands_open => match command {
                    Some(command) => self.handle(command),
                    None => {
                        debug!("all scheduler handles dropped");
                        commands_open = false;
                    }
                },
                Some(completion) = self.scheduler.recv_completion(), if busy => {
                    self.scheduler.finish(completion);
                }
            }

            if self.scheduler.running_count() == 0 {
                for waiter in self.idle_waiters.drain(..) {
                    let _ = waiter.send(());
                }
            }
        }

        info!("scheduler service stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Submit { task, reply } => {
                let admission = self.scheduler.submit_arc(task);
                if let Some(reply) = reply {
                    let _ = reply.send(admission);
                }
            }
            Command::Running(reply) => {
                let _ = reply.send(self.scheduler.running_keys());
            }
            Command::IsRunning { key, reply } => {
                let _ = reply.send(self.scheduler.is_running(&key));
            }
            Command::WaitIdle(reply) => self.idle_waiters.push(reply),
            Command::Follow(tx) => match self.followers.lock() {
                Ok(mut followers) => followers.push(tx),
                Err(_) => warn!("follower list poisoned, follow request dropped"),
            },
            Command::Shutdown => self.scheduler.shutdown(),
        }
    }
}
