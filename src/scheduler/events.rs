//! Task lifecycle events and listener registrations.

use crate::error::SyncError;
use crate::scheduler::tasks::TaskOutput;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle notification for one admitted submission.
///
/// For a given key, `Started` always precedes exactly one of `Completed`
/// or `Failed`. Rejected submissions produce no events.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// The task was admitted and dispatched to the worker pool.
    Started {
        /// Task key.
        key: String,
    },
    /// The task body returned successfully and its cooldown was recorded.
    Completed {
        /// Task key.
        key: String,
        /// Value returned by the body.
        output: TaskOutput,
        /// Wall time from dispatch to completion.
        elapsed: Duration,
    },
    /// The task body failed or panicked. No cooldown was recorded.
    Failed {
        /// Task key.
        key: String,
        /// The failure.
        error: Arc<SyncError>,
        /// Wall time from dispatch to failure.
        elapsed: Duration,
    },
}

impl TaskEvent {
    /// Key of the task this event concerns.
    pub fn key(&self) -> &str {
        match self {
            Self::Started { key } | Self::Completed { key, .. } | Self::Failed { key, .. } => key,
        }
    }

    /// `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Started { .. })
    }
}

/// Handle returned by listener registration, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback receiving task events on the scheduler's context.
pub type TaskListener = Box<dyn FnMut(&TaskEvent) + Send>;

/// Ordered listener collection, notified synchronously in registration order.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, TaskListener)>,
}

impl Listeners {
    pub(crate) fn add(&mut self, listener: TaskListener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn notify(&mut self, event: &TaskEvent) {
        for (_, listener) in &mut self.entries {
            listener(event);
        }
    }
}
