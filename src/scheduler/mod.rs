//! Keyed background task scheduler.
//!
//! Tasks carry a stable key and a cooldown period. The scheduler runs at
//! most one task per key at a time, refuses keys that completed
//! successfully within their cooldown window, executes bodies on a bounded
//! worker pool, and reports `Started` / `Completed` / `Failed` events on the
//! context that owns it.

pub mod cooldown;
pub mod events;
pub mod runner;
pub mod service;
pub mod tasks;

pub use cooldown::CooldownStore;
pub use events::{ListenerId, TaskEvent, TaskListener};
pub use runner::{Admission, DEFAULT_MAX_WORKERS, Scheduler};
pub use service::{
    DEFAULT_EVENT_CAPACITY, FollowSummary, SchedulerHandle, SchedulerService, scheduler_service,
};
pub use tasks::{Task, TaskOutput};
