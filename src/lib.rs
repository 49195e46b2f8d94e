//! tidesync: background refresh engine for locally cached marine data.
//!
//! Station catalogs and per-station time series are pulled from remote
//! read-only sources and written to a local store, while avoiding redundant
//! downloads and concurrent duplicate work.
//!
//! # Architecture
//!
//! - **Tasks** ([`scheduler::Task`]): keyed, idempotent units of work with a
//!   cooldown period.
//! - **Cooldowns** ([`scheduler::CooldownStore`]): persisted "last success"
//!   timestamps that throttle re-execution.
//! - **Scheduler** ([`scheduler::Scheduler`]): one-in-flight-per-key dedup,
//!   cooldown admission, a bounded worker pool, and lifecycle events
//!   delivered on the owning context. [`scheduler::SchedulerService`] runs
//!   it on a dedicated Tokio task.
//! - **Conditional fetch** ([`tidesync_fetch::ConditionalFetcher`]):
//!   `If-Modified-Since` / `If-None-Match` GETs so unchanged resources cost
//!   a 304 and no local write.
//! - **Orchestrator** ([`marine::RefreshOrchestrator`]): fans "refresh all
//!   catalogs" and "refresh preferred stations" out into per-key tasks.

pub mod clock;
pub mod config;
pub mod error;
pub mod kv;
pub mod marine;
pub mod scheduler;
pub mod startup;
pub mod sync_dirs;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use marine::{DataSource, PreferredStations, RefreshOrchestrator};
pub use scheduler::{Admission, Scheduler, SchedulerHandle, Task, TaskEvent, TaskOutput};
pub use startup::{SyncApp, start};
