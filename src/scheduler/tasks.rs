//! Task contract.
//!
//! A [`Task`] is a keyed, idempotent unit of background work with a
//! cooldown policy. Two task values with the same [`Task::key`] describe
//! the same work: the scheduler runs at most one of them at a time and
//! throttles both by the same cooldown record.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Value produced by a successful task body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskOutput {
    /// Remote data changed and `records` rows were written locally.
    Refreshed {
        /// Number of records written.
        records: usize,
    },
    /// The origin reported no change; nothing was written.
    NotModified,
    /// Free-form summary for tasks without a data sink.
    Message {
        /// Human-readable summary.
        text: String,
    },
}

impl std::fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Refreshed { records } => write!(f, "refreshed {records} records"),
            Self::NotModified => write!(f, "not modified"),
            Self::Message { text } => write!(f, "{text}"),
        }
    }
}

/// A named unit of background work.
///
/// `call` runs on a worker, never on the scheduler's context. It must not
/// touch the cooldown store or the scheduler's running set; the scheduler
/// updates both from the outcome.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Stable identity used for in-flight dedup and cooldown lookup.
    ///
    /// Must be deterministic for one logical piece of work, e.g. task type
    /// plus station id.
    fn key(&self) -> String;

    /// Minimum time after a successful run before the key may run again.
    /// [`Duration::ZERO`] disables throttling.
    fn cooldown(&self) -> Duration;

    /// Execute the work.
    async fn call(&self) -> Result<TaskOutput>;
}
