//! Cooldown store.
//!
//! Remembers when each task key last completed successfully and decides
//! whether a new submission of that key is still throttled. Timestamps are
//! persisted as epoch milliseconds in a [`KeyValueStore`], so throttling
//! survives restarts.

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::scheduler::tasks::Task;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Persisted "last successful completion" timestamps keyed by task key.
#[derive(Clone)]
pub struct CooldownStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CooldownStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooldownStore").finish_non_exhaustive()
    }
}

impl CooldownStore {
    /// Cooldown store on the system clock.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(kv, Arc::new(SystemClock))
    }

    /// Cooldown store on an explicit clock.
    pub fn with_clock(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// `true` iff `task` has a cooldown, a recorded success, and less than
    /// the cooldown period has elapsed since that success.
    pub fn is_on_cooldown(&self, task: &dyn Task) -> bool {
        !self.remaining_cooldown(task).is_zero()
    }

    /// Time left before `task` may run again; zero when not throttled.
    pub fn remaining_cooldown(&self, task: &dyn Task) -> Duration {
        self.remaining_for_key(&task.key(), task.cooldown())
    }

    /// Time left for `key` under `period`; zero when not throttled.
    pub fn remaining_for_key(&self, key: &str, period: Duration) -> Duration {
        if period.is_zero() {
            return Duration::ZERO;
        }
        let Some(last) = self.last_success(key) else {
            return Duration::ZERO;
        };

        // A clock that moved backwards counts as "just completed".
        let elapsed = (self.clock.now() - last).to_std().unwrap_or(Duration::ZERO);
        period.saturating_sub(elapsed)
    }

    /// Last recorded success for `key`. Unreadable records are ignored.
    pub fn last_success(&self, key: &str) -> Option<DateTime<Utc>> {
        let raw = match self.kv.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, "cannot read cooldown record: {e}");
                return None;
            }
        };
        let parsed = raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis);
        if parsed.is_none() {
            warn!(key, value = %raw, "ignoring malformed cooldown record");
        }
        parsed
    }

    /// Stamp `task`'s key with the current time. Only called after a
    /// successful run.
    pub fn record_completion(&self, task: &dyn Task) -> Result<()> {
        self.record_key(&task.key())
    }

    /// Stamp `key` with the current time.
    pub fn record_key(&self, key: &str) -> Result<()> {
        let now = self.clock.now().timestamp_millis();
        self.kv.put(key, &now.to_string())
    }

    /// Forget the record for `key`.
    pub fn clear(&self, key: &str) -> Result<bool> {
        self.kv.remove(key)
    }

    /// Forget every record.
    pub fn clear_all(&self) -> Result<()> {
        self.kv.clear()
    }

    /// All keys with a recorded success and their timestamps.
    pub fn entries(&self) -> Result<Vec<(String, DateTime<Utc>)>> {
        Ok(self
            .kv
            .keys()?
            .into_iter()
            .filter_map(|key| self.last_success(&key).map(|at| (key, at)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::clock::ManualClock;
    use crate::kv::MemoryKvStore;
    use crate::scheduler::tasks::TaskOutput;
    use async_trait::async_trait;

    struct Probe {
        key: &'static str,
        cooldown: Duration,
    }

    #[async_trait]
    impl Task for Probe {
        fn key(&self) -> String {
            self.key.to_owned()
        }
        fn cooldown(&self) -> Duration {
            self.cooldown
        }
        async fn call(&self) -> Result<TaskOutput> {
            Ok(TaskOutput::NotModified)
        }
    }

    fn store() -> (CooldownStore, Arc<ManualClock>, Arc<MemoryKvStore>) {
        let clock = Arc::new(ManualClock::default());
        let kv = Arc::new(MemoryKvStore::new());
        let store = CooldownStore::with_clock(kv.clone(), clock.clone());
        (store, clock, kv)
    }

    const FIVE_MIN: Duration = Duration::from_secs(300);

    #[test]
    fn unknown_key_is_not_on_cooldown() {
        let (store, _, _) = store();
        let task = Probe {
            key: "Z",
            cooldown: FIVE_MIN,
        };
        assert!(!store.is_on_cooldown(&task));
        assert_eq!(store.remaining_cooldown(&task), Duration::ZERO);
    }

    #[test]
    fn zero_period_never_throttles() {
        let (store, _, _) = store();
        let task = Probe {
            key: "X",
            cooldown: Duration::ZERO,
        };
        store.record_completion(&task).unwrap();
        assert!(!store.is_on_cooldown(&task));
    }

    #[test]
    fn window_closes_exactly_at_period() {
        let (store, clock, _) = store();
        let task = Probe {
            key: "Z",
            cooldown: FIVE_MIN,
        };
        store.record_completion(&task).unwrap();

        clock.advance(Duration::from_secs(120));
        assert!(store.is_on_cooldown(&task));
        assert_eq!(store.remaining_cooldown(&task), Duration::from_secs(180));

        clock.advance(Duration::from_secs(180));
        assert!(!store.is_on_cooldown(&task));

        clock.advance(Duration::from_secs(60));
        assert!(!store.is_on_cooldown(&task));
    }

    #[test]
    fn backwards_clock_keeps_full_window() {
        let (store, clock, _) = store();
        let task = Probe {
            key: "Z",
            cooldown: FIVE_MIN,
        };
        clock.advance(Duration::from_secs(3600));
        store.record_completion(&task).unwrap();
        clock.set(DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(store.remaining_cooldown(&task), FIVE_MIN);
    }

    #[test]
    fn clear_and_clear_all() {
        let (store, _, _) = store();
        store.record_key("a").unwrap();
        store.record_key("b").unwrap();
        assert!(store.clear("a").unwrap());
        assert!(store.last_success("a").is_none());
        assert_eq!(store.entries().unwrap().len(), 1);

        store.clear_all().unwrap();
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn malformed_record_is_ignored() {
        let (store, _, kv) = store();
        kv.put("Z", "yesterday").unwrap();
        let task = Probe {
            key: "Z",
            cooldown: FIVE_MIN,
        };
        assert!(!store.is_on_cooldown(&task));
        assert!(store.entries().unwrap().is_empty());
    }
}
