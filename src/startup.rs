//! Startup wiring: opens the persisted stores and starts the scheduler
//! service.
//!
//! Call [`start`] from inside a Tokio runtime; the scheduler service is
//! spawned onto it.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::kv::{JsonFileKvStore, KeyValueStore, KvValidatorStore};
use crate::marine::{FileMarineStore, MarineStore, RefreshContext, RefreshOrchestrator};
use crate::scheduler::{
    CooldownStore, DEFAULT_EVENT_CAPACITY, Scheduler, SchedulerHandle, scheduler_service,
};
use std::sync::Arc;
use tidesync_fetch::ConditionalFetcher;
use tokio::task::JoinHandle;
use tracing::info;

/// A running refresh engine.
pub struct SyncApp {
    /// Client for the scheduler service.
    pub scheduler: SchedulerHandle,
    /// Fan-out entry point for refresh triggers.
    pub orchestrator: RefreshOrchestrator,
    /// Persisted cooldown records (for inspection and reset).
    pub cooldowns: CooldownStore,
    /// Local station and time-series data.
    pub store: Arc<dyn MarineStore>,
    service: JoinHandle<()>,
}

impl SyncApp {
    /// Stop admitting work, let in-flight tasks finish, and wait for the
    /// service to exit.
    pub async fn shutdown(self) -> Result<()> {
        let Self {
            scheduler,
            orchestrator,
            service,
            ..
        } = self;
        scheduler.shutdown()?;
        drop(orchestrator);
        drop(scheduler);
        service
            .await
            .map_err(|e| SyncError::Scheduler(format!("scheduler service panicked: {e}")))
    }
}

/// Open the stores named by `config` and start the engine.
pub fn start(config: &SyncConfig) -> Result<SyncApp> {
    config.validate()?;
    let storage = &config.storage;

    let cooldown_kv: Arc<dyn KeyValueStore> =
        Arc::new(JsonFileKvStore::open(storage.cooldowns_path())?);
    let validator_kv: Arc<dyn KeyValueStore> =
        Arc::new(JsonFileKvStore::open(storage.validators_path())?);

    let fetcher = ConditionalFetcher::new(
        &config.fetch,
        Arc::new(KvValidatorStore::new(validator_kv)),
    )?;
    let store: Arc<dyn MarineStore> = Arc::new(FileMarineStore::new(storage.data_dir()));
    let cooldowns = CooldownStore::new(cooldown_kv);

    let scheduler = Scheduler::new(cooldowns.clone(), config.scheduler.max_workers);
    let (handle, service) = scheduler_service(scheduler, DEFAULT_EVENT_CAPACITY);
    let service = service.run();

    let ctx = Arc::new(RefreshContext {
        fetcher,
        store: Arc::clone(&store),
        sources: config.sources.clone(),
        cooldowns: config.cooldowns.clone(),
    });
    let orchestrator = RefreshOrchestrator::new(handle.clone(), ctx);

    info!(
        state_dir = %storage.state_dir().display(),
        max_workers = config.scheduler.max_workers,
        "tidesync started"
    );

    Ok(SyncApp {
        scheduler: handle,
        orchestrator,
        cooldowns,
        store,
        service,
    })
}
