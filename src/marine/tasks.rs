//! Refresh tasks: catalog and per-station conditional fetches.

use crate::config::{CooldownConfig, SourcesConfig};
use crate::error::{Result, SyncError};
use crate::marine::store::MarineStore;
use crate::marine::types::{DataSource, Observation, Station, is_valid_station_id};
use crate::scheduler::{Task, TaskOutput};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tidesync_fetch::{ConditionalFetcher, JsonDecoder};
use tracing::debug;

/// Everything a refresh task needs at run time. Shared by all tasks built
/// by one orchestrator.
pub struct RefreshContext {
    pub fetcher: ConditionalFetcher,
    pub store: Arc<dyn MarineStore>,
    pub sources: SourcesConfig,
    pub cooldowns: CooldownConfig,
}

impl std::fmt::Debug for RefreshContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshContext")
            .field("sources", &self.sources)
            .field("cooldowns", &self.cooldowns)
            .finish_non_exhaustive()
    }
}

/// What a [`RefreshTask`] refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefreshKind {
    /// The whole station catalog of one source.
    Catalog(DataSource),
    /// The time series of one station.
    StationData {
        source: DataSource,
        station_id: String,
    },
}

impl RefreshKind {
    /// `<source>_catalog` or `<source>_data:<station_id>`.
    pub fn key(&self) -> String {
        match self {
            Self::Catalog(source) => format!("{source}_catalog"),
            Self::StationData { source, station_id } => format!("{source}_data:{station_id}"),
        }
    }

    pub fn source(&self) -> DataSource {
        match self {
            Self::Catalog(source) | Self::StationData { source, .. } => *source,
        }
    }
}

/// A keyed conditional refresh of one remote resource into the store.
#[derive(Debug, Clone)]
pub struct RefreshTask {
    kind: RefreshKind,
    ctx: Arc<RefreshContext>,
}

impl RefreshTask {
    pub fn catalog(source: DataSource, ctx: Arc<RefreshContext>) -> Self {
        Self {
            kind: RefreshKind::Catalog(source),
            ctx,
        }
    }

    pub fn station_data(
        source: DataSource,
        station_id: impl Into<String>,
        ctx: Arc<RefreshContext>,
    ) -> Self {
        Self {
            kind: RefreshKind::StationData {
                source,
                station_id: station_id.into(),
            },
            ctx,
        }
    }

    pub fn kind(&self) -> &RefreshKind {
        &self.kind
    }

    async fn refresh_catalog(&self, source: DataSource) -> Result<Option<usize>> {
        let url = self
            .ctx
            .sources
            .get(source)
            .catalog_url
            .as_deref()
            .ok_or_else(|| SyncError::Config(format!("no catalog_url configured for {source}")))?;
        let store = &self.ctx.store;

        self.ctx
            .fetcher
            .fetch_and_apply(
                &self.key(),
                url,
                &JsonDecoder::<Vec<Station>>::new(),
                |stations: Vec<Station>| -> Result<usize> {
                    store.replace_all(source, &stations)?;
                    Ok(stations.len())
                },
            )
            .await
    }

    async fn refresh_station(&self, source: DataSource, station_id: &str) -> Result<Option<usize>> {
        if !is_valid_station_id(station_id) {
            return Err(SyncError::Config(format!(
                "invalid station id `{station_id}`"
            )));
        }
        let url = self
            .ctx
            .sources
            .get(source)
            .station_url(station_id)
            .ok_or_else(|| SyncError::Config(format!("no data_url configured for {source}")))?;
        let store = &self.ctx.store;

        self.ctx
            .fetcher
            .fetch_and_apply(
                &self.key(),
                &url,
                &JsonDecoder::<Vec<Observation>>::new(),
                |observations: Vec<Observation>| -> Result<usize> {
                    store.replace_all_for_entity(source, station_id, &observations)?;
                    Ok(observations.len())
                },
            )
            .await
    }
}

#[async_trait]
impl Task for RefreshTask {
    fn key(&self) -> String {
        self.kind.key()
    }

    fn cooldown(&self) -> Duration {
        match self.kind {
            RefreshKind::Catalog(_) => self.ctx.cooldowns.catalog(),
            RefreshKind::StationData { .. } => self.ctx.cooldowns.station_data(),
        }
    }

    async fn call(&self) -> Result<TaskOutput> {
        let started = Instant::now();
        let written = match &self.kind {
            RefreshKind::Catalog(source) => self.refresh_catalog(*source).await?,
            RefreshKind::StationData { source, station_id } => {
                self.refresh_station(*source, station_id).await?
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(match written {
            Some(records) => {
                debug!(key = %self.key(), records, elapsed_ms, "refresh wrote records");
                TaskOutput::Refreshed { records }
            }
            None => {
                debug!(key = %self.key(), elapsed_ms, "refresh skipped, remote unchanged");
                TaskOutput::NotModified
            }
        })
    }
}
