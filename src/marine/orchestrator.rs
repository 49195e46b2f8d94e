//! Fan-out of coarse refresh triggers into per-key task submissions.

use crate::error::Result;
use crate::marine::tasks::{RefreshContext, RefreshTask};
use crate::marine::types::DataSource;
use crate::scheduler::SchedulerHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Station ids the user wants kept fresh, per source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferredStations {
    pub tides: Vec<String>,
    pub currents: Vec<String>,
    pub buoys: Vec<String>,
}

impl PreferredStations {
    pub fn for_source(&self, source: DataSource) -> &[String] {
        match source {
            DataSource::Tides => &self.tides,
            DataSource::Currents => &self.currents,
            DataSource::Buoys => &self.buoys,
        }
    }

    pub fn is_empty(&self) -> bool {
        DataSource::ALL
            .iter()
            .all(|source| self.for_source(*source).is_empty())
    }
}

/// Turns "refresh all catalogs" and "refresh these stations" into one
/// [`RefreshTask`] per key.
///
/// Holds nothing beyond the scheduler handle and the shared refresh
/// context, so it is cheap to clone or rebuild per caller. Repeated ids
/// are submitted as-is; the scheduler's per-key dedup collapses them.
#[derive(Debug, Clone)]
pub struct RefreshOrchestrator {
    scheduler: SchedulerHandle,
    ctx: Arc<RefreshContext>,
}

impl RefreshOrchestrator {
    pub fn new(scheduler: SchedulerHandle, ctx: Arc<RefreshContext>) -> Self {
        Self { scheduler, ctx }
    }

    /// Submit one catalog task per source. Returns the number submitted.
    pub fn refresh_all_catalogs(&self) -> Result<usize> {
        for source in DataSource::ALL {
            self.scheduler
                .submit(RefreshTask::catalog(source, Arc::clone(&self.ctx)))?;
        }
        debug!(submitted = DataSource::ALL.len(), "catalog refresh requested");
        Ok(DataSource::ALL.len())
    }

    /// Submit one station-data task per id. Returns the number submitted.
    pub fn refresh_stations<I, S>(&self, source: DataSource, station_ids: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut submitted = 0;
        for station_id in station_ids {
            self.scheduler.submit(RefreshTask::station_data(
                source,
                station_id,
                Arc::clone(&self.ctx),
            ))?;
            submitted += 1;
        }
        debug!(source = %source, submitted, "station refresh requested");
        Ok(submitted)
    }

    /// Submit a station-data task for every preferred station.
    pub fn refresh_preferred(&self, preferred: &PreferredStations) -> Result<usize> {
        let mut submitted = 0;
        for source in DataSource::ALL {
            submitted += self.refresh_stations(source, preferred.for_source(source).iter().cloned())?;
        }
        Ok(submitted)
    }
}
