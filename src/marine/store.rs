//! Station and observation persistence.
//!
//! Refresh tasks call these only after a fresh (2xx) fetch; a not-modified
//! response never reaches the store.

use crate::error::{Result, SyncError};
use crate::kv::write_json_atomic;
use crate::marine::types::{DataSource, Observation, Station, is_valid_station_id};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Replace/query access to the local catalog and time-series tables.
pub trait MarineStore: Send + Sync {
    /// Replace the whole catalog of `source`.
    fn replace_all(&self, source: DataSource, stations: &[Station]) -> Result<()>;

    /// Every station in the catalog of `source`.
    fn query_all(&self, source: DataSource) -> Result<Vec<Station>>;

    /// Catalog entries whose id is in `ids`, in catalog order.
    fn query_by_ids(&self, source: DataSource, ids: &[String]) -> Result<Vec<Station>>;

    /// Replace the time series of one station.
    fn replace_all_for_entity(
        &self,
        source: DataSource,
        station_id: &str,
        observations: &[Observation],
    ) -> Result<()>;

    /// The stored time series of one station; empty if never written.
    fn query_by_entity(&self, source: DataSource, station_id: &str) -> Result<Vec<Observation>>;
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| SyncError::Store("marine store lock poisoned".to_owned()))
}

fn filter_ids(stations: Vec<Station>, ids: &[String]) -> Vec<Station> {
    stations
        .into_iter()
        .filter(|s| ids.iter().any(|id| id == &s.id))
        .collect()
}

/// In-memory store. Counts replace calls so callers can assert that
/// unchanged remote data caused no local writes.
#[derive(Debug, Default)]
pub struct MemoryMarineStore {
    catalogs: Mutex<HashMap<DataSource, Vec<Station>>>,
    series: Mutex<HashMap<(DataSource, String), Vec<Observation>>>,
    writes: AtomicUsize,
}

impl MemoryMarineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful replace calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl MarineStore for MemoryMarineStore {
    fn replace_all(&self, source: DataSource, stations: &[Station]) -> Result<()> {
        lock(&self.catalogs)?.insert(source, stations.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn query_all(&self, source: DataSource) -> Result<Vec<Station>> {
        Ok(lock(&self.catalogs)?.get(&source).cloned().unwrap_or_default())
    }

    fn query_by_ids(&self, source: DataSource, ids: &[String]) -> Result<Vec<Station>> {
        Ok(filter_ids(self.query_all(source)?, ids))
    }

    fn replace_all_for_entity(
        &self,
        source: DataSource,
        station_id: &str,
        observations: &[Observation],
    ) -> Result<()> {
        lock(&self.series)?.insert((source, station_id.to_owned()), observations.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn query_by_entity(&self, source: DataSource, station_id: &str) -> Result<Vec<Observation>> {
        Ok(lock(&self.series)?
            .get(&(source, station_id.to_owned()))
            .cloned()
            .unwrap_or_default())
    }
}

/// JSON files under a root directory:
///
/// ```text
/// <root>/<source>/catalog.json
/// <root>/<source>/stations/<station_id>.json
/// ```
#[derive(Debug, Clone)]
pub struct FileMarineStore {
    root: PathBuf,
}

impl FileMarineStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn catalog_path(&self, source: DataSource) -> PathBuf {
        self.root.join(source.as_str()).join("catalog.json")
    }

    fn station_path(&self, source: DataSource, station_id: &str) -> Result<PathBuf> {
        if !is_valid_station_id(station_id) {
            return Err(SyncError::Store(format!(
                "invalid station id `{station_id}`"
            )));
        }
        Ok(self
            .root
            .join(source.as_str())
            .join("stations")
            .join(format!("{station_id}.json")))
    }
}

fn read_json<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => {
            return Err(SyncError::Store(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };
    serde_json::from_slice(&bytes)
        .map_err(|e| SyncError::Store(format!("corrupt {}: {e}", path.display())))
}

impl MarineStore for FileMarineStore {
    fn replace_all(&self, source: DataSource, stations: &[Station]) -> Result<()> {
        let path = self.catalog_path(source);
        write_json_atomic(&path, stations)?;
        debug!(source = %source, records = stations.len(), "catalog replaced");
        Ok(())
    }

    fn query_all(&self, source: DataSource) -> Result<Vec<Station>> {
        read_json(&self.catalog_path(source))
    }

    fn query_by_ids(&self, source: DataSource, ids: &[String]) -> Result<Vec<Station>> {
        Ok(filter_ids(self.query_all(source)?, ids))
    }

    fn replace_all_for_entity(
        &self,
        source: DataSource,
        station_id: &str,
        observations: &[Observation],
    ) -> Result<()> {
        let path = self.station_path(source, station_id)?;
        write_json_atomic(&path, observations)?;
        debug!(
            source = %source,
            station_id,
            records = observations.len(),
            "station series replaced"
        );
        Ok(())
    }

    fn query_by_entity(&self, source: DataSource, station_id: &str) -> Result<Vec<Observation>> {
        read_json(&self.station_path(source, station_id)?)
    }
}
