//! Configuration types for tidesync.

use crate::error::{Result, SyncError};
use crate::marine::orchestrator::PreferredStations;
use crate::marine::types::DataSource;
use crate::scheduler::DEFAULT_MAX_WORKERS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tidesync_fetch::FetchConfig;

/// Placeholder replaced by the station id in [`SourceConfig::data_url`].
pub const STATION_PLACEHOLDER: &str = "{station}";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub scheduler: SchedulerConfig,
    pub cooldowns: CooldownConfig,
    pub fetch: FetchConfig,
    pub sources: SourcesConfig,
    pub preferred: PreferredStations,
    pub storage: StorageConfig,
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of task bodies running at once.
    pub max_workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

/// Minimum time between successful refreshes of the same key.
/// Zero disables throttling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    /// Catalog refreshes (one per source). Default: one day.
    pub catalog_secs: u64,
    /// Per-station time-series refreshes. Default: 15 minutes.
    pub station_data_secs: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            catalog_secs: 86_400,
            station_data_secs: 900,
        }
    }
}

impl CooldownConfig {
    pub fn catalog(&self) -> Duration {
        Duration::from_secs(self.catalog_secs)
    }

    pub fn station_data(&self) -> Duration {
        Duration::from_secs(self.station_data_secs)
    }

    /// Both periods zero, for tests and forced refreshes.
    pub fn disabled() -> Self {
        Self {
            catalog_secs: 0,
            station_data_secs: 0,
        }
    }
}

/// Endpoints of one data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// JSON array of stations.
    pub catalog_url: Option<String>,
    /// JSON array of observations; must contain `{station}`.
    pub data_url: Option<String>,
}

impl SourceConfig {
    /// Data URL for `station_id`, if a template is configured.
    pub fn station_url(&self, station_id: &str) -> Option<String> {
        self.data_url
            .as_deref()
            .map(|template| template.replace(STATION_PLACEHOLDER, station_id))
    }

    fn validate(&self, source: DataSource) -> Result<()> {
        if let Some(url) = &self.catalog_url {
            check_url(url).map_err(|e| {
                SyncError::Config(format!("sources.{source}.catalog_url: {e}"))
            })?;
        }
        if let Some(template) = &self.data_url {
            if !template.contains(STATION_PLACEHOLDER) {
                return Err(SyncError::Config(format!(
                    "sources.{source}.data_url must contain {STATION_PLACEHOLDER}"
                )));
            }
            check_url(&template.replace(STATION_PLACEHOLDER, "0")).map_err(|e| {
                SyncError::Config(format!("sources.{source}.data_url: {e}"))
            })?;
        }
        Ok(())
    }
}

fn check_url(raw: &str) -> std::result::Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("invalid URL `{raw}`: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme `{other}`")),
    }
}

/// Endpoints for every source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub tides: SourceConfig,
    pub currents: SourceConfig,
    pub buoys: SourceConfig,
}

impl SourcesConfig {
    pub fn get(&self, source: DataSource) -> &SourceConfig {
        match source {
            DataSource::Tides => &self.tides,
            DataSource::Currents => &self.currents,
            DataSource::Buoys => &self.buoys,
        }
    }

    pub fn get_mut(&mut self, source: DataSource) -> &mut SourceConfig {
        match source {
            DataSource::Tides => &mut self.tides,
            DataSource::Currents => &mut self.currents,
            DataSource::Buoys => &mut self.buoys,
        }
    }
}

/// Where persisted state lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// State directory. Defaults to the platform data directory.
    pub state_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(crate::sync_dirs::data_dir)
    }

    /// Cooldown timestamps.
    pub fn cooldowns_path(&self) -> PathBuf {
        self.state_dir().join("cooldowns.json")
    }

    /// HTTP validators.
    pub fn validators_path(&self) -> PathBuf {
        self.state_dir().join("validators.json")
    }

    /// Station catalogs and time series.
    pub fn data_dir(&self) -> PathBuf {
        self.state_dir().join("data")
    }
}

impl SyncConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Load `path` if it exists, otherwise defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SyncError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.max_workers == 0 {
            return Err(SyncError::Config(
                "scheduler.max_workers must be greater than zero".to_owned(),
            ));
        }
        self.fetch
            .validate()
            .map_err(|e| SyncError::Config(format!("fetch: {e}")))?;
        for source in DataSource::ALL {
            self.sources.get(source).validate(source)?;
        }
        Ok(())
    }
}
