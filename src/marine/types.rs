//! Marine data records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the remote read-only data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Tides,
    Currents,
    Buoys,
}

impl DataSource {
    /// Every source, in catalog refresh order.
    pub const ALL: [DataSource; 3] = [Self::Tides, Self::Currents, Self::Buoys];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tides => "tides",
            Self::Currents => "currents",
            Self::Buoys => "buoys",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tides" | "tide" => Some(Self::Tides),
            "currents" | "current" => Some(Self::Currents),
            "buoys" | "buoy" => Some(Self::Buoys),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown data source `{s}` (tides, currents, buoys)"))
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One point of a station's time series: a prediction or an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Station ids become URL segments and file names, so they are limited to
/// ASCII alphanumerics plus `-`, `_` and `.` (not leading).
#[must_use]
pub fn is_valid_station_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
