//! Marine data refresh: station catalogs and per-station time series kept
//! in sync with remote read-only sources.

pub mod orchestrator;
pub mod store;
pub mod tasks;
pub mod types;

pub use orchestrator::{PreferredStations, RefreshOrchestrator};
pub use store::{FileMarineStore, MarineStore, MemoryMarineStore};
pub use tasks::{RefreshContext, RefreshKind, RefreshTask};
pub use types::{DataSource, Observation, Station};
