//! Shared helpers for integration tests.

use std::path::Path;
use tidesync::config::SourceConfig;
use tidesync::{DataSource, SyncConfig, TaskEvent, TaskOutput};
use tokio::sync::broadcast;

pub(crate) const LAST_MODIFIED: &str = "Tue, 13 Oct 2026 06:00:00 GMT";

pub(crate) const CATALOG_BODY: &str = r#"[
    {"id":"9414290","name":"San Francisco","latitude":37.8063,"longitude":-122.4659},
    {"id":"9410170","name":"San Diego","latitude":32.7142,"longitude":-117.1736}
]"#;

pub(crate) const SERIES_BODY: &str = r#"[
    {"time":"2026-10-13T00:00:00Z","value":1.21},
    {"time":"2026-10-13T00:06:00Z","value":1.24},
    {"time":"2026-10-13T00:12:00Z","value":1.27}
]"#;

/// Config pointing every source at `server_uri` and keeping state in `state_dir`.
pub(crate) fn config_for(server_uri: &str, state_dir: &Path) -> SyncConfig {
    let mut config = SyncConfig::default();
    for source in DataSource::ALL {
        *config.sources.get_mut(source) = SourceConfig {
            catalog_url: Some(format!("{server_uri}/{source}/stations.json")),
            data_url: Some(format!("{server_uri}/{source}/data/{{station}}.json")),
        };
    }
    config.storage.state_dir = Some(state_dir.to_path_buf());
    config
}

/// Outcome of one terminal event, for compact assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Completed(TaskOutput),
    Failed,
}

/// Drain buffered events, returning terminal outcomes sorted by key.
pub(crate) fn terminal_outcomes(rx: &mut broadcast::Receiver<TaskEvent>) -> Vec<(String, Outcome)> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            TaskEvent::Completed { key, output, .. } => out.push((key, Outcome::Completed(output))),
            TaskEvent::Failed { key, .. } => out.push((key, Outcome::Failed)),
            TaskEvent::Started { .. } => {}
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}
