//! TOML config files drive startup.

use tidesync::{DataSource, SyncConfig, SyncError};

#[test]
fn toml_file_round_trips_and_validates() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[scheduler]
max_workers = 8

[cooldowns]
catalog_secs = 3600

[fetch]
timeout_seconds = 15
user_agent = "tidesync-test/1.0"

[sources.buoys]
catalog_url = "https://marine.example/buoys/stations.json"
data_url = "https://marine.example/buoys/{station}/latest.json"

[preferred]
buoys = ["46026", "46042"]
"#,
    )
    .unwrap();

    let config = SyncConfig::from_file(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.scheduler.max_workers, 8);
    assert_eq!(config.cooldowns.catalog_secs, 3600);
    assert_eq!(config.cooldowns.station_data_secs, 900);
    assert_eq!(config.fetch.connect_timeout_seconds, 10);
    assert_eq!(config.preferred.for_source(DataSource::Buoys).len(), 2);
    assert_eq!(
        config
            .sources
            .get(DataSource::Buoys)
            .station_url("46042")
            .as_deref(),
        Some("https://marine.example/buoys/46042/latest.json")
    );

    let copy = temp.path().join("copy.toml");
    config.save_to_file(&copy).unwrap();
    let reloaded = SyncConfig::from_file(&copy).unwrap();
    assert_eq!(reloaded.sources, config.sources);
    assert_eq!(reloaded.preferred, config.preferred);
    assert_eq!(reloaded.fetch, config.fetch);
}

#[test]
fn malformed_toml_is_a_config_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[scheduler\nmax_workers = ").unwrap();
    assert!(matches!(
        SyncConfig::from_file(&path),
        Err(SyncError::Config(_))
    ));
}

#[tokio::test]
async fn invalid_source_url_blocks_startup() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut config = SyncConfig::default();
    config.storage.state_dir = Some(temp.path().to_path_buf());
    config.sources.tides.data_url = Some("https://marine.example/tides.json".into());
    assert!(matches!(
        tidesync::start(&config),
        Err(SyncError::Config(_))
    ));
}
