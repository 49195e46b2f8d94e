//! The `tidesync` binary streams every event and always shuts down.

use crate::helpers::{CATALOG_BODY, config_for};
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run_cli(config_path: &Path, state_dir: &Path, args: &[&str]) -> Output {
    let child = tokio::process::Command::new(env!("CARGO_BIN_EXE_tidesync"))
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env("RUST_LOG", "tidesync=info")
        .env("TIDESYNC_DATA_DIR", state_dir)
        .kill_on_drop(true)
        .output();
    tokio::time::timeout(Duration::from_secs(60), child)
        .await
        .expect("tidesync did not exit")
        .expect("spawn tidesync")
}

fn lines_starting_with(output: &Output, prefix: &str) -> usize {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| line.starts_with(prefix))
        .count()
}

#[tokio::test]
async fn every_failure_is_reported_for_a_large_batch() {
    // No mocks: every station request gets a 404.
    let server = MockServer::start().await;
    let temp = tempfile::tempdir().expect("tempdir");
    let config_path = temp.path().join("config.toml");
    config_for(&server.uri(), temp.path())
        .save_to_file(&config_path)
        .unwrap();

    let ids: Vec<String> = (0..200).map(|i| format!("s{i}")).collect();
    let mut args = vec!["stations", "--source", "tides"];
    args.extend(ids.iter().map(String::as_str));
    let output = run_cli(&config_path, temp.path(), &args).await;

    assert!(!output.status.success());
    assert_eq!(lines_starting_with(&output, "started "), 200);
    assert_eq!(lines_starting_with(&output, "failed "), 200);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("200 refresh task(s) failed"));
    // The failing command still went through shutdown.
    assert!(stderr.contains("scheduler service stopped"));
}

#[tokio::test]
async fn successful_refresh_prints_each_completion_and_exits_cleanly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/(tides|currents|buoys)/stations\.json$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CATALOG_BODY))
        .expect(3)
        .mount(&server)
        .await;
    let temp = tempfile::tempdir().expect("tempdir");
    let config_path = temp.path().join("config.toml");
    config_for(&server.uri(), temp.path())
        .save_to_file(&config_path)
        .unwrap();

    let output = run_cli(&config_path, temp.path(), &["catalogs"]).await;

    assert!(output.status.success());
    assert_eq!(lines_starting_with(&output, "completed "), 3);
    assert!(String::from_utf8_lossy(&output.stderr).contains("scheduler service stopped"));

    // The cooldowns written by the first run throttle the second.
    let again = run_cli(&config_path, temp.path(), &["catalogs"]).await;
    assert!(again.status.success());
    assert_eq!(lines_starting_with(&again, "started "), 0);
}
