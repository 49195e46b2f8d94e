//! Cooldowns and validators survive a restart.

use crate::helpers::{CATALOG_BODY, LAST_MODIFIED, Outcome, config_for, terminal_outcomes};
use tidesync::TaskOutput;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[tokio::test]
async fn restart_keeps_cooldowns_and_validators() {
    let server = MockServer::start().await;
    let temp = tempfile::tempdir().expect("tempdir");

    Mock::given(method("GET"))
        .and(path_regex(r"/stations\.json$"))
        .and(|req: &Request| !req.headers.contains_key("if-modified-since"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Last-Modified", LAST_MODIFIED)
                .set_body_string(CATALOG_BODY),
        )
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"/stations\.json$"))
        .and(|req: &Request| {
            req.headers
                .get("if-modified-since")
                .is_some_and(|v| v.as_bytes() == LAST_MODIFIED.as_bytes())
        })
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server.uri(), temp.path());

    // First run: every catalog downloads and enters its cooldown window.
    let app = tidesync::start(&config).unwrap();
    app.orchestrator.refresh_all_catalogs().unwrap();
    app.scheduler.wait_idle().await.unwrap();
    app.shutdown().await.unwrap();

    // Second run: all three keys are still throttled, so nothing runs.
    let app = tidesync::start(&config).unwrap();
    let keys: Vec<String> = app
        .cooldowns
        .entries()
        .unwrap()
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    assert_eq!(
        keys,
        vec!["buoys_catalog", "currents_catalog", "tides_catalog"]
    );

    let mut events = app.scheduler.subscribe();
    app.orchestrator.refresh_all_catalogs().unwrap();
    app.scheduler.wait_idle().await.unwrap();
    assert!(terminal_outcomes(&mut events).is_empty());

    // Clearing one cooldown lets that key run; its stored validator turns
    // the request into a 304.
    assert!(app.cooldowns.clear("tides_catalog").unwrap());
    app.orchestrator.refresh_all_catalogs().unwrap();
    app.scheduler.wait_idle().await.unwrap();
    assert_eq!(
        terminal_outcomes(&mut events),
        vec![(
            "tides_catalog".to_owned(),
            Outcome::Completed(TaskOutput::NotModified)
        )]
    );
    app.shutdown().await.unwrap();
}
