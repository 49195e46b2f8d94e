//! End-to-end refreshes through `tidesync::start` against a mock origin.

use crate::helpers::{
    CATALOG_BODY, LAST_MODIFIED, Outcome, SERIES_BODY, config_for, terminal_outcomes,
};
use tidesync::config::CooldownConfig;
use tidesync::marine::MarineStore;
use tidesync::{DataSource, PreferredStations, TaskOutput};
use wiremock::matchers::{header_exists, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[tokio::test]
async fn catalogs_then_preferred_stations_land_in_the_store() {
    let server = MockServer::start().await;
    let temp = tempfile::tempdir().expect("tempdir");

    Mock::given(method("GET"))
        .and(path_regex(r"^/(tides|currents|buoys)/stations\.json$"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Last-Modified", LAST_MODIFIED)
                .set_body_string(CATALOG_BODY),
        )
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/tides/data/\d+\.json$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SERIES_BODY))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = config_for(&server.uri(), temp.path());
    config.preferred = PreferredStations {
        tides: vec!["9414290".into(), "9410170".into()],
        ..PreferredStations::default()
    };

    let app = tidesync::start(&config).unwrap();
    let mut events = app.scheduler.subscribe();

    app.orchestrator.refresh_all_catalogs().unwrap();
    app.orchestrator.refresh_preferred(&config.preferred).unwrap();
    app.scheduler.wait_idle().await.unwrap();

    let refreshed_catalog = Outcome::Completed(TaskOutput::Refreshed { records: 2 });
    let refreshed_series = Outcome::Completed(TaskOutput::Refreshed { records: 3 });
    assert_eq!(
        terminal_outcomes(&mut events),
        vec![
            ("buoys_catalog".to_owned(), refreshed_catalog.clone()),
            ("currents_catalog".to_owned(), refreshed_catalog.clone()),
            ("tides_catalog".to_owned(), refreshed_catalog),
            ("tides_data:9410170".to_owned(), refreshed_series.clone()),
            ("tides_data:9414290".to_owned(), refreshed_series),
        ]
    );

    let picked = app
        .store
        .query_by_ids(DataSource::Tides, &["9410170".to_owned()])
        .unwrap();
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].name, "San Diego");
    assert_eq!(
        app.store
            .query_by_entity(DataSource::Tides, "9414290")
            .unwrap()
            .len(),
        3
    );

    assert!(temp.path().join("validators.json").exists());
    assert_eq!(app.cooldowns.entries().unwrap().len(), 5);
    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn unchanged_remote_answers_not_modified_without_rewriting() {
    let server = MockServer::start().await;
    let temp = tempfile::tempdir().expect("tempdir");

    Mock::given(method("GET"))
        .and(path("/buoys/data/46026.json"))
        .and(|req: &Request| !req.headers.contains_key("if-none-match"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"series-v1\"")
                .set_body_string(SERIES_BODY),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/buoys/data/46026.json"))
        .and(header_exists("if-none-match"))
        .and(|req: &Request| {
            req.headers
                .get("if-none-match")
                .is_some_and(|v| v.as_bytes() == b"\"series-v1\"")
        })
        .respond_with(ResponseTemplate::new(304))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = config_for(&server.uri(), temp.path());
    config.cooldowns = CooldownConfig::disabled();
    let app = tidesync::start(&config).unwrap();
    let series_file = temp.path().join("data/buoys/stations/46026.json");

    let mut events = app.scheduler.subscribe();
    app.orchestrator
        .refresh_stations(DataSource::Buoys, ["46026"])
        .unwrap();
    app.scheduler.wait_idle().await.unwrap();
    assert_eq!(
        terminal_outcomes(&mut events),
        vec![(
            "buoys_data:46026".to_owned(),
            Outcome::Completed(TaskOutput::Refreshed { records: 3 })
        )]
    );
    let written = std::fs::metadata(&series_file).unwrap().modified().unwrap();

    for _ in 0..2 {
        app.orchestrator
            .refresh_stations(DataSource::Buoys, ["46026"])
            .unwrap();
        app.scheduler.wait_idle().await.unwrap();
        assert_eq!(
            terminal_outcomes(&mut events),
            vec![(
                "buoys_data:46026".to_owned(),
                Outcome::Completed(TaskOutput::NotModified)
            )]
        );
    }

    assert_eq!(
        std::fs::metadata(&series_file).unwrap().modified().unwrap(),
        written
    );
    assert_eq!(
        app.store
            .query_by_entity(DataSource::Buoys, "46026")
            .unwrap()
            .len(),
        3
    );
    app.shutdown().await.unwrap();
}
