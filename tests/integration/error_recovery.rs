//! Failed refreshes skip the cooldown write and stay local to their key.

use crate::helpers::{CATALOG_BODY, Outcome, SERIES_BODY, config_for, terminal_outcomes};
use tidesync::marine::MarineStore;
use tidesync::{DataSource, TaskOutput};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn failed_refresh_is_retried_on_next_trigger() {
    let server = MockServer::start().await;
    let temp = tempfile::tempdir().expect("tempdir");

    Mock::given(method("GET"))
        .and(path("/currents/stations.json"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/currents/stations.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CATALOG_BODY))
        .mount(&server)
        .await;

    let app = tidesync::start(&config_for(&server.uri(), temp.path())).unwrap();
    let mut events = app.scheduler.subscribe();

    // Tides and buoys have no mock and fail with 404; currents gets a 503.
    app.orchestrator.refresh_all_catalogs().unwrap();
    app.scheduler.wait_idle().await.unwrap();
    assert_eq!(
        terminal_outcomes(&mut events),
        vec![
            ("buoys_catalog".to_owned(), Outcome::Failed),
            ("currents_catalog".to_owned(), Outcome::Failed),
            ("tides_catalog".to_owned(), Outcome::Failed),
        ]
    );
    assert!(app.cooldowns.entries().unwrap().is_empty());
    assert!(app.store.query_all(DataSource::Currents).unwrap().is_empty());

    // Nothing was throttled, so the next trigger runs immediately.
    app.orchestrator.refresh_all_catalogs().unwrap();
    app.scheduler.wait_idle().await.unwrap();
    let outcomes = terminal_outcomes(&mut events);
    assert!(outcomes.contains(&(
        "currents_catalog".to_owned(),
        Outcome::Completed(TaskOutput::Refreshed { records: 2 })
    )));
    assert_eq!(app.store.query_all(DataSource::Currents).unwrap().len(), 2);

    let keys: Vec<String> = app
        .cooldowns
        .entries()
        .unwrap()
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    assert_eq!(keys, vec!["currents_catalog"]);
    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn one_bad_station_does_not_affect_the_others() {
    let server = MockServer::start().await;
    let temp = tempfile::tempdir().expect("tempdir");

    Mock::given(method("GET"))
        .and(path("/tides/data/1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tides/data/2.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SERIES_BODY))
        .mount(&server)
        .await;

    let app = tidesync::start(&config_for(&server.uri(), temp.path())).unwrap();
    let mut events = app.scheduler.subscribe();
    app.orchestrator
        .refresh_stations(DataSource::Tides, ["1", "2"])
        .unwrap();
    app.scheduler.wait_idle().await.unwrap();

    assert_eq!(
        terminal_outcomes(&mut events),
        vec![
            ("tides_data:1".to_owned(), Outcome::Failed),
            (
                "tides_data:2".to_owned(),
                Outcome::Completed(TaskOutput::Refreshed { records: 3 })
            ),
        ]
    );
    assert!(app.store.query_by_entity(DataSource::Tides, "1").unwrap().is_empty());
    assert_eq!(app.store.query_by_entity(DataSource::Tides, "2").unwrap().len(), 3);
    app.shutdown().await.unwrap();
}
