//! Ingestion stage tests against a stubbed provider API.
//!
//! The raw store pool is created lazily and is only touched when an upsert
//! actually happens, so every all-failure path here runs without a database.

use serde_json::json;
use wdp_common::types::{CityTarget, RunContext};
use wdp_pipeline::config::SourceConfig;
use wdp_pipeline::{PipelineError, RawIngestor, RawStore, WeatherClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_config(server: &MockServer) -> SourceConfig {
    SourceConfig {
        base_url: format!("{}/data/2.5/weather", server.uri()),
        api_key: "test-key".to_string(),
        units: "metric".to_string(),
        timeout_secs: 5,
    }
}

fn lazy_store() -> RawStore {
    // Never connected unless a query runs
    RawStore::new(sqlx::PgPool::connect_lazy("postgresql://localhost/wdp_test").unwrap())
}

fn sample_payload(id: i64, dt: i64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "dt": dt,
        "name": name,
        "coord": {"lat": -1.2833, "lon": 36.8167},
        "main": {"temp": 17.6, "feels_like": 17.2, "pressure": 1021, "humidity": 77},
        "weather": [{"main": "Clouds", "description": "scattered clouds"}],
        "sys": {"country": "KE"}
    })
}

#[tokio::test]
async fn fetch_current_returns_provider_payload() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Nairobi,KE"))
        .and(query_param("appid", "test-key"))
        .and(query_param("units", "metric"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(sample_payload(184745, 1754550000, "Nairobi")),
        )
        .mount(&server)
        .await;

    let client = WeatherClient::new(source_config(&server)).unwrap();
    let payload = client
        .fetch_current(&CityTarget::new("Nairobi", "KE"))
        .await
        .unwrap();

    assert_eq!(payload["name"], "Nairobi");
    assert_eq!(payload["id"], 184745);
}

#[tokio::test]
async fn non_2xx_response_is_a_source_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = WeatherClient::new(source_config(&server)).unwrap();
    let result = client.fetch_current(&CityTarget::new("London", "GB")).await;

    assert!(matches!(result, Err(PipelineError::Source(_))));
}

#[tokio::test]
async fn all_sources_down_escalates_fatally() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cities = vec![
        CityTarget::new("Nairobi", "KE"),
        CityTarget::new("London", "GB"),
        CityTarget::new("Singapore", "SG"),
    ];
    let client = WeatherClient::new(source_config(&server)).unwrap();
    let ingestor = RawIngestor::new(client, lazy_store(), cities);

    let ctx = RunContext::new(chrono::Utc::now());
    let result = ingestor.ingest_all(&ctx).await;

    match result {
        Err(PipelineError::AllSourcesUnavailable { attempted }) => assert_eq!(attempted, 3),
        other => panic!("expected AllSourcesUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn payload_without_natural_key_counts_as_failure() {
    let server = MockServer::start().await;

    // Well-formed JSON, but no `dt`, so the observation cannot be
    // deduplicated and is never stored.
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 184745, "name": "Nairobi"})),
        )
        .mount(&server)
        .await;

    let client = WeatherClient::new(source_config(&server)).unwrap();
    let ingestor = RawIngestor::new(
        client,
        lazy_store(),
        vec![CityTarget::new("Nairobi", "KE")],
    );

    let ctx = RunContext::new(chrono::Utc::now());
    let result = ingestor.ingest_all(&ctx).await;

    // The single configured city failed, which is total failure.
    assert!(matches!(
        result,
        Err(PipelineError::AllSourcesUnavailable { attempted: 1 })
    ));
}
