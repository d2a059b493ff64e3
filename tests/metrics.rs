// tests/metrics.rs
//
// Full app() wiring from an analyzer.toml: fixture corpus, mock oracle, and the
// env-gated /metrics route.

use std::io::Write;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serial_test::serial;
use tempfile::NamedTempFile;
use tower::ServiceExt;

/// Write a fixture + config pair and point ANALYZER_CONFIG_PATH at it.
/// The temp files must outlive app construction, so they are returned.
fn write_config() -> (NamedTempFile, NamedTempFile) {
    let mut fixture = NamedTempFile::new().unwrap();
    write!(
        fixture,
        r#"{{"videos": {{"dQw4w9WgXcQ": ["what a clown show", "subscribe for more", "cringe but based"]}}}}"#
    )
    .unwrap();

    let mut config = NamedTempFile::new().unwrap();
    write!(
        config,
        "[cache]\nttl_secs = 30\n\n[corpus]\nfixture_path = {:?}\n",
        fixture.path().display().to_string()
    )
    .unwrap();

    std::env::set_var("ANALYZER_CONFIG_PATH", config.path());
    std::env::set_var("ORACLE_TEST_MODE", "mock");
    (fixture, config)
}

async fn build_app() -> Router {
    archetype_analyzer::app()
        .await
        .expect("app() should build Router in tests")
}

async fn get_text(app: &Router, uri: &str) -> (StatusCode, String) {
    let resp = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap(); // 1 MiB
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
#[serial]
async fn metrics_endpoint_contains_expected_series() {
    let _files = write_config();
    std::env::set_var("METRICS_ROUTE", "1");
    let app = build_app().await;

    let (s1, _) = get_text(&app, "/analyze?target=dQw4w9WgXcQ").await;
    assert_eq!(s1, StatusCode::OK);
    let (s2, _) = get_text(&app, "/analyze?target=dQw4w9WgXcQ").await;
    assert_eq!(s2, StatusCode::OK);

    let (status, text) = get_text(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    for needle in [
        "analysis_cache_hits_total",
        "analysis_cache_misses_total",
        "oracle_calls_total",
        "corpus_comments_loaded_total",
        "analysis_duration_ms",
        "analysis_cache_ttl_secs",
    ] {
        assert!(text.contains(needle), "missing metric `{needle}` in:\n{text}");
    }

    std::env::remove_var("METRICS_ROUTE");
}

#[tokio::test]
#[serial]
async fn metrics_route_is_off_by_default() {
    let _files = write_config();
    std::env::remove_var("METRICS_ROUTE");
    let app = build_app().await;

    let (status, _) = get_text(&app, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn app_serves_fixture_with_mock_oracle() {
    let _files = write_config();
    let app = build_app().await;

    let (status, text) = get_text(&app, "/analyze?target=https://youtu.be/dQw4w9WgXcQ").await;
    assert_eq!(status, StatusCode::OK, "body: {text}");
    let v: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(v["analysis_summary"]["total_comments_analyzed"], 3);
    assert_eq!(v["analysis_summary"]["oracle_status"], "answered");
    assert!(v["quantitative_metrics"]["skinner_reinforcement_score"].as_f64().unwrap() > 0.0);
}
