use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

// A process can install only one global recorder; app() may be built many times in tests.
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once) and publish the cache TTL gauge.
    pub fn init(ttl_secs: u64) -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| PrometheusBuilder::new().install_recorder())?
            .clone();

        describe_counter!("analysis_cache_hits_total", "Analyses served from the result cache.");
        describe_counter!("analysis_cache_misses_total", "Analyses computed by the pipeline.");
        describe_counter!(
            "analysis_cache_joined_total",
            "Requests that waited on an in-flight analysis of the same target."
        );
        describe_counter!("oracle_calls_total", "Oracle queries by task and outcome.");
        describe_histogram!("analysis_duration_ms", "Pipeline run time in milliseconds.");
        describe_gauge!("analysis_cache_ttl_secs", "Configured result cache TTL.");

        gauge!("analysis_cache_ttl_secs").set(ttl_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
