// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod sentiment;
pub mod target;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::error::{AnalyzeError, Result};
pub use crate::pipeline::{AnalysisPipeline, Collaborators, PipelineSettings};
pub use crate::report::AnalysisResult;

use axum::Router;
use tracing::info;

use crate::config::AnalyzerConfig;

/// Build the full application router from `config/analyzer.toml` + env.
///
/// `/metrics` is mounted only when `METRICS_ROUTE=1`.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = AnalyzerConfig::load()?;
    let pipeline = AnalysisPipeline::from_config(&cfg)?;
    let mut router = create_router(AppState::new(pipeline));

    if std::env::var("METRICS_ROUTE").ok().as_deref() == Some("1") {
        let m = crate::metrics::Metrics::init(cfg.cache.ttl_secs)?;
        router = router.merge(m.router());
        info!("metrics route enabled");
    }

    Ok(router)
}
