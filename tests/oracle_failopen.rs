// tests/oracle_failopen.rs
//
// Oracle failures never fail a request: every failure mode yields a complete
// AnalysisResult with empty keyword sets and a diagnostic summary.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use archetype_analyzer::analyze::{
    DegradeReason, KeywordOracle, MockProvider, OracleError, OracleProvider, TaskSpec,
};
use archetype_analyzer::cache::ResultCache;
use archetype_analyzer::ingest::StaticCorpus;
use archetype_analyzer::{AnalysisPipeline, AnalysisResult, Collaborators, PipelineSettings};

/// Never answers within any sane timeout.
struct HangingOracle;

impl OracleProvider for HangingOracle {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("{}".to_string())
        })
    }

    fn name(&self) -> &'static str {
        "hanging"
    }
}

fn oracle(provider: impl OracleProvider, timeout: Duration) -> KeywordOracle {
    KeywordOracle::new(Some(Arc::new(provider)), timeout)
}

async fn run_with(oracle: KeywordOracle) -> Arc<AnalysisResult> {
    let source = StaticCorpus::new().with_video(
        "dQw4w9WgXcQ",
        ["you people are clowns", "awful, just awful", "meh"],
    );
    let pipeline = AnalysisPipeline::new(
        Collaborators::with_source(Arc::new(source)).with_oracle(oracle),
        PipelineSettings::default(),
        Arc::new(ResultCache::new(Duration::from_secs(60), 4)),
    );
    let (r, _) = pipeline
        .analyze("dQw4w9WgXcQ")
        .await
        .expect("oracle failures must not fail the analysis");
    r
}

fn assert_degraded(r: &AnalysisResult, status: &str) {
    assert_eq!(r.analysis_summary.oracle_status, status);
    assert_eq!(r.analysis_summary.total_comments_analyzed, 3);
    assert!(r.gemini_context_analysis.joker_keywords.is_empty());
    assert!(r.gemini_context_analysis.thanos_keywords.is_empty());
    assert!(r
        .gemini_context_analysis
        .summary
        .starts_with("Oracle analysis unavailable"));
    assert_eq!(r.quantitative_metrics.joker_score, 0.0);
    assert_eq!(r.quantitative_metrics.thanos_score, 0.0);
    assert_eq!(r.emotion_distribution.len(), 5);
}

#[tokio::test]
async fn transport_failure_degrades() {
    let r = run_with(oracle(
        MockProvider::failing(OracleError::Transport("connection refused".into())),
        Duration::from_secs(2),
    ))
    .await;
    assert_degraded(&r, "degraded:transport");
    assert!(r.gemini_context_analysis.summary.contains("connection refused"));
}

#[tokio::test]
async fn http_status_failure_degrades() {
    let r = run_with(oracle(
        MockProvider::failing(OracleError::Status(429)),
        Duration::from_secs(2),
    ))
    .await;
    assert_degraded(&r, "degraded:http-status");
}

#[tokio::test]
async fn timeout_degrades() {
    let r = run_with(oracle(HangingOracle, Duration::from_millis(50))).await;
    assert_degraded(&r, "degraded:timeout");
}

#[tokio::test]
async fn non_json_answer_degrades() {
    let r = run_with(oracle(
        MockProvider::answering("I'm sorry, I can't help with that."),
        Duration::from_secs(2),
    ))
    .await;
    assert_degraded(&r, "degraded:malformed");
}

#[tokio::test]
async fn missing_required_field_degrades() {
    let r = run_with(oracle(
        MockProvider::answering(r#"{"joker_keywords": ["clowns"], "analysis_summary": "x"}"#),
        Duration::from_secs(2),
    ))
    .await;
    assert_degraded(&r, "degraded:malformed");
}

#[tokio::test]
async fn unconfigured_oracle_degrades() {
    let r = run_with(KeywordOracle::disabled()).await;
    assert_degraded(&r, "degraded:unconfigured");
}

#[tokio::test]
async fn wrapped_answer_is_accepted() {
    let r = run_with(oracle(
        MockProvider::answering(
            "Here is the JSON you asked for:\n{\"joker_keywords\": [\" Clowns \", \"\"], \"thanos_keywords\": [], \"analysis_summary\": \"angry crowd\", \"vibe\": \"hostile\"}\nThanks!",
        ),
        Duration::from_secs(2),
    ))
    .await;
    assert_eq!(r.analysis_summary.oracle_status, "answered");
    assert_eq!(r.gemini_context_analysis.joker_keywords, vec!["clowns".to_string()]);
    assert_eq!(r.gemini_context_analysis.vibe, "hostile");
    assert!(r.quantitative_metrics.joker_score > 0.0);
}

#[tokio::test]
async fn query_reports_typed_reason() {
    let o = oracle(
        MockProvider::failing(OracleError::EmptyResponse),
        Duration::from_secs(1),
    );
    let out = o.query("some sample", &TaskSpec::archetype_keywords()).await;
    match out {
        archetype_analyzer::analyze::OracleOutcome::Degraded { reason, result } => {
            assert_eq!(reason, DegradeReason::Failed(OracleError::EmptyResponse));
            assert!(result.joker_keywords.is_empty());
        }
        other => panic!("expected degraded outcome, got {other:?}"),
    }
}
