//! Instant-gratification risk from a browsing history.
//!
//! Same fail-open shape as keyword extraction: the oracle is asked for a score,
//! and any failure falls back to the short-form ratio heuristic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyze::archetype::round2;
use crate::analyze::oracle::{record_outcome, KeywordOracle, TaskSpec};
use crate::error::{AnalyzeError, Result};

const SHORT_FORM_MARKERS: &[&str] = &[
    "youtube.com/shorts/",
    "tiktok.com",
    "instagram.com/reel",
    "facebook.com/reel",
    "/reels/",
];

/// Most recent events included in the oracle prompt.
const MAX_PROMPT_EVENTS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowsingEvent {
    pub timestamp: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorReport {
    pub instant_gratification_score: f64,
    pub rationale: String,
    pub short_form_ratio: f64,
    pub total_events: usize,
    pub oracle_status: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GratificationWire {
    instant_gratification_score: f64,
    rationale: String,
}

pub fn is_short_form(url: &str) -> bool {
    let u = url.to_lowercase();
    SHORT_FORM_MARKERS.iter().any(|m| u.contains(m))
}

pub fn short_form_ratio(events: &[BrowsingEvent]) -> f64 {
    if events.is_empty() {
        return 0.0;
    }
    let short = events.iter().filter(|e| is_short_form(&e.url)).count();
    short as f64 / events.len() as f64
}

fn task() -> TaskSpec {
    TaskSpec {
        name: "instant-gratification",
        preamble: "You are a behavioral psychologist assessing dopamine-seeking browsing habits.\n\
            Below is a chronological browsing history (timestamp, url), followed by summary statistics:"
            .to_string(),
        instructions: "Rate the user's instant-gratification risk from 0 (deliberate, long-form consumption) \
            to 100 (compulsive short-form scrolling). Consider the short-form ratio and how quickly visits follow each other.\n\
            Answer ONLY with valid JSON of exactly this shape:\n\
            {\"instant_gratification_score\": 0, \"rationale\": \"one or two sentences\"}"
            .to_string(),
    }
}

fn render_history(events: &[BrowsingEvent], ratio: f64) -> String {
    let skip = events.len().saturating_sub(MAX_PROMPT_EVENTS);
    let mut lines: Vec<String> = events
        .iter()
        .skip(skip)
        .map(|e| format!("{} {}", e.timestamp.to_rfc3339(), e.url))
        .collect();
    lines.push(format!(
        "total_events={} short_form_ratio={:.2}",
        events.len(),
        ratio
    ));
    lines.join("\n")
}

/// Score a browsing history. Errors only on empty input.
pub async fn analyze_behavior(events: &[BrowsingEvent], oracle: &KeywordOracle) -> Result<BehaviorReport> {
    if events.is_empty() {
        return Err(AnalyzeError::BadRequest(
            "browsing history must contain at least one event".to_string(),
        ));
    }

    let ratio = short_form_ratio(events);
    let t = task();
    let prompt_body = render_history(events, ratio);

    let report = match oracle.query_as::<GratificationWire>(&prompt_body, &t).await {
        Ok(w) if w.instant_gratification_score.is_finite() => {
            record_outcome(t.name, "answered");
            BehaviorReport {
                instant_gratification_score: round2(w.instant_gratification_score.clamp(0.0, 100.0)),
                rationale: w.rationale.trim().to_string(),
                short_form_ratio: round2(ratio),
                total_events: events.len(),
                oracle_status: "answered".to_string(),
            }
        }
        other => {
            let code = match &other {
                Err(reason) => {
                    warn!(reason = %reason, "behavior oracle degraded; using heuristic");
                    reason.code()
                }
                Ok(_) => "malformed",
            };
            record_outcome(t.name, code);
            BehaviorReport {
                instant_gratification_score: round2((ratio * 100.0).clamp(0.0, 100.0)),
                rationale: format!(
                    "Heuristic estimate from the share of short-form content ({:.0}%); oracle unavailable ({code}).",
                    ratio * 100.0
                ),
                short_form_ratio: round2(ratio),
                total_events: events.len(),
                oracle_status: format!("degraded:{code}"),
            }
        }
    };

    info!(
        events = report.total_events,
        score = report.instant_gratification_score,
        status = %report.oracle_status,
        "behavior analyzed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::oracle::MockProvider;
    use std::sync::Arc;
    use std::time::Duration;

    fn ev(url: &str) -> BrowsingEvent {
        BrowsingEvent {
            timestamp: "2024-05-01T10:00:00Z".parse().unwrap(),
            url: url.to_string(),
        }
    }

    #[test]
    fn short_form_detection() {
        assert!(is_short_form("https://www.YouTube.com/shorts/abc"));
        assert!(is_short_form("https://www.tiktok.com/@x/video/1"));
        assert!(!is_short_form("https://youtube.com/watch?v=dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn empty_history_is_bad_request() {
        let err = analyze_behavior(&[], &KeywordOracle::disabled()).await.unwrap_err();
        assert!(matches!(err, AnalyzeError::BadRequest(_)));
    }

    #[tokio::test]
    async fn unconfigured_oracle_falls_back_to_ratio() {
        let events = vec![
            ev("https://youtube.com/shorts/a"),
            ev("https://youtube.com/watch?v=dQw4w9WgXcQ"),
            ev("https://tiktok.com/t/1"),
            ev("https://example.com/article"),
        ];
        let r = analyze_behavior(&events, &KeywordOracle::disabled()).await.unwrap();
        assert_eq!(r.instant_gratification_score, 50.0);
        assert_eq!(r.short_form_ratio, 0.5);
        assert_eq!(r.oracle_status, "degraded:unconfigured");
    }

    #[tokio::test]
    async fn oracle_score_is_clamped() {
        let oracle = KeywordOracle::new(
            Some(Arc::new(MockProvider::answering(
                r#"{"instant_gratification_score": 140, "rationale": "all shorts"}"#,
            ))),
            Duration::from_secs(1),
        );
        let r = analyze_behavior(&[ev("https://youtube.com/shorts/a")], &oracle)
            .await
            .unwrap();
        assert_eq!(r.instant_gratification_score, 100.0);
        assert_eq!(r.rationale, "all shorts");
        assert_eq!(r.oracle_status, "answered");
    }
}
