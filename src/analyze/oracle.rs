//! Keyword oracle: provider abstraction + a fail-open query adapter.
//!
//! Providers do the raw remote call and hand back response text. The adapter
//! strips wrapping, validates the JSON against a fixed schema, and turns every
//! failure into a degraded default result. Nothing here returns an error to the
//! pipeline.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::OracleConfig;

// ------------------------------------------------------------
// Errors and outcomes
// ------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle timed out after {0} ms")]
    Timeout(u64),
    #[error("oracle transport error: {0}")]
    Transport(String),
    #[error("oracle returned HTTP {0}")]
    Status(u16),
    #[error("oracle returned an empty response")]
    EmptyResponse,
    #[error("oracle response did not match the expected schema: {0}")]
    Malformed(String),
}

/// Why the adapter fell back to the default result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradeReason {
    EmptySample,
    Unconfigured,
    Failed(OracleError),
}

impl DegradeReason {
    /// Short machine-friendly label for metrics and the response summary block.
    pub fn code(&self) -> &'static str {
        match self {
            DegradeReason::EmptySample => "empty-sample",
            DegradeReason::Unconfigured => "unconfigured",
            DegradeReason::Failed(OracleError::Timeout(_)) => "timeout",
            DegradeReason::Failed(OracleError::Transport(_)) => "transport",
            DegradeReason::Failed(OracleError::Status(_)) => "http-status",
            DegradeReason::Failed(OracleError::EmptyResponse) => "empty-response",
            DegradeReason::Failed(OracleError::Malformed(_)) => "malformed",
        }
    }
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradeReason::EmptySample => write!(f, "no comments available to sample"),
            DegradeReason::Unconfigured => write!(f, "oracle is not configured"),
            DegradeReason::Failed(e) => write!(f, "{e}"),
        }
    }
}

/// Structured keyword/summary data. Always well-formed; defaults are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleResult {
    pub joker_keywords: BTreeSet<String>,
    pub thanos_keywords: BTreeSet<String>,
    pub summary: String,
    pub vibe: String,
    pub themes: Vec<String>,
}

impl OracleResult {
    /// All-defaults result whose summary carries the diagnostic.
    pub fn degraded(reason: &DegradeReason) -> Self {
        Self {
            summary: format!("Oracle analysis unavailable: {reason}"),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleOutcome {
    Answered(OracleResult),
    Degraded {
        result: OracleResult,
        reason: DegradeReason,
    },
}

impl OracleOutcome {
    pub fn degraded(reason: DegradeReason) -> Self {
        OracleOutcome::Degraded {
            result: OracleResult::degraded(&reason),
            reason,
        }
    }

    pub fn result(&self) -> &OracleResult {
        match self {
            OracleOutcome::Answered(r) => r,
            OracleOutcome::Degraded { result, .. } => result,
        }
    }

    pub fn into_result(self) -> OracleResult {
        match self {
            OracleOutcome::Answered(r) => r,
            OracleOutcome::Degraded { result, .. } => result,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, OracleOutcome::Degraded { .. })
    }

    /// "answered" or "degraded:<code>".
    pub fn status(&self) -> String {
        match self {
            OracleOutcome::Answered(_) => "answered".to_string(),
            OracleOutcome::Degraded { reason, .. } => format!("degraded:{}", reason.code()),
        }
    }
}

// ------------------------------------------------------------
// Task descriptions
// ------------------------------------------------------------

/// What the oracle is asked to do with a sample, and the JSON shape it must answer in.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: &'static str,
    pub preamble: String,
    pub instructions: String,
}

impl TaskSpec {
    pub fn archetype_keywords() -> Self {
        Self {
            name: "archetype-keywords",
            preamble: "You are a digital psychologist and forensic linguist studying the dynamics of online communities.\n\
                Context: the 'Joker' archetype stands for nihilism, chaos and the rejection of meaning. \
                The 'Thanos' archetype stands for cold logic, rational extremism and single-minded focus on one goal.\n\
                Below is a sample of the most negative and emotional YouTube comments from one community:"
                .to_string(),
            instructions: "Tasks:\n\
                1. joker_keywords: up to 5 specific words or short phrases (adjectives, nouns, insults) that most strongly push the community toward the Joker archetype (anger, cynicism, despair, aimless mockery).\n\
                2. thanos_keywords: up to 5 specific words or short phrases that most strongly push it toward the Thanos archetype (absolute thinking, extreme solutions, cold objectivity, rejection of emotion). Use an empty array if there are none.\n\
                3. analysis_summary: one sentence on why these words were chosen and what they indicate about the community.\n\
                4. vibe: two to four words describing the overall mood.\n\
                5. themes: up to 5 recurring themes.\n\
                Answer ONLY with valid JSON of exactly this shape:\n\
                {\"joker_keywords\": [\"...\"], \"thanos_keywords\": [\"...\"], \"analysis_summary\": \"...\", \"vibe\": \"...\", \"themes\": [\"...\"]}"
                .to_string(),
        }
    }

    pub fn render(&self, sample: &str) -> String {
        format!(
            "{}\n---\n{}\n---\n{}",
            self.preamble, sample, self.instructions
        )
    }
}

/// Wire schema for the keyword task. Unknown or mistyped fields fail the parse.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeywordWire {
    joker_keywords: Vec<String>,
    thanos_keywords: Vec<String>,
    #[serde(alias = "summary")]
    analysis_summary: String,
    #[serde(default)]
    vibe: String,
    #[serde(default)]
    themes: Vec<String>,
}

impl From<KeywordWire> for OracleResult {
    fn from(w: KeywordWire) -> Self {
        Self {
            joker_keywords: clean_keywords(w.joker_keywords),
            thanos_keywords: clean_keywords(w.thanos_keywords),
            summary: w.analysis_summary.trim().to_string(),
            vibe: w.vibe.trim().to_string(),
            themes: w
                .themes
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

/// Lower-case, trim, and drop blank entries.
pub fn clean_keywords<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Remove markdown fences and any prose around the outermost JSON object.
pub fn strip_wrapping(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        // drop the optional language tag on the fence line
        s = match rest.find('\n') {
            Some(nl) => &rest[nl + 1..],
            None => rest.trim_start_matches("json"),
        };
    }
    s = s.trim();
    if let Some(rest) = s.strip_suffix("```") {
        s = rest.trim();
    }
    match (s.find('{'), s.rfind('}')) {
        (Some(start), Some(end)) if start < end => &s[start..=end],
        _ => s,
    }
}

/// Parse a provider response into `T` after stripping wrapping.
pub fn parse_response<T: DeserializeOwned>(raw: &str) -> Result<T, OracleError> {
    let body = strip_wrapping(raw);
    if body.is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    serde_json::from_str::<T>(body).map_err(|e| OracleError::Malformed(e.to_string()))
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider: does the real remote call and returns the raw answer text.
pub trait OracleProvider: Send + Sync + 'static {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

pub type DynProvider = Arc<dyn OracleProvider>;

fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent("community-archetype-analyzer/0.1")
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()?)
}

fn transport(e: reqwest::Error) -> OracleError {
    if e.is_timeout() {
        OracleError::Transport("request timed out".to_string())
    } else {
        OracleError::Transport(e.to_string())
    }
}

/// Google Gemini (`generateContent`, JSON response mode).
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: Option<&str>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            model: model.unwrap_or("gemini-2.5-flash").to_string(),
        })
    }
}

impl OracleProvider for GeminiProvider {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>> {
        Box::pin(async move {
            #[derive(Deserialize)]
            struct Resp {
                #[serde(default)]
                candidates: Vec<Candidate>,
            }
            #[derive(Deserialize)]
            struct Candidate {
                content: Option<Content>,
            }
            #[derive(Deserialize)]
            struct Content {
                #[serde(default)]
                parts: Vec<Part>,
            }
            #[derive(Deserialize)]
            struct Part {
                #[serde(default)]
                text: String,
            }

            let body = serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
                "generationConfig": { "temperature": 0.2, "responseMimeType": "application/json" }
            });
            let url = format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                self.model
            );
            let resp = self
                .http
                .post(url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(transport)?;
            if !resp.status().is_success() {
                return Err(OracleError::Status(resp.status().as_u16()));
            }
            let parsed: Resp = resp.json().await.map_err(transport)?;
            let text = parsed
                .candidates
                .into_iter()
                .filter_map(|c| c.content)
                .flat_map(|c| c.parts)
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("");
            if text.trim().is_empty() {
                Err(OracleError::EmptyResponse)
            } else {
                Ok(text)
            }
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// OpenAI-compatible Chat Completions provider.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: Option<&str>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            model: model.unwrap_or("gpt-4o-mini").to_string(),
        })
    }
}

impl OracleProvider for OpenAiProvider {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: Option<String>,
            }

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: "You answer with a single valid JSON object and nothing else.",
                    },
                    Msg {
                        role: "user",
                        content: prompt,
                    },
                ],
                temperature: 0.2,
            };

            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .map_err(transport)?;
            if !resp.status().is_success() {
                return Err(OracleError::Status(resp.status().as_u16()));
            }
            let body: Resp = resp.json().await.map_err(transport)?;
            body.choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .filter(|s| !s.trim().is_empty())
                .ok_or(OracleError::EmptyResponse)
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Deterministic provider for tests/local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub reply: Result<String, OracleError>,
}

impl MockProvider {
    pub fn answering(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
        }
    }

    pub fn failing(err: OracleError) -> Self {
        Self { reply: Err(err) }
    }

    /// Canned keyword answer used by `ORACLE_TEST_MODE=mock`.
    pub fn canned() -> Self {
        Self::answering(
            r#"{"joker_keywords":["clown","cringe","ratio"],"thanos_keywords":["inevitable","balance"],"analysis_summary":"Mock analysis (ORACLE_TEST_MODE=mock).","vibe":"mock","themes":["mock"]}"#,
        )
    }
}

impl OracleProvider for MockProvider {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>> {
        let out = self.reply.clone();
        Box::pin(async move { out })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Factory: build a provider according to config and environment variables.
///
/// * `ORACLE_TEST_MODE=mock` returns the canned mock; `=error` a failing mock.
/// * Disabled config or a missing API key returns `None` (unconfigured).
pub fn build_provider_from_config(config: &OracleConfig) -> Option<DynProvider> {
    match std::env::var("ORACLE_TEST_MODE").ok().as_deref() {
        Some("mock") => return Some(Arc::new(MockProvider::canned())),
        Some("error") => {
            return Some(Arc::new(MockProvider::failing(OracleError::Transport(
                "simulated failure (ORACLE_TEST_MODE=error)".to_string(),
            ))))
        }
        _ => {}
    }

    if !config.enabled {
        info!("oracle disabled in config");
        return None;
    }
    if config.api_key.is_empty() {
        warn!(provider = %config.provider, "oracle api key missing; running unconfigured");
        return None;
    }

    let timeout = Duration::from_millis(config.timeout_ms);
    let model = config.model.as_deref();
    let built = match config.provider.as_str() {
        "gemini" => GeminiProvider::new(config.api_key.clone(), model, timeout)
            .map(|p| Arc::new(p) as DynProvider),
        "openai" => OpenAiProvider::new(config.api_key.clone(), model, timeout)
            .map(|p| Arc::new(p) as DynProvider),
        other => {
            warn!(provider = %other, "unsupported oracle provider; running unconfigured");
            return None;
        }
    };
    match built {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(error = %e, "oracle http client could not be built; running unconfigured");
            None
        }
    }
}

// ------------------------------------------------------------
// Fail-open adapter
// ------------------------------------------------------------

/// Wraps an optional provider with a hard timeout and schema validation.
#[derive(Clone)]
pub struct KeywordOracle {
    provider: Option<DynProvider>,
    timeout: Duration,
}

impl KeywordOracle {
    pub fn new(provider: Option<DynProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(1))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.as_ref().map(|p| p.name()).unwrap_or("disabled")
    }

    /// One bounded oracle round-trip, parsed into `T`. Errors come back as a reason,
    /// never as a panic or a propagated failure.
    pub async fn query_as<T: DeserializeOwned>(
        &self,
        sample: &str,
        task: &TaskSpec,
    ) -> Result<T, DegradeReason> {
        if sample.trim().is_empty() {
            return Err(DegradeReason::EmptySample);
        }
        let Some(provider) = self.provider.as_ref() else {
            return Err(DegradeReason::Unconfigured);
        };

        let prompt = task.render(sample);
        debug!(task = task.name, provider = provider.name(), prompt_chars = prompt.len(), "oracle call");
        let raw = match tokio::time::timeout(self.timeout, provider.generate(&prompt)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(DegradeReason::Failed(e)),
            Err(_) => {
                return Err(DegradeReason::Failed(OracleError::Timeout(
                    self.timeout.as_millis() as u64,
                )))
            }
        };
        parse_response::<T>(&raw).map_err(DegradeReason::Failed)
    }

    /// Keyword extraction. Always returns a well-formed result.
    pub async fn query(&self, sample: &str, task: &TaskSpec) -> OracleOutcome {
        let outcome = match self.query_as::<KeywordWire>(sample, task).await {
            Ok(wire) => OracleOutcome::Answered(wire.into()),
            Err(reason) => {
                if matches!(reason, DegradeReason::Failed(_)) {
                    warn!(task = task.name, reason = %reason, "oracle degraded");
                }
                OracleOutcome::degraded(reason)
            }
        };
        record_outcome(task.name, &outcome_code(&outcome));
        outcome
    }
}

fn outcome_code(outcome: &OracleOutcome) -> String {
    match outcome {
        OracleOutcome::Answered(_) => "answered".to_string(),
        OracleOutcome::Degraded { reason, .. } => reason.code().to_string(),
    }
}

pub(crate) fn record_outcome(task: &'static str, code: &str) {
    counter!("oracle_calls_total", "task" => task, "outcome" => code.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_and_prose() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_wrapping(raw), "{\"a\": 1}");
        let raw = "Sure! Here you go: {\"a\": {\"b\": 2}} hope it helps";
        assert_eq!(strip_wrapping(raw), "{\"a\": {\"b\": 2}}");
        assert_eq!(strip_wrapping("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn keywords_are_lowercased_and_blank_entries_dropped() {
        let set = clean_keywords(["  RIZZ ", "", "   ", "Skibidi"]);
        let v: Vec<_> = set.into_iter().collect();
        assert_eq!(v, vec!["rizz".to_string(), "skibidi".to_string()]);
    }

    #[test]
    fn unknown_field_is_malformed() {
        let raw = r#"{"joker_keywords":[],"thanos_keywords":[],"analysis_summary":"x","mood":"?"}"#;
        assert!(matches!(
            parse_response::<KeywordWire>(raw),
            Err(OracleError::Malformed(_))
        ));
    }

    #[test]
    fn mistyped_field_is_malformed() {
        let raw = r#"{"joker_keywords":"rizz","thanos_keywords":[],"analysis_summary":"x"}"#;
        assert!(matches!(
            parse_response::<KeywordWire>(raw),
            Err(OracleError::Malformed(_))
        ));
    }

    #[test]
    fn summary_alias_and_optional_fields() {
        let raw = r#"{"joker_keywords":["A"],"thanos_keywords":[],"summary":"s"}"#;
        let r: OracleResult = parse_response::<KeywordWire>(raw).unwrap().into();
        assert_eq!(r.summary, "s");
        assert!(r.vibe.is_empty());
        assert!(r.joker_keywords.contains("a"));
    }

    #[tokio::test]
    async fn empty_sample_short_circuits_without_calling_provider() {
        let oracle = KeywordOracle::new(
            Some(Arc::new(MockProvider::canned())),
            Duration::from_secs(1),
        );
        let out = oracle.query("  \n ", &TaskSpec::archetype_keywords()).await;
        assert!(out.is_degraded());
        assert_eq!(out.status(), "degraded:empty-sample");
    }

    #[tokio::test]
    async fn unconfigured_oracle_degrades() {
        let out = KeywordOracle::disabled()
            .query("you are all clowns", &TaskSpec::archetype_keywords())
            .await;
        assert_eq!(out.status(), "degraded:unconfigured");
        assert!(out.result().joker_keywords.is_empty());
        assert!(out.result().summary.contains("not configured"));
    }
}
