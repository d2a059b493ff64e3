//! Orchestrator: resolve → cache single-flight → load → prefilter → sample →
//! oracle → score → assemble.
//!
//! The cache is injected; the pipeline owns no other mutable state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::analyze::archetype::{self, ArchetypePolicy};
use crate::analyze::emotion::{emotion_distribution, EmotionClassifier, LexiconEmotionClassifier};
use crate::analyze::oracle::{build_provider_from_config, KeywordOracle, TaskSpec};
use crate::analyze::sample::select_sample;
use crate::analyze::secondary;
use crate::cache::{CacheStatus, ResultCache};
use crate::config::AnalyzerConfig;
use crate::error::{AnalyzeError, Result};
use crate::ingest::{ChannelDirectory, Corpus, CorpusLoader, StaticCorpus, YouTubeProvider};
use crate::report::{AnalysisResult, ResultParts};
use crate::sentiment::{annotate, LexiconScorer, SentimentScorer};
use crate::target::{self, ResolvedTarget, TargetKind};

pub type SharedCache = Arc<ResultCache<Arc<AnalysisResult>>>;

/// External capabilities the pipeline consumes.
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn ChannelDirectory>,
    pub loader: Arc<dyn CorpusLoader>,
    pub sentiment: Arc<dyn SentimentScorer>,
    pub emotion: Arc<dyn EmotionClassifier>,
    pub oracle: KeywordOracle,
}

impl Collaborators {
    /// Lexicon scorers plus the given corpus source, oracle disabled.
    pub fn with_source<S>(source: Arc<S>) -> Self
    where
        S: ChannelDirectory + CorpusLoader + 'static,
    {
        Self {
            directory: source.clone(),
            loader: source,
            sentiment: Arc::new(LexiconScorer::new()),
            emotion: Arc::new(LexiconEmotionClassifier::new()),
            oracle: KeywordOracle::disabled(),
        }
    }

    pub fn with_oracle(mut self, oracle: KeywordOracle) -> Self {
        self.oracle = oracle;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub policy: ArchetypePolicy,
    pub sample_size: usize,
    pub sample_max_chars: usize,
    pub max_videos: usize,
    pub max_comments_per_video: usize,
    pub load_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AnalyzerConfig::default())
    }
}

impl PipelineSettings {
    pub fn from_config(cfg: &AnalyzerConfig) -> Self {
        Self {
            policy: cfg.archetype.policy(),
            sample_size: cfg.sample.size,
            sample_max_chars: cfg.sample.max_chars,
            max_videos: cfg.corpus.max_videos,
            max_comments_per_video: cfg.corpus.max_comments_per_video,
            load_timeout: Duration::from_secs(cfg.corpus.load_timeout_secs.max(1)),
        }
    }
}

pub struct AnalysisPipeline {
    collab: Collaborators,
    settings: PipelineSettings,
    cache: SharedCache,
}

impl AnalysisPipeline {
    pub fn new(collab: Collaborators, settings: PipelineSettings, cache: SharedCache) -> Self {
        Self {
            collab,
            settings,
            cache,
        }
    }

    /// Wire the default collaborators described by `cfg`.
    pub fn from_config(cfg: &AnalyzerConfig) -> anyhow::Result<Self> {
        let collab = match &cfg.corpus.fixture_path {
            Some(path) => {
                info!(path = %path.display(), "serving comments from fixture");
                Collaborators::with_source(Arc::new(StaticCorpus::from_path(path)?))
            }
            None => {
                if cfg.corpus.api_key.is_empty() {
                    warn!("YOUTUBE_API_KEY missing; every load will come back empty");
                }
                let yt = YouTubeProvider::new(
                    cfg.corpus.api_key.clone(),
                    Duration::from_secs(cfg.corpus.entity_timeout_secs.max(1)),
                )?;
                Collaborators::with_source(Arc::new(yt))
            }
        };

        let oracle = KeywordOracle::new(
            build_provider_from_config(&cfg.oracle),
            Duration::from_millis(cfg.oracle.timeout_ms),
        );
        info!(
            oracle = oracle.provider_name(),
            loader = collab.loader.name(),
            ttl_secs = cfg.cache.ttl_secs,
            capacity = cfg.cache.capacity,
            "analysis pipeline ready"
        );

        let cache = Arc::new(ResultCache::new(
            Duration::from_secs(cfg.cache.ttl_secs),
            cfg.cache.capacity,
        ));
        Ok(Self::new(
            collab.with_oracle(oracle),
            PipelineSettings::from_config(cfg),
            cache,
        ))
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn oracle(&self) -> &KeywordOracle {
        &self.collab.oracle
    }

    /// Full analysis for a user-supplied target, served from cache when fresh.
    pub async fn analyze(&self, input: &str) -> Result<(Arc<AnalysisResult>, CacheStatus)> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AnalyzeError::BadRequest("target is required".to_string()));
        }

        let resolved = target::resolve(input, self.collab.directory.as_ref()).await;
        let Some(key) = resolved.cache_key() else {
            return Err(AnalyzeError::InvalidTarget(input.to_string()));
        };

        let span = info_span!("analysis", target = %anon_hash(&key), kind = ?resolved.kind);
        let target = &resolved;
        async {
            let (result, status) = self
                .cache
                .get_or_compute(&key, move || async move { self.run(target).await.map(Arc::new) })
                .await?;
            match status {
                CacheStatus::Hit => counter!("analysis_cache_hits_total").increment(1),
                CacheStatus::Miss => counter!("analysis_cache_misses_total").increment(1),
                CacheStatus::Joined => counter!("analysis_cache_joined_total").increment(1),
            }
            info!(cache = status.as_str(), "analysis served");
            Ok::<_, AnalyzeError>((result, status))
        }
        .instrument(span)
        .await
    }

    async fn run(&self, target: &ResolvedTarget) -> Result<AnalysisResult> {
        let t0 = Instant::now();
        let s = &self.settings;

        let video_ids = self.entity_ids(target).await?;
        let corpus = self.load(&video_ids).await;
        if corpus.is_empty() {
            return Err(AnalyzeError::NotFound(
                "no comments could be loaded for this target".to_string(),
            ));
        }
        debug!(videos = video_ids.len(), comments = corpus.len(), "corpus loaded");

        let annotated = annotate(&corpus, self.collab.sentiment.as_ref());
        let sample = select_sample(&annotated, s.sample_size, s.sample_max_chars);
        debug!(sample_chars = sample.chars().count(), "oracle sample selected");

        let oracle = self
            .collab
            .oracle
            .query(&sample, &TaskSpec::archetype_keywords())
            .await;

        let scores = archetype::score(&corpus, oracle.result(), &s.policy);
        let parts = ResultParts {
            target: target.clone(),
            total_videos_scanned: video_ids.len(),
            total_comments_analyzed: corpus.len(),
            scores,
            reinforcement: secondary::reinforcement_score(&corpus),
            lexical_diversity: secondary::lexical_diversity(&corpus),
            simulation: secondary::simulation_score(&corpus),
            emotion_distribution: emotion_distribution(&corpus, self.collab.emotion.as_ref()),
            sentiment_distribution: secondary::sentiment_distribution(&annotated),
            main_topics: secondary::main_topics(&corpus),
            oracle,
        };
        let result = AnalysisResult::assemble(parts, &s.policy);

        let elapsed_ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("analysis_duration_ms").record(elapsed_ms);
        info!(
            comments = result.analysis_summary.total_comments_analyzed,
            joker = result.quantitative_metrics.joker_score,
            thanos = result.quantitative_metrics.thanos_score,
            oracle = %result.analysis_summary.oracle_status,
            elapsed_ms = elapsed_ms as u64,
            "analysis computed"
        );
        Ok(result)
    }

    async fn entity_ids(&self, target: &ResolvedTarget) -> Result<Vec<String>> {
        let id = target.id.clone().unwrap_or_default();
        match target.kind {
            TargetKind::Video => Ok(vec![id]),
            TargetKind::Channel => {
                let videos = match self
                    .collab
                    .directory
                    .list_videos(&id, self.settings.max_videos)
                    .await
                {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = %e, "listing channel videos failed");
                        Vec::new()
                    }
                };
                if videos.is_empty() {
                    return Err(AnalyzeError::NotFound(
                        "no videos found for this channel".to_string(),
                    ));
                }
                Ok(videos)
            }
            TargetKind::Unknown => Err(AnalyzeError::Internal(
                "unresolved target reached the loader".to_string(),
            )),
        }
    }

    /// Entities are loaded one at a time against a shared deadline. Whatever
    /// finished before the deadline is kept; failing entities are skipped.
    async fn load(&self, ids: &[String]) -> Corpus {
        let s = &self.settings;
        let loader = self.collab.loader.as_ref();
        crate::ingest::ensure_metrics_described();

        let deadline = tokio::time::Instant::now() + s.load_timeout;
        let mut corpus = Vec::new();
        for id in ids.iter().take(s.max_videos) {
            let fut = loader.load_comments(std::slice::from_ref(id), 1, s.max_comments_per_video);
            match tokio::time::timeout_at(deadline, fut).await {
                Ok(Ok(mut comments)) => corpus.append(&mut comments),
                Ok(Err(e)) => {
                    warn!(loader = loader.name(), video_id = %id, error = %e, "corpus load failed");
                }
                Err(_) => {
                    warn!(
                        loader = loader.name(),
                        timeout_ms = s.load_timeout.as_millis() as u64,
                        kept = corpus.len(),
                        "corpus load deadline reached, keeping partial corpus"
                    );
                    break;
                }
            }
        }
        counter!("corpus_comments_loaded_total").increment(corpus.len() as u64);
        corpus
    }
}

/// Short SHA-256 prefix so raw targets never reach the logs.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
