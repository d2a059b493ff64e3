//! Analyzer configuration: `config/analyzer.toml` plus env overrides.
//!
//! Every section is optional; a missing file yields defaults.

pub mod oracle;

pub use oracle::OracleConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};
use tracing::{info, warn};

use crate::analyze::archetype::{ArchetypePolicy, MatchMode};
use crate::analyze::sample::{DEFAULT_SAMPLE_MAX_CHARS, DEFAULT_SAMPLE_SIZE};

pub const DEFAULT_ANALYZER_CONFIG_PATH: &str = "config/analyzer.toml";
pub const ENV_ANALYZER_CONFIG_PATH: &str = "ANALYZER_CONFIG_PATH";
pub const ENV_CACHE_TTL_SECS: &str = "ANALYZER_CACHE_TTL_SECS";
pub const ENV_CACHE_CAPACITY: &str = "ANALYZER_CACHE_CAPACITY";
pub const ENV_JOKER_THRESHOLD: &str = "ANALYZER_JOKER_THRESHOLD";
pub const ENV_THANOS_THRESHOLD: &str = "ANALYZER_THANOS_THRESHOLD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchetypeConfig {
    pub mode: MatchMode,
    pub joker_threshold: f64,
    pub thanos_threshold: f64,
}

impl Default for ArchetypeConfig {
    fn default() -> Self {
        let p = ArchetypePolicy::default();
        Self {
            mode: p.mode,
            joker_threshold: p.joker_threshold,
            thanos_threshold: p.thanos_threshold,
        }
    }
}

impl ArchetypeConfig {
    pub fn policy(&self) -> ArchetypePolicy {
        ArchetypePolicy {
            mode: self.mode,
            joker_threshold: self.joker_threshold,
            thanos_threshold: self.thanos_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    pub size: usize,
    pub max_chars: usize,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_SAMPLE_SIZE,
            max_chars: DEFAULT_SAMPLE_MAX_CHARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub max_videos: usize,
    pub max_comments_per_video: usize,
    pub load_timeout_secs: u64,
    pub entity_timeout_secs: u64,
    /// "ENV" means: read from YOUTUBE_API_KEY
    pub api_key: String,
    /// Serve comments from a local JSON fixture instead of the YouTube API.
    pub fixture_path: Option<PathBuf>,
}

impl CorpusConfig {
    /// Time a full load takes when every entity runs into its own timeout.
    pub fn worst_case_load_secs(&self) -> u64 {
        (self.max_videos as u64).saturating_mul(self.entity_timeout_secs)
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            max_videos: 10,
            max_comments_per_video: 50,
            load_timeout_secs: 60,
            entity_timeout_secs: 6,
            api_key: "ENV".to_string(),
            fixture_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub cache: CacheConfig,
    pub archetype: ArchetypeConfig,
    pub sample: SampleConfig,
    pub corpus: CorpusConfig,
    pub oracle: OracleConfig,
}

impl AnalyzerConfig {
    /// Resolve the path from `ANALYZER_CONFIG_PATH`, read it if present, then apply env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var(ENV_ANALYZER_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ANALYZER_CONFIG_PATH));
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let mut cfg = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                anyhow::anyhow!("Failed to read analyzer config at {}: {}", path.display(), e)
            })?;
            let cfg = Self::from_toml_str(&content)?;
            info!(path = %path.display(), "analyzer config loaded");
            cfg
        } else {
            info!(path = %path.display(), "analyzer config not found; using defaults");
            Self::default()
        };
        cfg.apply_env_overrides();
        cfg.normalize();
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).map_err(|e| anyhow::anyhow!("invalid analyzer config: {e}"))
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = parse_env::<u64>(ENV_CACHE_TTL_SECS) {
            self.cache.ttl_secs = v;
        }
        if let Some(v) = parse_env::<usize>(ENV_CACHE_CAPACITY) {
            self.cache.capacity = v;
        }
        if let Some(v) = parse_env::<f64>(ENV_JOKER_THRESHOLD).filter(|v| v.is_finite()) {
            self.archetype.joker_threshold = v;
        }
        if let Some(v) = parse_env::<f64>(ENV_THANOS_THRESHOLD).filter(|v| v.is_finite()) {
            self.archetype.thanos_threshold = v;
        }
    }

    fn normalize(&mut self) {
        self.oracle.normalize();

        if self.corpus.api_key.trim().eq_ignore_ascii_case("env") {
            self.corpus.api_key = env::var("YOUTUBE_API_KEY").unwrap_or_default();
        }
        // harden against odd TOML values
        self.cache.capacity = self.cache.capacity.max(1);
        self.sample.size = self.sample.size.max(1);
        self.corpus.max_videos = self.corpus.max_videos.max(1);
        self.corpus.max_comments_per_video = self.corpus.max_comments_per_video.max(1);
        self.corpus.load_timeout_secs = self.corpus.load_timeout_secs.max(1);
        if self.corpus.load_timeout_secs < self.corpus.worst_case_load_secs() {
            warn!(
                load_timeout_secs = self.corpus.load_timeout_secs,
                worst_case_secs = self.corpus.worst_case_load_secs(),
                "load timeout is shorter than max_videos x entity_timeout; slow loads will yield partial corpora"
            );
        }
        let defaults = ArchetypeConfig::default();
        if !self.archetype.joker_threshold.is_finite() {
            self.archetype.joker_threshold = defaults.joker_threshold;
        }
        if !self.archetype.thanos_threshold.is_finite() {
            self.archetype.thanos_threshold = defaults.thanos_threshold;
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}
