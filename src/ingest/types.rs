// src/ingest/types.rs
use anyhow::Result;

/// One loaded comment. `source_id` is the video it was posted under.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub source_id: String,
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>, // RFC 3339 as delivered by the platform
}

impl Comment {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
            author: None,
            published_at: None,
        }
    }
}

pub type Corpus = Vec<Comment>;

/// Loads comments for a list of entities (videos).
///
/// Implementations skip entities that fail (comments disabled, HTTP errors,
/// timeouts) and keep going. Returning a partial corpus is not an error.
/// The pipeline calls this once per entity so it can stop at its deadline
/// without losing what already arrived.
#[async_trait::async_trait]
pub trait CorpusLoader: Send + Sync {
    async fn load_comments(
        &self,
        ids: &[String],
        max_entities: usize,
        max_per_entity: usize,
    ) -> Result<Corpus>;
    fn name(&self) -> &'static str;
}

/// Channel-level lookups needed by target resolution and video listing.
#[async_trait::async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Resolve a handle (without `@`) to a canonical channel id.
    async fn search_channel(&self, handle: &str) -> Result<Option<String>>;
    /// List upload video ids of a channel, newest first, at most `limit`.
    async fn list_videos(&self, channel_id: &str, limit: usize) -> Result<Vec<String>>;
}
