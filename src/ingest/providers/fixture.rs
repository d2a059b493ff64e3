//! In-memory collaborator backed by fixed data. Used by tests and offline runs
//! (`[corpus] fixture_path` in analyzer.toml pointing at a JSON file of this shape).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::ingest::types::{ChannelDirectory, Comment, Corpus, CorpusLoader};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticCorpus {
    /// video id -> comment texts
    #[serde(default)]
    pub videos: HashMap<String, Vec<String>>,
    /// channel id -> upload video ids
    #[serde(default)]
    pub channels: HashMap<String, Vec<String>>,
    /// handle (without `@`, lowercase) -> channel id
    #[serde(default)]
    pub handles: HashMap<String, String>,
}

impl StaticCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading corpus fixture from {}", path.display()))?;
        serde_json::from_str(&raw).context("parsing corpus fixture json")
    }

    pub fn with_video<I, S>(mut self, video_id: &str, comments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.videos.insert(
            video_id.to_string(),
            comments.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn with_channel(mut self, channel_id: &str, videos: &[&str]) -> Self {
        self.channels.insert(
            channel_id.to_string(),
            videos.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    pub fn with_handle(mut self, handle: &str, channel_id: &str) -> Self {
        self.handles
            .insert(handle.to_ascii_lowercase(), channel_id.to_string());
        self
    }
}

#[async_trait]
impl CorpusLoader for StaticCorpus {
    async fn load_comments(
        &self,
        ids: &[String],
        max_entities: usize,
        max_per_entity: usize,
    ) -> Result<Corpus> {
        let mut out = Vec::new();
        for id in ids.iter().take(max_entities) {
            // Unknown video behaves like "comments disabled": skipped.
            let Some(texts) = self.videos.get(id) else {
                continue;
            };
            out.extend(
                texts
                    .iter()
                    .take(max_per_entity)
                    .map(|t| Comment::new(id.clone(), crate::ingest::normalize_text(t))),
            );
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

#[async_trait]
impl ChannelDirectory for StaticCorpus {
    async fn search_channel(&self, handle: &str) -> Result<Option<String>> {
        Ok(self
            .handles
            .get(&handle.trim_start_matches('@').to_ascii_lowercase())
            .cloned())
    }

    async fn list_videos(&self, channel_id: &str, limit: usize) -> Result<Vec<String>> {
        Ok(self
            .channels
            .get(channel_id)
            .map(|v| v.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loader_respects_limits_and_skips_unknown_videos() {
        let fx = StaticCorpus::new()
            .with_video("aaaaaaaaaaa", ["one", "two", "three"])
            .with_video("bbbbbbbbbbb", ["four"]);
        let ids = vec![
            "zzzzzzzzzzz".to_string(),
            "aaaaaaaaaaa".to_string(),
            "bbbbbbbbbbb".to_string(),
        ];
        let corpus = fx.load_comments(&ids, 3, 2).await.unwrap();
        let texts: Vec<_> = corpus.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "four"]);
    }

    #[tokio::test]
    async fn handle_lookup_is_case_insensitive() {
        let fx = StaticCorpus::new().with_handle("SomeCreator", "UCabcdefghijklmnopqrstuv");
        let id = fx.search_channel("@somecreator").await.unwrap();
        assert_eq!(id.as_deref(), Some("UCabcdefghijklmnopqrstuv"));
    }
}
