//! YouTube Data API v3 collaborator: uploads listing, handle search, comment threads.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::ingest::types::{ChannelDirectory, Comment, Corpus, CorpusLoader};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const PLAYLIST_PAGE: u32 = 50;
const COMMENT_PAGE: u32 = 100;

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    #[serde(rename = "contentDetails")]
    content_details: ChannelContent,
}
#[derive(Debug, Deserialize)]
struct ChannelContent {
    #[serde(rename = "relatedPlaylists")]
    related_playlists: RelatedPlaylists,
}
#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(rename = "contentDetails")]
    content_details: PlaylistContent,
}
#[derive(Debug, Deserialize)]
struct PlaylistContent {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct ChannelIdItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ThreadItem {
    snippet: ThreadSnippet,
}
#[derive(Debug, Deserialize)]
struct ThreadSnippet {
    #[serde(rename = "topLevelComment")]
    top_level_comment: TopLevel,
}
#[derive(Debug, Deserialize)]
struct TopLevel {
    snippet: CommentSnippet,
}
#[derive(Debug, Deserialize)]
struct CommentSnippet {
    #[serde(rename = "textDisplay", default)]
    text_display: String,
    #[serde(rename = "authorDisplayName")]
    author_display_name: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

pub struct YouTubeProvider {
    client: reqwest::Client,
    api_key: String,
    entity_timeout: Duration,
}

impl YouTubeProvider {
    pub fn new(api_key: impl Into<String>, entity_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("community-archetype-analyzer/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .context("building youtube http client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            entity_timeout,
        })
    }

    async fn get_page<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Page<T>> {
        if self.api_key.is_empty() {
            return Err(anyhow!("YOUTUBE_API_KEY is not configured"));
        }
        let resp = self
            .client
            .get(format!("{API_BASE}/{endpoint}"))
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("youtube {endpoint} request"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("youtube {endpoint} returned HTTP {}", status.as_u16()));
        }
        resp.json::<Page<T>>()
            .await
            .with_context(|| format!("decoding youtube {endpoint} response"))
    }

    async fn video_comments(&self, video_id: &str, max_per_entity: usize) -> Result<Corpus> {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        while out.len() < max_per_entity {
            let mut params = vec![
                ("part", "snippet".to_string()),
                ("videoId", video_id.to_string()),
                ("maxResults", COMMENT_PAGE.to_string()),
                ("textFormat", "plainText".to_string()),
            ];
            if let Some(t) = page_token.take() {
                params.push(("pageToken", t));
            }
            let page: Page<ThreadItem> = self.get_page("commentThreads", &params).await?;
            for item in page.items {
                if out.len() >= max_per_entity {
                    break;
                }
                let s = item.snippet.top_level_comment.snippet;
                out.push(Comment {
                    source_id: video_id.to_string(),
                    text: crate::ingest::normalize_text(&s.text_display),
                    author: s.author_display_name,
                    published_at: s.published_at,
                });
            }
            match page.next_page_token {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl CorpusLoader for YouTubeProvider {
    async fn load_comments(
        &self,
        ids: &[String],
        max_entities: usize,
        max_per_entity: usize,
    ) -> Result<Corpus> {
        crate::ingest::ensure_metrics_described();
        let t0 = std::time::Instant::now();
        let mut corpus = Vec::new();

        for video_id in ids.iter().take(max_entities) {
            match tokio::time::timeout(
                self.entity_timeout,
                self.video_comments(video_id, max_per_entity),
            )
            .await
            {
                Ok(Ok(mut comments)) => {
                    debug!(video_id = %video_id, n = comments.len(), "comments loaded");
                    corpus.append(&mut comments);
                }
                Ok(Err(e)) => {
                    // Typical cause: comments disabled on the video.
                    warn!(video_id = %video_id, error = %e, "skipping video");
                    counter!("corpus_entity_errors_total").increment(1);
                }
                Err(_) => {
                    warn!(video_id = %video_id, timeout_ms = self.entity_timeout.as_millis() as u64, "skipping video (timeout)");
                    counter!("corpus_entity_errors_total").increment(1);
                }
            }
        }

        histogram!("corpus_load_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(corpus)
    }

    fn name(&self) -> &'static str {
        "youtube"
    }
}

#[async_trait]
impl ChannelDirectory for YouTubeProvider {
    /// Exact handle lookup; unknown handles come back with no items.
    async fn search_channel(&self, handle: &str) -> Result<Option<String>> {
        let params = [
            ("part", "id".to_string()),
            ("forHandle", format!("@{}", handle.trim_start_matches('@'))),
        ];
        let page: Page<ChannelIdItem> = self.get_page("channels", &params).await?;
        Ok(page.items.into_iter().next().map(|it| it.id))
    }

    async fn list_videos(&self, channel_id: &str, limit: usize) -> Result<Vec<String>> {
        let params = [
            ("part", "contentDetails".to_string()),
            ("id", channel_id.to_string()),
        ];
        let channels: Page<ChannelItem> = self.get_page("channels", &params).await?;
        let Some(channel) = channels.items.into_iter().next() else {
            return Ok(Vec::new());
        };
        let uploads = channel.content_details.related_playlists.uploads;

        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;
        while videos.len() < limit {
            let mut params = vec![
                ("part", "contentDetails".to_string()),
                ("playlistId", uploads.clone()),
                ("maxResults", PLAYLIST_PAGE.to_string()),
            ];
            if let Some(t) = page_token.take() {
                params.push(("pageToken", t));
            }
            let page: Page<PlaylistItem> = self.get_page("playlistItems", &params).await?;
            videos.extend(page.items.into_iter().map(|it| it.content_details.video_id));
            match page.next_page_token {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }
        videos.truncate(limit);
        Ok(videos)
    }
}
