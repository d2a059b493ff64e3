// tests/target_resolve.rs
//
// Target resolution against a directory collaborator.

use anyhow::Result;
use async_trait::async_trait;

use archetype_analyzer::ingest::{ChannelDirectory, StaticCorpus};
use archetype_analyzer::target::{resolve, ResolvedTarget, TargetKind};

const CHANNEL: &str = "UC_x5XG1OV2P6uZZ5FSM9Ttw";

/// Directory whose every call fails (quota exhausted, network down, ...).
struct BrokenDirectory;

#[async_trait]
impl ChannelDirectory for BrokenDirectory {
    async fn search_channel(&self, _handle: &str) -> Result<Option<String>> {
        anyhow::bail!("quota exceeded")
    }

    async fn list_videos(&self, _channel_id: &str, _limit: usize) -> Result<Vec<String>> {
        anyhow::bail!("quota exceeded")
    }
}

fn directory() -> StaticCorpus {
    StaticCorpus::new().with_handle("GoogleDevelopers", CHANNEL)
}

#[tokio::test]
async fn watch_url_resolves_to_video() {
    let r = resolve("https://youtube.com/watch?v=dQw4w9WgXcQ", &directory()).await;
    assert_eq!(r, ResolvedTarget::video("dQw4w9WgXcQ"));
}

#[tokio::test]
async fn video_wins_over_channel_looking_segments() {
    let r = resolve(
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ&ab_channel=RickAstley",
        &directory(),
    )
    .await;
    assert_eq!(r.kind, TargetKind::Video);
}

#[tokio::test]
async fn handle_resolves_through_directory() {
    let r = resolve("https://www.youtube.com/@googledevelopers", &directory()).await;
    assert_eq!(r, ResolvedTarget::channel(CHANNEL));
    assert_eq!(r.cache_key().as_deref(), Some("channel:UC_x5XG1OV2P6uZZ5FSM9Ttw"));
}

#[tokio::test]
async fn unknown_handle_is_unknown() {
    let r = resolve("@nobody_here", &directory()).await;
    assert_eq!(r, ResolvedTarget::unknown());
}

#[tokio::test]
async fn directory_failure_is_unknown_not_error() {
    let r = resolve("@googledevelopers", &BrokenDirectory).await;
    assert_eq!(r.kind, TargetKind::Unknown);
    assert!(r.id.is_none());
}

#[tokio::test]
async fn channel_id_needs_no_directory_call() {
    let url = format!("https://www.youtube.com/channel/{CHANNEL}");
    let r = resolve(&url, &BrokenDirectory).await;
    assert_eq!(r, ResolvedTarget::channel(CHANNEL));
}

#[tokio::test]
async fn garbage_is_unknown() {
    for s in ["", "   ", "hello", "https://example.com/watch", "UCshort"] {
        assert_eq!(resolve(s, &directory()).await.kind, TargetKind::Unknown, "{s:?}");
    }
}
