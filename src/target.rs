//! Target resolution: turn a user-supplied URL / id / handle into a video or channel id.
//!
//! Order matters: video ids are checked first because a watch URL can carry
//! channel-looking segments (`&ab_channel=...`, `/@handle/...`).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::ingest::ChannelDirectory;

static VIDEO_IN_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/shorts/|/embed/|/live/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)")
        .expect("video url regex")
});
static VIDEO_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("bare video regex"));
static HANDLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|youtube\.com/)@([A-Za-z0-9._-]{3,30})(?:[/?#]|$)").expect("handle regex")
});
static CHANNEL_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|/channel/)(UC[A-Za-z0-9_-]{22})(?:[/?#]|$)").expect("channel id regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Video,
    Channel,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub kind: TargetKind,
    pub id: Option<String>,
}

impl ResolvedTarget {
    pub fn video(id: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Video,
            id: Some(id.into()),
        }
    }

    pub fn channel(id: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Channel,
            id: Some(id.into()),
        }
    }

    pub fn unknown() -> Self {
        Self {
            kind: TargetKind::Unknown,
            id: None,
        }
    }

    /// Canonical cache key. Different spellings of the same target share one entry.
    pub fn cache_key(&self) -> Option<String> {
        match (self.kind, self.id.as_deref()) {
            (TargetKind::Video, Some(id)) => Some(format!("video:{id}")),
            (TargetKind::Channel, Some(id)) => Some(format!("channel:{id}")),
            _ => None,
        }
    }
}

pub fn match_video_id(input: &str) -> Option<String> {
    let s = input.trim();
    if let Some(caps) = VIDEO_IN_URL.captures(s) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    VIDEO_BARE.is_match(s).then(|| s.to_string())
}

pub fn match_handle(input: &str) -> Option<String> {
    HANDLE
        .captures(input.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn match_channel_id(input: &str) -> Option<String> {
    CHANNEL_ID
        .captures(input.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Resolve `input`. Never errors: anything that cannot be resolved is `Unknown`.
pub async fn resolve(input: &str, directory: &dyn ChannelDirectory) -> ResolvedTarget {
    if let Some(id) = match_video_id(input) {
        return ResolvedTarget::video(id);
    }

    if let Some(handle) = match_handle(input) {
        return match directory.search_channel(&handle).await {
            Ok(Some(id)) => {
                debug!(%handle, channel_id = %id, "handle resolved");
                ResolvedTarget::channel(id)
            }
            Ok(None) => ResolvedTarget::unknown(),
            Err(e) => {
                warn!(%handle, error = %e, "handle search failed");
                ResolvedTarget::unknown()
            }
        };
    }

    match match_channel_id(input) {
        Some(id) => ResolvedTarget::channel(id),
        None => ResolvedTarget::unknown(),
    }
}
