// src/ingest/mod.rs
pub mod providers;
pub mod types;

pub use providers::{StaticCorpus, YouTubeProvider};
pub use types::{ChannelDirectory, Comment, Corpus, CorpusLoader};

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "corpus_comments_loaded_total",
            "Comments returned by the corpus loader."
        );
        describe_counter!(
            "corpus_entity_errors_total",
            "Entities skipped because their comments could not be loaded."
        );
        describe_histogram!("corpus_load_ms", "Corpus load time in milliseconds.");
    });
}

/// Normalize comment text: decode HTML entities, collapse whitespace, trim, cap length.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("whitespace regex"));
    let mut out = re_ws.replace_all(&decoded, " ").trim().to_string();

    // Length cap: 5000 chars (long rants are kept, pasted essays are cut)
    if out.chars().count() > 5000 {
        out = out.chars().take(5000).collect();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_decodes_entities_and_collapses_whitespace() {
        let s = "  this is   &quot;based&quot;\n\n fr &amp; fr  ";
        assert_eq!(normalize_text(s), "this is \"based\" fr & fr");
    }

    #[test]
    fn normalize_empty_stays_empty() {
        assert_eq!(normalize_text("   \t\n"), "");
    }
}
