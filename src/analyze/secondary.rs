//! Secondary metrics. Every function here is pure over the corpus and returns
//! zeros (never panics) on empty input.

use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::analyze::archetype::{keyword_regex, round2};
use crate::ingest::Comment;
use crate::sentiment::AnnotatedComment;

/// Phrases that prompt the audience to engage rather than say anything.
pub const ENGAGEMENT_BAIT: &[&str] = &[
    "like if",
    "subscribe",
    "comment below",
    "what do you think",
    "setuju gak",
    "klik link",
    "cek bio",
];

const REINFORCEMENT_MULTIPLIER: f64 = 2.0;

pub const MEME_SLANG: &[&str] = &[
    "sigma", "rizz", "gyatt", "skibidi", "fanum tax", "cringe", "based", "copium", "pog",
    "let him cook", "no cap", "fr fr",
];

const SIMULATION_SCALE: f64 = 5000.0;

pub const TOPIC_COUNT: usize = 5;
pub const MIN_COMMENTS_FOR_TOPICS: usize = 5;
pub const TOPICS_PLACEHOLDER: &str = "Not enough data for topic modeling";

static BAIT_RE: Lazy<Option<Regex>> = Lazy::new(|| keyword_regex(ENGAGEMENT_BAIT));
static SLANG_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    let alternation = MEME_SLANG
        .iter()
        .map(|s| format!(r"\b{}\b", regex::escape(s)))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&alternation).ok()
});

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // en
        "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "her", "was",
        "one", "our", "out", "his", "has", "had", "how", "its", "who", "did", "get", "him",
        "she", "too", "use", "that", "this", "with", "have", "from", "they", "will", "what",
        "your", "just", "like", "about", "there", "their", "would", "them", "then", "than",
        "been", "were", "when", "more", "some", "into", "only", "also", "very", "even",
        "because", "dont", "it's", "i'm", "don't", "really", "much", "here", "which",
        // id
        "yang", "dan", "ini", "itu", "dari", "untuk", "dengan", "tidak", "ada", "aja", "juga",
        "saya", "kita", "kamu", "mereka", "bisa", "sudah", "akan", "pada", "atau", "karena",
        "tapi", "kalau", "lagi", "udah", "gak", "nya", "banget", "sama", "buat",
    ]
    .into_iter()
    .collect()
});

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(str::to_lowercase)
}

/// |unique lowercase tokens| / |tokens| x 100.
pub fn lexical_diversity(corpus: &[Comment]) -> f64 {
    let mut total = 0usize;
    let mut unique = HashSet::new();
    for c in corpus {
        for t in tokens(&c.text) {
            total += 1;
            unique.insert(t);
        }
    }
    if total == 0 {
        return 0.0;
    }
    round2(unique.len() as f64 / total as f64 * 100.0)
}

/// Share of comments containing engagement bait, doubled and capped at 100.
pub fn reinforcement_score(corpus: &[Comment]) -> f64 {
    let Some(re) = BAIT_RE.as_ref() else {
        return 0.0;
    };
    if corpus.is_empty() {
        return 0.0;
    }
    let baited = corpus
        .iter()
        .filter(|c| re.is_match(&c.text.to_lowercase()))
        .count();
    let pct = baited as f64 / corpus.len() as f64 * 100.0 * REINFORCEMENT_MULTIPLIER;
    round2(pct.clamp(0.0, 100.0))
}

/// Meme-slang occurrences per token, scaled and capped at 100.
pub fn simulation_score(corpus: &[Comment]) -> f64 {
    let Some(re) = SLANG_RE.as_ref() else {
        return 0.0;
    };
    let (mut hits, mut total) = (0usize, 0usize);
    for c in corpus {
        let lower = c.text.to_lowercase();
        total += lower.split_whitespace().count();
        hits += re.find_iter(&lower).count();
    }
    if total == 0 {
        return 0.0;
    }
    round2((hits as f64 / total as f64 * SIMULATION_SCALE).clamp(0.0, 100.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SentimentDistribution {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

pub fn sentiment_distribution(annotated: &[AnnotatedComment<'_>]) -> SentimentDistribution {
    if annotated.is_empty() {
        return SentimentDistribution::default();
    }
    let (mut pos, mut neg, mut neu) = (0usize, 0usize, 0usize);
    for a in annotated {
        match a.compound {
            c if c > 0.05 => pos += 1,
            c if c < -0.05 => neg += 1,
            _ => neu += 1,
        }
    }
    let n = annotated.len() as f64;
    SentimentDistribution {
        positive: round2(pos as f64 / n * 100.0),
        negative: round2(neg as f64 / n * 100.0),
        neutral: round2(neu as f64 / n * 100.0),
    }
}

/// Most frequent content words that recur across at least two comments.
pub fn main_topics(corpus: &[Comment]) -> Vec<String> {
    if corpus.len() < MIN_COMMENTS_FOR_TOPICS {
        return vec![TOPICS_PLACEHOLDER.to_string()];
    }

    let mut freq: HashMap<String, usize> = HashMap::new();
    let mut doc_freq: HashMap<String, usize> = HashMap::new();
    for c in corpus {
        let mut seen = HashSet::new();
        for t in c
            .text
            .split(|ch: char| !(ch.is_alphanumeric() || ch == '\''))
            .map(|t| t.trim_matches('\'').to_lowercase())
            .filter(|t| t.chars().count() >= 3 && !t.chars().all(|ch| ch.is_numeric()))
            .filter(|t| !STOPWORDS.contains(t.as_str()))
        {
            *freq.entry(t.clone()).or_default() += 1;
            if seen.insert(t.clone()) {
                *doc_freq.entry(t).or_default() += 1;
            }
        }
    }

    // BTreeMap for deterministic tie order
    let ranked: BTreeMap<(std::cmp::Reverse<usize>, String), ()> = freq
        .into_iter()
        .filter(|(t, _)| doc_freq.get(t).copied().unwrap_or(0) >= 2)
        .map(|(t, n)| ((std::cmp::Reverse(n), t), ()))
        .collect();

    ranked
        .into_keys()
        .take(TOPIC_COUNT)
        .map(|(_, t)| t)
        .collect()
}
