//! Emotion distribution over a fixed label set.

use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::analyze::archetype::round2;
use crate::ingest::Comment;

pub const EMOTION_LABELS: [&str; 5] = ["Happy", "Angry", "Surprise", "Sad", "Fear"];
pub const MAX_EMOTION_TEXT_CHARS: usize = 50_000;

pub type EmotionDistribution = BTreeMap<String, f64>;

static EMOTION_WORDS: Lazy<HashMap<String, HashSet<String>>> = Lazy::new(|| {
    let raw = include_str!("../../emotion_lexicon.json");
    serde_json::from_str::<HashMap<String, Vec<String>>>(raw)
        .expect("valid emotion lexicon")
        .into_iter()
        .map(|(label, words)| (label, words.into_iter().collect()))
        .collect()
});

/// Multi-label capability: raw non-negative weight per label. Labels outside
/// `EMOTION_LABELS` are ignored by the caller.
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Vec<(String, f64)>;
    fn name(&self) -> &'static str;
}

/// Counts lexicon words per label.
#[derive(Debug, Clone, Default)]
pub struct LexiconEmotionClassifier;

impl LexiconEmotionClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl EmotionClassifier for LexiconEmotionClassifier {
    fn classify(&self, text: &str) -> Vec<(String, f64)> {
        let mut counts: HashMap<&str, f64> = HashMap::new();
        for tok in text
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
        {
            for (label, words) in EMOTION_WORDS.iter() {
                if words.contains(&tok) {
                    *counts.entry(label.as_str()).or_default() += 1.0;
                }
            }
        }
        counts
            .into_iter()
            .map(|(l, n)| (l.to_string(), n))
            .collect()
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

pub fn zero_distribution() -> EmotionDistribution {
    EMOTION_LABELS.iter().map(|l| (l.to_string(), 0.0)).collect()
}

/// Percentage per fixed label over the (truncated) concatenated corpus.
pub fn emotion_distribution(corpus: &[Comment], classifier: &dyn EmotionClassifier) -> EmotionDistribution {
    let text: String = corpus
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_EMOTION_TEXT_CHARS)
        .collect();

    let mut out = zero_distribution();
    if text.trim().is_empty() {
        return out;
    }

    let weights: Vec<(String, f64)> = classifier
        .classify(&text)
        .into_iter()
        .filter(|(l, w)| EMOTION_LABELS.contains(&l.as_str()) && w.is_finite() && *w > 0.0)
        .collect();
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return out;
    }
    for (label, w) in weights {
        if let Some(slot) = out.get_mut(&label) {
            *slot += w;
        }
    }
    for v in out.values_mut() {
        *v = round2(*v / total * 100.0);
    }
    out
}
