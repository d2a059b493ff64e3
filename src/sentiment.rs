//! Sentiment prefilter: one compound polarity score in [-1, 1] per comment.
//!
//! The classifier itself is pluggable (`SentimentScorer`). Classifiers report a
//! label plus a confidence; `to_compound` folds that into a signed value so that
//! lower always means "more negative" downstream.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ingest::Comment;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

/// Normalization constant for `raw / sqrt(raw^2 + ALPHA)`.
const ALPHA: f32 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

/// Output contract of a sentiment classifier. `score` is a confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelScore {
    pub label: Polarity,
    pub score: f32,
}

pub trait SentimentScorer: Send + Sync {
    /// `None` means the text could not be scored; callers treat it as 0.0.
    fn classify(&self, text: &str) -> Option<LabelScore>;
    fn name(&self) -> &'static str;
}

/// Negative labels are negated; neutral is 0.0. Always within [-1, 1].
pub fn to_compound(ls: &LabelScore) -> f32 {
    let s = if ls.score.is_finite() {
        ls.score.clamp(0.0, 1.0)
    } else {
        0.0
    };
    match ls.label {
        Polarity::Positive => s,
        Polarity::Negative => -s,
        Polarity::Neutral => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotatedComment<'a> {
    pub comment: &'a Comment,
    pub compound: f32,
}

/// Score every comment exactly once, preserving order.
pub fn annotate<'a>(corpus: &'a [Comment], scorer: &dyn SentimentScorer) -> Vec<AnnotatedComment<'a>> {
    corpus
        .iter()
        .map(|c| {
            let compound = if c.text.trim().is_empty() {
                0.0
            } else {
                scorer.classify(&c.text).map(|ls| to_compound(&ls)).unwrap_or(0.0)
            };
            AnnotatedComment {
                comment: c,
                compound,
            }
        })
        .collect()
}

/// Lexicon scorer with a short negation window.
#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Returns (raw score, token count).
    /// A negator within the previous 1..=3 tokens flips the sign of a word's valence.
    pub fn score_text(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;

        for i in 0..tokens.len() {
            let base = self.word_score(tokens[i].as_str());
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }

        (score, tokens.len())
    }
}

impl SentimentScorer for LexiconScorer {
    fn classify(&self, text: &str) -> Option<LabelScore> {
        let (raw, n) = self.score_text(text);
        if n == 0 {
            return None;
        }
        let raw = raw as f32;
        let magnitude = (raw / (raw * raw + ALPHA).sqrt()).abs();
        let label = match raw {
            r if r > 0.0 => Polarity::Positive,
            r if r < 0.0 => Polarity::Negative,
            _ => Polarity::Neutral,
        };
        Some(LabelScore {
            label,
            score: magnitude,
        })
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// Alphanumeric tokens (apostrophes kept so "isn't" survives), lower-case.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "doesn't"
            | "didn't"
            | "without"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_sign_follows_label() {
        let neg = LabelScore {
            label: Polarity::Negative,
            score: 0.8,
        };
        let pos = LabelScore {
            label: Polarity::Positive,
            score: 1.7,
        };
        assert!((to_compound(&neg) + 0.8).abs() < 1e-6);
        assert_eq!(to_compound(&pos), 1.0);
        assert_eq!(
            to_compound(&LabelScore {
                label: Polarity::Neutral,
                score: 0.9
            }),
            0.0
        );
    }

    #[test]
    fn negation_flips_valence() {
        let s = LexiconScorer::new();
        let (plain, _) = s.score_text("this is good");
        let (negated, _) = s.score_text("this is not good");
        assert!(plain > 0);
        assert!(negated < 0);
    }

    #[test]
    fn annotate_preserves_order_and_defaults_empty_text() {
        let corpus = vec![
            Comment::new("v", "I hate this, worst video ever"),
            Comment::new("v", "   "),
            Comment::new("v", "love it, amazing"),
        ];
        let out = annotate(&corpus, &LexiconScorer::new());
        assert_eq!(out.len(), 3);
        assert!(out[0].compound < -0.05);
        assert_eq!(out[1].compound, 0.0);
        assert!(out[2].compound > 0.05);
        assert!(out.iter().all(|a| (-1.0..=1.0).contains(&a.compound)));
    }

    #[test]
    fn annotate_empty_corpus_is_empty() {
        assert!(annotate(&[], &LexiconScorer::new()).is_empty());
    }
}
