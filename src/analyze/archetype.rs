//! Archetype scorer: fuses oracle keyword sets with full-corpus frequency.

use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analyze::oracle::OracleResult;
use crate::ingest::Comment;

/// Token-mode density multiplier: 6 hits in 100 tokens scores 30.
pub const TOKEN_DENSITY_SCALE: f64 = 500.0;
/// Substring mode reports a plain percentage of comments.
pub const SUBSTRING_DENSITY_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Token,
    Substring,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchetypePolicy {
    pub mode: MatchMode,
    pub joker_threshold: f64,
    pub thanos_threshold: f64,
}

impl Default for ArchetypePolicy {
    fn default() -> Self {
        Self {
            mode: MatchMode::Token,
            joker_threshold: 50.0,
            thanos_threshold: 50.0,
        }
    }
}

impl ArchetypePolicy {
    fn scale(&self) -> f64 {
        match self.mode {
            MatchMode::Token => TOKEN_DENSITY_SCALE,
            MatchMode::Substring => SUBSTRING_DENSITY_SCALE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ArchetypeScores {
    pub joker_score: f64,
    pub thanos_score: f64,
}

impl ArchetypeScores {
    pub fn details(&self) -> String {
        format!(
            "Joker tendency: {:.2}/100, Thanos tendency: {:.2}/100",
            self.joker_score, self.thanos_score
        )
    }
}

pub const JOKER_LABEL: &str = "The Joker Society (Reactive/Nihilistic)";
pub const THANOS_LABEL: &str = "The Thanos Society (Cold/Extreme Logic)";
pub const BALANCED_LABEL: &str = "Balanced/Neutral Society";

/// Joker wins ties against Thanos because it is checked first.
pub fn label_for(scores: &ArchetypeScores, policy: &ArchetypePolicy) -> &'static str {
    if scores.joker_score > policy.joker_threshold {
        JOKER_LABEL
    } else if scores.thanos_score > policy.thanos_threshold {
        THANOS_LABEL
    } else {
        BALANCED_LABEL
    }
}

/// Score both archetypes. Pure: the same inputs always give the same scores.
pub fn score(corpus: &[Comment], oracle: &OracleResult, policy: &ArchetypePolicy) -> ArchetypeScores {
    let density = |keywords: &BTreeSet<String>| match policy.mode {
        MatchMode::Token => token_density(corpus, keywords),
        MatchMode::Substring => substring_density(corpus, keywords),
    };
    ArchetypeScores {
        joker_score: to_score(density(&oracle.joker_keywords), policy.scale()),
        thanos_score: to_score(density(&oracle.thanos_keywords), policy.scale()),
    }
}

fn to_score(density: Option<f64>, scale: f64) -> f64 {
    match density {
        Some(d) if d.is_finite() => round2((d * scale).clamp(0.0, 100.0)),
        _ => 0.0,
    }
}

/// hits / total tokens; `None` for an empty keyword set or no tokens.
fn token_density(corpus: &[Comment], keywords: &BTreeSet<String>) -> Option<f64> {
    if keywords.is_empty() {
        return None;
    }
    let (mut hits, mut total) = (0usize, 0usize);
    for c in corpus {
        for tok in c.text.split_whitespace() {
            total += 1;
            if keywords.contains(&tok.to_lowercase()) {
                hits += 1;
            }
        }
    }
    (total > 0).then(|| hits as f64 / total as f64)
}

/// matching comments / comment count.
fn substring_density(corpus: &[Comment], keywords: &BTreeSet<String>) -> Option<f64> {
    if keywords.is_empty() || corpus.is_empty() {
        return None;
    }
    let re = keyword_regex(keywords)?;
    let matched = corpus
        .iter()
        .filter(|c| re.is_match(&c.text.to_lowercase()))
        .count();
    Some(matched as f64 / corpus.len() as f64)
}

pub(crate) fn keyword_regex<I, S>(keywords: I) -> Option<Regex>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let alternation = keywords
        .into_iter()
        .map(|k| regex::escape(k.as_ref()))
        .collect::<Vec<_>>()
        .join("|");
    if alternation.is_empty() {
        return None;
    }
    Regex::new(&alternation).ok()
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle(joker: &[&str], thanos: &[&str]) -> OracleResult {
        OracleResult {
            joker_keywords: joker.iter().map(|s| s.to_string()).collect(),
            thanos_keywords: thanos.iter().map(|s| s.to_string()).collect(),
            ..OracleResult::default()
        }
    }

    #[test]
    fn substring_mode_counts_comments() {
        let corpus = vec![
            Comment::new("v", "Total CLOWN behaviour"),
            Comment::new("v", "clowns everywhere"),
            Comment::new("v", "nice video"),
            Comment::new("v", "agreed"),
        ];
        let policy = ArchetypePolicy {
            mode: MatchMode::Substring,
            ..ArchetypePolicy::default()
        };
        let s = score(&corpus, &oracle(&["clown"], &[]), &policy);
        assert_eq!(s.joker_score, 50.0);
        assert_eq!(s.thanos_score, 0.0);
    }

    #[test]
    fn substring_keywords_are_escaped() {
        let corpus = vec![Comment::new("v", "a+b"), Comment::new("v", "aab")];
        let policy = ArchetypePolicy {
            mode: MatchMode::Substring,
            ..ArchetypePolicy::default()
        };
        let s = score(&corpus, &oracle(&["a+b"], &[]), &policy);
        assert_eq!(s.joker_score, 50.0);
    }

    #[test]
    fn dense_keywords_are_capped_at_100() {
        let corpus = vec![Comment::new("v", "ratio ratio ratio")];
        let s = score(&corpus, &oracle(&["ratio"], &["ratio"]), &ArchetypePolicy::default());
        assert_eq!(s.joker_score, 100.0);
        assert_eq!(s.thanos_score, 100.0);
    }

    #[test]
    fn empty_inputs_score_zero() {
        let p = ArchetypePolicy::default();
        assert_eq!(score(&[], &oracle(&["x"], &["y"]), &p), ArchetypeScores::default());
        let corpus = vec![Comment::new("v", "x y")];
        assert_eq!(score(&corpus, &OracleResult::default(), &p), ArchetypeScores::default());
    }

    #[test]
    fn label_prefers_joker_then_thanos() {
        let p = ArchetypePolicy::default();
        let both = ArchetypeScores {
            joker_score: 80.0,
            thanos_score: 90.0,
        };
        assert_eq!(label_for(&both, &p), JOKER_LABEL);
        let thanos = ArchetypeScores {
            joker_score: 10.0,
            thanos_score: 50.01,
        };
        assert_eq!(label_for(&thanos, &p), THANOS_LABEL);
        let edge = ArchetypeScores {
            joker_score: 50.0,
            thanos_score: 50.0,
        };
        assert_eq!(label_for(&edge, &p), BALANCED_LABEL);
    }

    #[test]
    fn details_formats_two_decimals() {
        let s = ArchetypeScores {
            joker_score: 30.0,
            thanos_score: 0.0,
        };
        assert_eq!(s.details(), "Joker tendency: 30.00/100, Thanos tendency: 0.00/100");
    }
}
