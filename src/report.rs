//! report.rs — Struktury výsledku analýzy komunity (to, co vrací `/analyze` a co se cachuje).
//!
//! Pozn.: tvar JSONu je veřejné API; názvy polí se nemění bez důvodu.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::analyze::archetype::{label_for, ArchetypePolicy, ArchetypeScores};
use crate::analyze::oracle::{OracleOutcome, OracleResult};
use crate::analyze::secondary::SentimentDistribution;
use crate::target::{ResolvedTarget, TargetKind};

/// Souhrn vstupu: co se analyzovalo a kolik dat bylo k dispozici.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    /// Kanonický klíč cíle (`video:<id>` / `channel:<id>`).
    pub target: String,
    pub target_kind: TargetKind,
    pub entity_id: String,
    pub total_videos_scanned: usize,
    pub total_comments_analyzed: usize,
    /// "answered" nebo "degraded:<důvod>".
    pub oracle_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchetypeDiagnosis {
    pub predicted_archetype: String,
    pub details: String,
}

/// Projekce výstupu orákula do odpovědi.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleContext {
    pub joker_keywords: Vec<String>,
    pub thanos_keywords: Vec<String>,
    pub summary: String,
    pub vibe: String,
    pub themes: Vec<String>,
}

impl From<&OracleResult> for OracleContext {
    fn from(r: &OracleResult) -> Self {
        Self {
            joker_keywords: r.joker_keywords.iter().cloned().collect(),
            thanos_keywords: r.thanos_keywords.iter().cloned().collect(),
            summary: r.summary.clone(),
            vibe: r.vibe.clone(),
            themes: r.themes.clone(),
        }
    }
}

/// Všechna čísla jsou v intervalu <0, 100>, zaokrouhlená na 2 desetinná místa.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantitativeMetrics {
    pub joker_score: f64,
    pub thanos_score: f64,
    pub skinner_reinforcement_score: f64,
    pub lexical_diversity_percent: f64,
    pub baudrillard_simulation_score: f64,
}

/// Kompletní výsledek jedné analýzy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub analysis_summary: AnalysisSummary,
    pub archetype_diagnosis: ArchetypeDiagnosis,
    pub gemini_context_analysis: OracleContext,
    pub quantitative_metrics: QuantitativeMetrics,
    pub emotion_distribution: BTreeMap<String, f64>,
    pub sentiment_distribution: SentimentDistribution,
    pub main_topics: Vec<String>,
}

/// Vstupy pro sestavení výsledku; počítá je orchestrátor.
pub struct ResultParts {
    pub target: ResolvedTarget,
    pub total_videos_scanned: usize,
    pub total_comments_analyzed: usize,
    pub oracle: OracleOutcome,
    pub scores: ArchetypeScores,
    pub reinforcement: f64,
    pub lexical_diversity: f64,
    pub simulation: f64,
    pub emotion_distribution: BTreeMap<String, f64>,
    pub sentiment_distribution: SentimentDistribution,
    pub main_topics: Vec<String>,
}

impl AnalysisResult {
    /// Sestaví výsledek; label se určuje podle prahů z `policy`.
    pub fn assemble(parts: ResultParts, policy: &ArchetypePolicy) -> Self {
        let ResultParts {
            target,
            total_videos_scanned,
            total_comments_analyzed,
            oracle,
            scores,
            reinforcement,
            lexical_diversity,
            simulation,
            emotion_distribution,
            sentiment_distribution,
            main_topics,
        } = parts;

        Self {
            analysis_summary: AnalysisSummary {
                target: target.cache_key().unwrap_or_default(),
                target_kind: target.kind,
                entity_id: target.id.clone().unwrap_or_default(),
                total_videos_scanned,
                total_comments_analyzed,
                oracle_status: oracle.status(),
            },
            archetype_diagnosis: ArchetypeDiagnosis {
                predicted_archetype: label_for(&scores, policy).to_string(),
                details: scores.details(),
            },
            gemini_context_analysis: OracleContext::from(oracle.result()),
            quantitative_metrics: QuantitativeMetrics {
                joker_score: scores.joker_score,
                thanos_score: scores.thanos_score,
                skinner_reinforcement_score: reinforcement,
                lexical_diversity_percent: lexical_diversity,
                baudrillard_simulation_score: simulation,
            },
            emotion_distribution,
            sentiment_distribution,
            main_topics,
        }
    }
}
