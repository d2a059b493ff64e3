// src/analyze/mod.rs
//! Analysis stages between the loaded corpus and the assembled result:
//! sample selection, the keyword oracle, archetype scoring, and secondary metrics.

pub mod archetype;
pub mod behavior;
pub mod emotion;
pub mod oracle;
pub mod sample;
pub mod secondary;

// Re-export convenient types.
pub use archetype::{ArchetypePolicy, ArchetypeScores, MatchMode};
pub use emotion::{EmotionClassifier, LexiconEmotionClassifier};
pub use oracle::{
    DegradeReason, KeywordOracle, MockProvider, OracleError, OracleOutcome, OracleProvider,
    OracleResult, TaskSpec,
};
