//! Scoring against reference constraints and reasoning-quality heuristics

pub mod coherence;
pub mod correctness;
pub mod intent;
pub mod reference;

pub use coherence::{
    CoherenceAnalyzer, CoherenceReport, StructuralIssue, StructuralReport, analyze_structure,
};
pub use correctness::{CorrectnessReport, range_score, score_against_reference};
pub use intent::{IntentReport, IntentScorer};
pub use reference::{BranchPattern, CountRange, ReferenceSpec};
