//! Greedy step alignment between two workflows
//!
//! Establishes a best-effort correspondence between two step lists so that
//! renumbered or regenerated workflows remain comparable. Matching is greedy
//! in the first list's order rather than globally optimal; for the small
//! step counts workflows carry this is a deliberate speed/simplicity
//! tradeoff, and ties resolve to the lowest candidate index so results are
//! reproducible.

use crate::embedding::SimilarityCache;
use crate::error::Result;
use crate::workflow::{Step, StepId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

/// One accepted correspondence between a step of A and a step of B.
#[derive(Debug, Clone)]
pub struct StepMatch {
    pub a: StepId,
    pub b: StepId,
    pub score: f64,
}

/// Result of aligning two workflows' step lists.
#[derive(Debug, Clone, Default)]
pub struct StepAlignment {
    /// Accepted matches, in A's step order
    pub matches: Vec<StepMatch>,
    /// Ids of A steps with no positive-scoring counterpart
    pub unmatched_a: Vec<StepId>,
    /// Ids of B steps left unconsumed
    pub unmatched_b: Vec<StepId>,
    /// Sum of match scores over `max(|A|, |B|)`; length mismatches are
    /// penalized by the denominator even when every shorter-side step
    /// matches perfectly
    pub average_score: f64,
}

impl StepAlignment {
    /// The A-id to B-id correspondence established by the matches.
    pub fn id_map(&self) -> HashMap<StepId, StepId> {
        self.matches
            .iter()
            .map(|m| (m.a.clone(), m.b.clone()))
            .collect()
    }
}

/// Aligns steps of two workflows by pairwise step similarity.
pub struct StepAligner {
    cache: Arc<SimilarityCache>,
}

impl StepAligner {
    /// Create an aligner scoring semantic terms through the given cache.
    pub fn new(cache: Arc<SimilarityCache>) -> Self {
        Self { cache }
    }

    /// Similarity of two steps in `[0, 1]`.
    ///
    /// Terminal markers only ever match each other. Steps of different
    /// action kinds never match. Tool calls average an exact tool-name term
    /// with a parameter-key-set Jaccard term; the Jaccard term is omitted
    /// from the average (not zero-filled) when neither side declares
    /// parameters. LLM calls compare prompts semantically.
    pub async fn step_similarity(&self, a: &Step, b: &Step) -> Result<f64> {
        match (a, b) {
            (Step::Final(_), Step::Final(_)) => Ok(1.0),
            (Step::Final(_), _) | (_, Step::Final(_)) => Ok(0.0),
            (Step::Tool(a), Step::Tool(b)) => {
                let name_term = if a.tool_name == b.tool_name { 1.0 } else { 0.0 };

                let keys_a: HashSet<&str> =
                    a.parameters.iter().map(|p| p.key.as_str()).collect();
                let keys_b: HashSet<&str> =
                    b.parameters.iter().map(|p| p.key.as_str()).collect();
                let union = keys_a.union(&keys_b).count();
                if union == 0 {
                    return Ok(name_term);
                }

                let intersection = keys_a.intersection(&keys_b).count();
                let key_term = intersection as f64 / union as f64;
                Ok((name_term + key_term) / 2.0)
            }
            (Step::Llm(a), Step::Llm(b)) => self.cache.score(&a.prompt, &b.prompt).await,
            _ => Ok(0.0),
        }
    }

    /// Greedy maximum-score bipartite matching between two step lists.
    ///
    /// For each A step in original order, the highest-scoring still-unused B
    /// step is consumed; A steps with no candidate scoring above zero stay
    /// unmatched.
    pub async fn align(&self, steps_a: &[Step], steps_b: &[Step]) -> Result<StepAlignment> {
        let mut used_b = vec![false; steps_b.len()];
        let mut matches = Vec::new();
        let mut unmatched_a = Vec::new();

        for step_a in steps_a {
            let mut best: Option<(usize, f64)> = None;
            for (j, step_b) in steps_b.iter().enumerate() {
                if used_b[j] {
                    continue;
                }
                let score = self.step_similarity(step_a, step_b).await?;
                if score > best.map_or(0.0, |(_, s)| s) {
                    best = Some((j, score));
                }
            }

            match best {
                Some((j, score)) => {
                    used_b[j] = true;
                    trace!(a = %step_a.id(), b = %steps_b[j].id(), score, "step matched");
                    matches.push(StepMatch {
                        a: step_a.id().clone(),
                        b: steps_b[j].id().clone(),
                        score,
                    });
                }
                None => unmatched_a.push(step_a.id().clone()),
            }
        }

        let unmatched_b = steps_b
            .iter()
            .enumerate()
            .filter(|(j, _)| !used_b[*j])
            .map(|(_, s)| s.id().clone())
            .collect();

        let denominator = steps_a.len().max(steps_b.len());
        let average_score = if denominator == 0 {
            0.0
        } else {
            matches.iter().map(|m| m.score).sum::<f64>() / denominator as f64
        };

        Ok(StepAlignment {
            matches,
            unmatched_a,
            unmatched_b,
            average_score,
        })
    }
}
