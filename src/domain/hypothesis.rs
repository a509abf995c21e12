//! Hypothesis-related domain types.
//!
//! A hypothesis is an atomic, falsifiable requirement a correct answer must
//! satisfy. Hypotheses are generated fresh per entry and never persisted
//! across entries.

use serde::{Deserialize, Serialize};

/// Judgment of one hypothesis against the generated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisEvaluation {
    /// The claim that was judged.
    pub hypothesis: String,
    /// Whether the answer entails the claim.
    pub entailment: bool,
    /// Judge confidence in [0, 1].
    pub confidence: f64,
}

impl HypothesisEvaluation {
    pub fn new(hypothesis: impl Into<String>, entailment: bool, confidence: f64) -> Self {
        Self {
            hypothesis: hypothesis.into(),
            entailment,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Default judgment for malformed or missing judge output.
    pub fn unsupported(hypothesis: impl Into<String>) -> Self {
        Self::new(hypothesis, false, 0.0)
    }
}
