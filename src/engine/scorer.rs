//! Verdict scoring strategies.
//!
//! The source pipeline evolved several scoring formulas without reconciling
//! them; they live here as alternatives behind one trait, selected by
//! configuration.

use crate::config::{ScoringMode, VerificationConfig};
use crate::domain::HypothesisEvaluation;

/// Outcome of reconciling the explanation-path signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub is_correct: bool,
    /// Normalized confidence in [0, 1].
    pub confidence: f64,
}

/// Strategy trait for turning judgments into a score.
pub trait Scorer: Send + Sync {
    fn score(&self, answer: &str, evaluations: &[HypothesisEvaluation]) -> Score;
}

/// Majority vote over entailed hypotheses.
///
/// Correct when at least floor(n/2)+1 hypotheses are entailed; confidence
/// is the mean judge confidence over entailed hypotheses only.
pub struct MajorityScorer;

impl Scorer for MajorityScorer {
    fn score(&self, _answer: &str, evaluations: &[HypothesisEvaluation]) -> Score {
        if evaluations.is_empty() {
            return Score {
                is_correct: false,
                confidence: 0.0,
            };
        }

        let entailed: Vec<&HypothesisEvaluation> =
            evaluations.iter().filter(|e| e.entailment).collect();
        let majority_threshold = evaluations.len() / 2 + 1;
        let is_correct = entailed.len() >= majority_threshold;

        let confidence = if entailed.is_empty() {
            0.0
        } else {
            entailed.iter().map(|e| e.confidence).sum::<f64>() / entailed.len() as f64
        };

        Score {
            is_correct,
            confidence,
        }
    }
}

/// Weighted blend of lexical assertion coverage and entailment coverage.
///
/// The lexical side counts hypotheses appearing verbatim (lowercased) in
/// the answer; the NLI side is the fraction of entailed hypotheses.
pub struct BlendedScorer {
    pub rule_weight: f64,
    pub nli_weight: f64,
    pub pass_threshold: f64,
}

impl BlendedScorer {
    pub fn from_config(config: &VerificationConfig) -> Self {
        Self {
            rule_weight: config.rule_weight,
            nli_weight: config.nli_weight,
            pass_threshold: config.blend_pass_threshold,
        }
    }

    fn lexical_coverage(answer: &str, evaluations: &[HypothesisEvaluation]) -> f64 {
        if evaluations.is_empty() {
            return 0.0;
        }
        let answer_lower = answer.to_lowercase();
        let hits = evaluations
            .iter()
            .filter(|e| !e.hypothesis.is_empty())
            .filter(|e| answer_lower.contains(&e.hypothesis.to_lowercase()))
            .count();
        hits as f64 / evaluations.len() as f64
    }

    fn entailment_coverage(evaluations: &[HypothesisEvaluation]) -> f64 {
        if evaluations.is_empty() {
            return 0.0;
        }
        let entailed = evaluations.iter().filter(|e| e.entailment).count();
        entailed as f64 / evaluations.len() as f64
    }
}

impl Scorer for BlendedScorer {
    fn score(&self, answer: &str, evaluations: &[HypothesisEvaluation]) -> Score {
        let rule = Self::lexical_coverage(answer, evaluations);
        let nli = Self::entailment_coverage(evaluations);
        let blend = self.rule_weight * rule + self.nli_weight * nli;

        Score {
            is_correct: blend >= self.pass_threshold,
            confidence: blend.clamp(0.0, 1.0),
        }
    }
}

/// Build the configured scorer.
pub fn scorer_for(config: &VerificationConfig) -> Box<dyn Scorer> {
    match config.scoring {
        ScoringMode::Majority => Box::new(MajorityScorer),
        ScoringMode::Blended => Box::new(BlendedScorer::from_config(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(entailment: bool, confidence: f64) -> HypothesisEvaluation {
        HypothesisEvaluation::new(format!("The answer should mention c{confidence}"), entailment, confidence)
    }

    #[test]
    fn test_majority_requires_floor_half_plus_one() {
        let scorer = MajorityScorer;

        // 5 hypotheses: 3 entailed passes, 2 fails.
        let evals = vec![
            eval(true, 0.9),
            eval(true, 0.8),
            eval(true, 0.7),
            eval(false, 0.0),
            eval(false, 0.0),
        ];
        assert!(scorer.score("", &evals).is_correct);

        let evals = vec![
            eval(true, 0.9),
            eval(true, 0.8),
            eval(false, 0.0),
            eval(false, 0.0),
            eval(false, 0.0),
        ];
        assert!(!scorer.score("", &evals).is_correct);
    }

    #[test]
    fn test_majority_confidence_averages_entailed_only() {
        let scorer = MajorityScorer;
        let evals = vec![eval(true, 0.8), eval(true, 0.6), eval(false, 0.9)];
        let score = scorer.score("", &evals);
        assert!((score.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_majority_zero_entailed_is_zero_confidence() {
        let scorer = MajorityScorer;
        let evals = vec![eval(false, 0.5), eval(false, 0.5)];
        let score = scorer.score("", &evals);
        assert!(!score.is_correct);
        assert_eq!(score.confidence, 0.0);
    }

    #[test]
    fn test_majority_empty_evaluations() {
        let score = MajorityScorer.score("", &[]);
        assert!(!score.is_correct);
        assert_eq!(score.confidence, 0.0);
    }

    #[test]
    fn test_even_count_majority_threshold() {
        let scorer = MajorityScorer;
        // 4 hypotheses: majority is 3.
        let evals = vec![
            eval(true, 0.9),
            eval(true, 0.9),
            eval(false, 0.0),
            eval(false, 0.0),
        ];
        assert!(!scorer.score("", &evals).is_correct);
    }

    #[test]
    fn test_blended_weights_and_threshold() {
        let scorer = BlendedScorer {
            rule_weight: 0.4,
            nli_weight: 0.6,
            pass_threshold: 0.75,
        };

        // Both hypotheses entailed, one present verbatim in the answer:
        // blend = 0.4 * 0.5 + 0.6 * 1.0 = 0.8.
        let evals = vec![
            HypothesisEvaluation::new("the service targets port 80", true, 0.9),
            HypothesisEvaluation::new("a selector matches the pod labels", true, 0.9),
        ];
        let answer = "Create a Service so the service targets port 80.";
        let score = scorer.score(answer, &evals);
        assert!(score.is_correct);
        assert!((score.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_blended_below_threshold_fails() {
        let scorer = BlendedScorer {
            rule_weight: 0.4,
            nli_weight: 0.6,
            pass_threshold: 0.75,
        };
        // One of two entailed, neither verbatim: blend = 0.3.
        let evals = vec![
            HypothesisEvaluation::new("claim one about probes", true, 0.9),
            HypothesisEvaluation::new("claim two about services", false, 0.0),
        ];
        let score = scorer.score("unrelated text", &evals);
        assert!(!score.is_correct);
        assert!((score.confidence - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_scorer_for_selects_by_mode() {
        let config = VerificationConfig::default();
        let scorer = scorer_for(&config);
        // Default is majority: 1 of 1 entailed passes.
        let evals = vec![eval(true, 1.0)];
        assert!(scorer.score("", &evals).is_correct);
    }
}
