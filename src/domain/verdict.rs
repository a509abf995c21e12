//! Verdict and verification-report domain types.
//!
//! A report carries the modality-specific check results; the verdict is the
//! final normalized decision for an entry. Both are created during one
//! entry's processing and are terminal once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::HypothesisEvaluation;

/// Exit-status-plus-output capture of one external check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub pass: bool,
    /// Combined stdout/stderr, or the invocation error.
    pub output: String,
}

impl CheckOutcome {
    pub fn passed(output: impl Into<String>) -> Self {
        Self {
            pass: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            pass: false,
            output: output.into(),
        }
    }
}

/// A field whose value differs between reference and generated documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueError {
    pub key: String,
    pub expected: String,
    pub got: String,
}

/// Modality-specific detail of a verification report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportDetail {
    Manifest {
        schema: CheckOutcome,
        /// kube-score lint result; absent when linting is disabled.
        #[serde(skip_serializing_if = "Option::is_none")]
        lint: Option<CheckOutcome>,
        dry_run: CheckOutcome,
    },
    Command {
        syntax_pass: bool,
        /// Absent for commands that do not mutate the cluster.
        #[serde(skip_serializing_if = "Option::is_none")]
        dry_run: Option<CheckOutcome>,
        /// The verifier handed the entry to the explanation path because
        /// the reference carried no comparable flags.
        deferred: bool,
    },
    Explanation,
}

/// Result of the modality-specific verifier for one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub pass: bool,

    /// Fraction of reference fields/flags present, in [0, 100].
    /// Absent when nothing comparable was scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_percent: Option<f64>,

    /// Reference fields/flags missing from the generated answer.
    pub missing: Vec<String>,

    /// Matched fields whose values disagree.
    pub value_errors: Vec<ValueError>,

    /// Free-form diagnostic trail.
    pub diagnostics: String,

    pub detail: ReportDetail,
}

impl VerificationReport {
    /// Report for the explanation modality, which has no structural checks.
    pub fn explanation() -> Self {
        Self {
            pass: true,
            coverage_percent: None,
            missing: Vec::new(),
            value_errors: Vec::new(),
            diagnostics: String::new(),
            detail: ReportDetail::Explanation,
        }
    }

    /// True when the modality verifier hit a hard failure that gates the
    /// rest of the pipeline (dry-run or syntax failure).
    pub fn is_hard_failure(&self) -> bool {
        match &self.detail {
            ReportDetail::Manifest { dry_run, .. } => !dry_run.pass,
            ReportDetail::Command {
                syntax_pass,
                dry_run,
                ..
            } => !syntax_pass || dry_run.as_ref().is_some_and(|d| !d.pass),
            ReportDetail::Explanation => false,
        }
    }
}

/// Diagnostic trail attached to a verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerdictTrail {
    pub hypotheses: Vec<String>,
    pub evaluations: Vec<HypothesisEvaluation>,
    pub missing: Vec<String>,
    pub value_errors: Vec<ValueError>,
}

/// Final decision for one entry. Created once, terminal thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Unique identifier for this verdict.
    pub id: Uuid,

    pub is_correct: bool,

    /// Normalized confidence in [0, 1].
    pub confidence_score: f64,

    /// True when a degraded path produced this verdict (off-topic
    /// hypotheses discarded, generation failed, retries exhausted).
    pub fallback_used: bool,

    pub trail: VerdictTrail,

    /// When this verdict was created.
    pub created_at: DateTime<Utc>,
}

impl Verdict {
    pub fn new(is_correct: bool, confidence_score: f64, trail: VerdictTrail) -> Self {
        Self {
            id: Uuid::new_v4(),
            is_correct,
            confidence_score: confidence_score.clamp(0.0, 1.0),
            fallback_used: false,
            trail,
            created_at: Utc::now(),
        }
    }

    /// Failing verdict produced by a hard verifier gate; carries the
    /// report's missing/value-error trail, no hypotheses.
    pub fn gated_fail(trail: VerdictTrail) -> Self {
        Self::new(false, 0.0, trail)
    }

    /// Failing verdict produced by a degraded path.
    pub fn fallback(trail: VerdictTrail) -> Self {
        let mut verdict = Self::new(false, 0.0, trail);
        verdict.fallback_used = true;
        verdict
    }
}
