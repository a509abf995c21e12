//! Verification Coordinator - orchestrates the verification pipeline.
//!
//! This is the central component that routes an entry through
//! classification, the modality verifier, and the fact-checking stages,
//! and produces the final verdict.
//!
//! Pipeline states: Unclassified -> Classified -> {GatedFail |
//! ExplanationPending} -> Scored. A hard verifier failure (dry-run or
//! syntax) short-circuits before any completion call is spent; the
//! explanation path runs the hypothesis checklist through the entailment
//! judge and the configured scorer. Every path ends in a verdict.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future;

use crate::config::{ToolsConfig, VerificationConfig};
use crate::domain::{
    Entry, HypothesisEvaluation, OutputCategory, ReportDetail, VerificationReport, Verdict,
    VerdictTrail,
};
use crate::engine::{
    classify, CommandVerifier, EntailmentJudge, HypothesisGenerator, ManifestVerifier, Scorer,
    scorer_for,
};
use crate::llm::ChatClient;
use crate::tools::ClusterTools;

/// Words carrying no topical signal, including the claim-prefix boilerplate.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "answer", "are", "be", "can", "do", "does", "ensure", "for", "how", "i",
    "in", "is", "it", "mention", "my", "of", "on", "or", "should", "that", "the", "to", "what",
    "when", "with", "you",
];

/// Result of the full verification pipeline for one entry.
#[derive(Debug)]
pub struct CoordinatorResult {
    /// The modality assigned to the entry.
    pub category: OutputCategory,
    /// The modality verifier's report.
    pub report: VerificationReport,
    /// The final verdict.
    pub verdict: Verdict,
}

/// Orchestrates the verification pipeline.
pub struct VerificationCoordinator {
    manifest_verifier: ManifestVerifier,
    command_verifier: CommandVerifier,
    generator: HypothesisGenerator,
    judge: Arc<dyn EntailmentJudge>,
    scorer: Box<dyn Scorer>,
    verification: VerificationConfig,
}

impl VerificationCoordinator {
    /// Create a new coordinator with the given collaborators.
    pub fn new(
        tools: Arc<dyn ClusterTools>,
        client: Arc<dyn ChatClient>,
        judge: Arc<dyn EntailmentJudge>,
        tools_config: ToolsConfig,
        verification: VerificationConfig,
    ) -> Self {
        Self {
            manifest_verifier: ManifestVerifier::new(
                tools.clone(),
                tools_config,
                verification.clone(),
            ),
            command_verifier: CommandVerifier::new(tools, verification.clone()),
            generator: HypothesisGenerator::new(client),
            judge,
            scorer: scorer_for(&verification),
            verification,
        }
    }

    /// Run the full pipeline for one entry.
    ///
    /// Never fails: degraded stages produce a fallback verdict with the
    /// cause in the trail, so every entry receives a verdict.
    pub async fn verify(&self, entry: &Entry) -> CoordinatorResult {
        // Classification happens exactly once; pre-classified entries keep
        // their category.
        let category = match entry.output_category {
            OutputCategory::Unknown => classify(&entry.generated_response),
            assigned => assigned,
        };
        tracing::debug!(category = %category, "Entry classified");

        let reference = entry.reference_answer.as_deref();
        let report = match category {
            OutputCategory::Yaml => {
                self.manifest_verifier
                    .verify(&entry.generated_response, reference)
                    .await
            }
            OutputCategory::Cli => {
                self.command_verifier
                    .verify(&entry.generated_response, reference)
                    .await
            }
            OutputCategory::Explanation | OutputCategory::Unknown => {
                VerificationReport::explanation()
            }
        };

        // Hard failures gate the rest of the pipeline; no completion call
        // is spent on an answer the cluster already rejected.
        if report.is_hard_failure() {
            tracing::info!(
                category = %category,
                diagnostics = %report.diagnostics,
                "Hard verifier failure, gating verdict"
            );
            let verdict = Verdict::gated_fail(trail_from_report(&report));
            return CoordinatorResult {
                category,
                report,
                verdict,
            };
        }

        let verdict = self.score_explanation(entry, &report).await;

        tracing::info!(
            category = %category,
            is_correct = verdict.is_correct,
            confidence = verdict.confidence_score,
            fallback = verdict.fallback_used,
            "Verification complete"
        );

        CoordinatorResult {
            category,
            report,
            verdict,
        }
    }

    /// Explanation path: hypothesis checklist, pre-filter, entailment
    /// judging, scoring.
    async fn score_explanation(&self, entry: &Entry, report: &VerificationReport) -> Verdict {
        let count = self.verification.hypothesis_count;
        let hypotheses = match self.generator.generate(&entry.question, count).await {
            Ok(hypotheses) => hypotheses,
            Err(e) => {
                tracing::warn!(error = %e, "Hypothesis generation failed, using fallback verdict");
                return Verdict::fallback(trail_from_report(report));
            }
        };

        // Discard hypotheses sharing no content token with the question:
        // a safety net against off-topic generation.
        let question_tokens = content_tokens(&entry.question);
        let surviving: Vec<String> = hypotheses
            .iter()
            .filter(|h| content_tokens(h).intersection(&question_tokens).next().is_some())
            .cloned()
            .collect();

        if surviving.is_empty() {
            tracing::warn!("All hypotheses off-topic, using fallback verdict");
            let mut trail = trail_from_report(report);
            trail.hypotheses = hypotheses;
            return Verdict::fallback(trail);
        }

        let evaluations = self.judge_all(&entry.generated_response, &surviving).await;
        let score = self.scorer.score(&entry.generated_response, &evaluations);

        let mut trail = trail_from_report(report);
        trail.hypotheses = hypotheses;
        trail.evaluations = evaluations;
        Verdict::new(score.is_correct, score.confidence, trail)
    }

    /// Judge every hypothesis concurrently, preserving input order.
    async fn judge_all(&self, premise: &str, hypotheses: &[String]) -> Vec<HypothesisEvaluation> {
        let futures = hypotheses.iter().map(|hypothesis| {
            let judge = self.judge.clone();
            async move { judge.judge(premise, hypothesis).await }
        });
        future::join_all(futures).await
    }
}

/// Lowercased alphanumeric tokens minus stopwords.
fn content_tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

fn trail_from_report(report: &VerificationReport) -> VerdictTrail {
    VerdictTrail {
        hypotheses: Vec::new(),
        evaluations: Vec::new(),
        missing: report.missing.clone(),
        value_errors: report.value_errors.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CheckOutcome;
    use crate::error::JudgeResult;
    use crate::llm::ChatMessage;
    use crate::tools::StubTools;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Chat stub returning a fixed hypothesis payload and counting calls.
    struct FakeChat {
        payload: String,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ChatClient for FakeChat {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _temperature: f32,
            _max_tokens: u32,
        ) -> JudgeResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.clone())
        }
    }

    /// Judge stub that panics when called; for asserting the cost gate.
    struct UnreachableJudge;

    #[async_trait::async_trait]
    impl EntailmentJudge for UnreachableJudge {
        async fn judge(&self, _premise: &str, _hypothesis: &str) -> HypothesisEvaluation {
            panic!("judge must not be called on a gated entry");
        }
    }

    fn claims_about(topic: &str, count: usize) -> String {
        let claims: Vec<String> = (0..count)
            .map(|i| format!("The answer should mention {topic} detail {i}"))
            .collect();
        serde_json::to_string(&claims).unwrap()
    }

    fn make_coordinator(
        tools: StubTools,
        payload: &str,
        judge: Arc<dyn EntailmentJudge>,
    ) -> (VerificationCoordinator, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let chat = Arc::new(FakeChat {
            payload: payload.to_string(),
            calls: calls.clone(),
        });
        let coordinator = VerificationCoordinator::new(
            Arc::new(tools),
            chat,
            judge,
            ToolsConfig::default(),
            VerificationConfig::default(),
        );
        (coordinator, calls)
    }

    #[tokio::test]
    async fn test_explanation_majority_pass() {
        let judge = Arc::new(crate::engine::StaticJudge::entailing_all(0.9));
        let (coordinator, _) = make_coordinator(
            StubTools::all_passing(),
            &claims_about("liveness probes", 5),
            judge,
        );

        let entry = Entry::new(
            "How do liveness probes work?",
            "Liveness probes restart unhealthy containers.",
        );
        let result = coordinator.verify(&entry).await;
        assert_eq!(result.category, OutputCategory::Explanation);
        assert!(result.verdict.is_correct);
        assert!((result.verdict.confidence_score - 0.9).abs() < 1e-9);
        assert!(!result.verdict.fallback_used);
        assert_eq!(result.verdict.trail.hypotheses.len(), 5);
        assert_eq!(result.verdict.trail.evaluations.len(), 5);
    }

    #[tokio::test]
    async fn test_manifest_dry_run_failure_gates_without_llm_calls() {
        let judge = Arc::new(UnreachableJudge);
        let (coordinator, calls) = make_coordinator(
            StubTools::dry_run_failing("admission webhook denied"),
            &claims_about("configmaps", 5),
            judge,
        );

        let entry = Entry::new(
            "How do I create a ConfigMap?",
            "```yaml\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n```",
        );
        let result = coordinator.verify(&entry).await;
        assert_eq!(result.category, OutputCategory::Yaml);
        assert!(!result.verdict.is_correct);
        assert_eq!(result.verdict.confidence_score, 0.0);
        assert!(!result.verdict.fallback_used);
        // The cost gate: no hypothesis generation, no judgments.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cli_syntax_failure_gates() {
        let judge = Arc::new(UnreachableJudge);
        let (coordinator, calls) =
            make_coordinator(StubTools::all_passing(), &claims_about("pods", 5), judge);

        let entry = Entry::new("How do I list pods?", "kubectl get pods -l 'app=web");
        let result = coordinator.verify(&entry).await;
        assert_eq!(result.category, OutputCategory::Cli);
        assert!(!result.verdict.is_correct);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            result.report.detail,
            ReportDetail::Command {
                syntax_pass: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_off_topic_hypotheses_trigger_fallback() {
        let judge = Arc::new(UnreachableJudge);
        let (coordinator, _) = make_coordinator(
            StubTools::all_passing(),
            &claims_about("unrelated subject entirely", 5),
            judge,
        );

        let entry = Entry::new("zxqv?", "Some explanation text.");
        let result = coordinator.verify(&entry).await;
        assert!(!result.verdict.is_correct);
        assert_eq!(result.verdict.confidence_score, 0.0);
        assert!(result.verdict.fallback_used);
        // Hypotheses are kept in the trail for diagnosis.
        assert_eq!(result.verdict.trail.hypotheses.len(), 5);
        assert!(result.verdict.trail.evaluations.is_empty());
    }

    #[tokio::test]
    async fn test_passing_cli_entry_continues_to_fact_check() {
        let judge = Arc::new(crate::engine::StaticJudge::entailing_all(0.8));
        let (coordinator, _) = make_coordinator(
            StubTools::all_passing(),
            &claims_about("pods listing", 5),
            judge,
        );

        let entry = Entry::new("How do I list pods?", "kubectl get pods -n default")
            .with_reference("kubectl get pods --namespace default");
        let result = coordinator.verify(&entry).await;
        assert_eq!(result.category, OutputCategory::Cli);
        assert!(result.verdict.is_correct);
        assert!(!result.verdict.trail.evaluations.is_empty());
    }

    #[tokio::test]
    async fn test_pre_classified_entry_keeps_category() {
        let judge = Arc::new(crate::engine::StaticJudge::entailing_all(0.8));
        let (coordinator, _) = make_coordinator(
            StubTools::all_passing(),
            &claims_about("services", 5),
            judge,
        );

        let mut entry = Entry::new(
            "What is a Service?",
            "kubectl explain service output pasted here",
        );
        entry.output_category = OutputCategory::Explanation;
        let result = coordinator.verify(&entry).await;
        // Classifier would say Cli; the pre-assigned category wins.
        assert_eq!(result.category, OutputCategory::Explanation);
    }

    #[tokio::test]
    async fn test_padded_empty_hypotheses_are_filtered_not_judged() {
        // Payload yields two well-formed claims, the rest padding.
        let payload = claims_about("deployment scaling", 2);
        let judge = Arc::new(crate::engine::StaticJudge::entailing_all(1.0));
        let (coordinator, _) = make_coordinator(StubTools::all_passing(), &payload, judge);

        let entry = Entry::new(
            "How does deployment scaling work?",
            "Scale with the replicas field.",
        );
        let result = coordinator.verify(&entry).await;
        // 5 trail hypotheses (2 real + 3 padding), but only 2 judged.
        assert_eq!(result.verdict.trail.hypotheses.len(), 5);
        assert_eq!(result.verdict.trail.evaluations.len(), 2);
        // 2 of 2 judged entailed, majority of 2 is 2.
        assert!(result.verdict.is_correct);
    }

    #[tokio::test]
    async fn test_manifest_coverage_shortfall_still_fact_checks() {
        let judge = Arc::new(crate::engine::StaticJudge::entailing_all(0.9));
        let (coordinator, calls) = make_coordinator(
            StubTools::all_passing(),
            &claims_about("configmap data", 5),
            judge,
        );

        let entry = Entry::new(
            "How do I create a ConfigMap with data?",
            "```yaml\napiVersion: v1\nkind: ConfigMap\n```",
        )
        .with_reference(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\ndata:\n  key: value\n",
        );
        let result = coordinator.verify(&entry).await;
        // Coverage shortfall is not a hard gate; the report fails but the
        // explanation path still runs.
        assert!(!result.report.pass);
        assert!(calls.load(Ordering::SeqCst) > 0);
        assert!(!result.verdict.trail.missing.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_stub_outcome_recorded() {
        let judge = Arc::new(UnreachableJudge);
        let tools = StubTools {
            schema: CheckOutcome::passed(""),
            lint: CheckOutcome::passed(""),
            dry_run: CheckOutcome::failed("namespace missing"),
        };
        let (coordinator, _) = make_coordinator(tools, &claims_about("pods", 5), judge);

        let entry = Entry::new(
            "q",
            "```yaml\napiVersion: v1\nkind: Pod\n```",
        );
        let result = coordinator.verify(&entry).await;
        match &result.report.detail {
            ReportDetail::Manifest { dry_run, .. } => {
                assert!(!dry_run.pass);
                assert_eq!(dry_run.output, "namespace missing");
            }
            other => panic!("expected manifest detail, got {other:?}"),
        }
    }
}
