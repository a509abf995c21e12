//! Entailment judging.
//!
//! Judges, per hypothesis, whether the generated answer entails it. The
//! judge is a pluggable capability: the live implementation asks the
//! completion service for a strict JSON verdict, and a deterministic table
//! judge ships for test suites so scorer logic stays decoupled from live
//! model variance. Malformed judge output degrades to an unsupported
//! judgment, never an error.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::domain::HypothesisEvaluation;
use crate::llm::{ChatClient, ChatMessage};

const JUDGMENT_TEMPERATURE: f32 = 0.0;
const JUDGMENT_MAX_TOKENS: u32 = 64;

/// Capability trait for per-hypothesis entailment judgments.
///
/// Calls are independent: no shared state, any ordering, safe to issue
/// concurrently.
#[async_trait::async_trait]
pub trait EntailmentJudge: Send + Sync {
    /// Judge whether `premise` entails `hypothesis`.
    async fn judge(&self, premise: &str, hypothesis: &str) -> HypothesisEvaluation;
}

/// Wire shape of a well-formed judgment payload.
#[derive(Debug, Deserialize)]
struct JudgmentPayload {
    entailment: bool,
    #[serde(default)]
    confidence: f64,
}

/// Live judge over the completion service.
pub struct LlmEntailmentJudge {
    client: Arc<dyn ChatClient>,
}

impl LlmEntailmentJudge {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    fn build_prompt(premise: &str, hypothesis: &str) -> Vec<ChatMessage> {
        let system = "You are a Kubernetes expert acting as a strict \
                      natural-language-inference judge.";
        let user = format!(
            "Premise (the model's answer):\n\"\"\"\n{premise}\n\"\"\"\n\
             \n\
             Hypothesis (a required fact):\n\"{hypothesis}\"\n\
             \n\
             Does the premise entail the hypothesis? Respond with a JSON \
             object and nothing else: \
             {{\"entailment\": true|false, \"confidence\": <0.0-1.0>}}"
        );
        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }

    /// Parse a judgment payload, tolerating a fenced JSON block.
    fn parse_judgment(raw: &str) -> Option<JudgmentPayload> {
        let candidate = match (raw.find('{'), raw.rfind('}')) {
            (Some(start), Some(end)) if start < end => &raw[start..=end],
            _ => raw,
        };
        serde_json::from_str(candidate).ok()
    }
}

#[async_trait::async_trait]
impl EntailmentJudge for LlmEntailmentJudge {
    async fn judge(&self, premise: &str, hypothesis: &str) -> HypothesisEvaluation {
        let messages = Self::build_prompt(premise, hypothesis);
        let raw = match self
            .client
            .complete(&messages, JUDGMENT_TEMPERATURE, JUDGMENT_MAX_TOKENS)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Judgment call failed, treating as unsupported");
                return HypothesisEvaluation::unsupported(hypothesis);
            }
        };

        match Self::parse_judgment(&raw) {
            Some(payload) => {
                HypothesisEvaluation::new(hypothesis, payload.entailment, payload.confidence)
            }
            None => {
                tracing::warn!(raw = %raw, "Unparseable judgment payload, treating as unsupported");
                HypothesisEvaluation::unsupported(hypothesis)
            }
        }
    }
}

/// Deterministic judge backed by a fixed hypothesis -> verdict table.
///
/// Hypotheses absent from the table are unsupported.
#[derive(Default)]
pub struct StaticJudge {
    table: HashMap<String, (bool, f64)>,
}

impl StaticJudge {
    pub fn new(table: HashMap<String, (bool, f64)>) -> Self {
        Self { table }
    }

    /// Judge that entails every hypothesis with the given confidence.
    pub fn entailing_all(confidence: f64) -> Self {
        Self {
            table: HashMap::new(),
        }
        .with_default(true, confidence)
    }

    fn with_default(mut self, entailment: bool, confidence: f64) -> Self {
        self.table
            .insert(String::new(), (entailment, confidence));
        self
    }
}

#[async_trait::async_trait]
impl EntailmentJudge for StaticJudge {
    async fn judge(&self, _premise: &str, hypothesis: &str) -> HypothesisEvaluation {
        let verdict = self
            .table
            .get(hypothesis)
            .or_else(|| self.table.get(""))
            .copied();
        match verdict {
            Some((entailment, confidence)) => {
                HypothesisEvaluation::new(hypothesis, entailment, confidence)
            }
            None => HypothesisEvaluation::unsupported(hypothesis),
        }
    }
}
