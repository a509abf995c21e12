//! Hypothesis generation.
//!
//! Derives a fixed-size checklist of atomic, falsifiable requirements from
//! a question via a few-shot completion call. The model's output passes a
//! strict validation pipeline: JSON-array parse, structural filter,
//! raw-line salvage, then empty-string padding to exactly N. Padding
//! degrades downstream scoring instead of retrying indefinitely.

use std::sync::Arc;

use crate::error::{JudgeError, JudgeResult};
use crate::llm::{ChatClient, ChatMessage};

/// Required prefix for a well-formed claim.
const CLAIM_PREFIX: &str = "The answer should";
/// Length band (chars) for a well-formed claim.
const CLAIM_MIN_LEN: usize = 20;
const CLAIM_MAX_LEN: usize = 240;

const GENERATION_TEMPERATURE: f32 = 0.0;
const GENERATION_MAX_TOKENS: u32 = 512;

/// Generates the per-question claim checklist.
pub struct HypothesisGenerator {
    client: Arc<dyn ChatClient>,
}

impl HypothesisGenerator {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    /// Return exactly `count` claim strings for the question.
    ///
    /// Malformed model output is salvaged and padded, never raised; only
    /// transport-level failures (retries exhausted, fatal API errors)
    /// propagate to the caller.
    pub async fn generate(&self, question: &str, count: usize) -> JudgeResult<Vec<String>> {
        let messages = build_generation_prompt(question, count);
        let raw = self
            .client
            .complete(&messages, GENERATION_TEMPERATURE, GENERATION_MAX_TOKENS)
            .await?;

        let mut claims: Vec<String> = match parse_claim_array(&raw) {
            Ok(items) => {
                if items.len() != count {
                    tracing::warn!(
                        got = items.len(),
                        expected = count,
                        "Hypothesis array has wrong item count, keeping well-formed items"
                    );
                }
                items.into_iter().filter(|c| is_well_formed(c)).collect()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Hypothesis payload malformed, salvaging raw lines");
                Vec::new()
            }
        };

        // Top up from raw lines that happen to satisfy the structural rule.
        if claims.len() < count {
            for line in salvage_lines(&raw) {
                if claims.len() == count {
                    break;
                }
                if !claims.contains(&line) {
                    claims.push(line);
                }
            }
        }

        // Padding keeps the contract of exactly N items; empty claims are
        // discarded by the pre-filter and judged by nobody.
        if claims.len() < count {
            tracing::warn!(
                generated = claims.len(),
                requested = count,
                "Hypothesis underflow, padding with empty claims"
            );
            claims.resize(count, String::new());
        }
        claims.truncate(count);

        Ok(claims)
    }
}

fn build_generation_prompt(question: &str, count: usize) -> Vec<ChatMessage> {
    let system = "You are a Kubernetes expert helping to grade answers to \
                  technical questions. You produce atomic, falsifiable \
                  requirements that any correct answer must satisfy.";
    let user = format!(
        "Given a question, list exactly {count} requirements a correct answer \
         must satisfy. Each requirement must be a single sentence starting \
         with \"{CLAIM_PREFIX}\". Respond with a JSON array of {count} strings \
         and nothing else.\n\
         \n\
         Example question: \"How do I expose a Deployment on port 80?\"\n\
         Example response:\n\
         [\"The answer should mention creating a Service for the Deployment\", \
          \"The answer should ensure the Service targets port 80\"]\n\
         \n\
         Question:\n{question}"
    );
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Strict parse of the model payload as a JSON array of strings.
///
/// A detectable parse failure is a typed error; the caller routes it
/// through the salvage path.
fn parse_claim_array(raw: &str) -> JudgeResult<Vec<String>> {
    let candidate = json_slice(raw);
    serde_json::from_str(candidate)
        .map_err(|e| JudgeError::MalformedModelOutput(format!("expected JSON array: {e}")))
}

/// The JSON-looking slice of a possibly chatty payload.
fn json_slice(raw: &str) -> &str {
    match (raw.find('['), raw.rfind(']')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    }
}

fn is_well_formed(claim: &str) -> bool {
    claim.starts_with(CLAIM_PREFIX) && (CLAIM_MIN_LEN..=CLAIM_MAX_LEN).contains(&claim.len())
}

/// Lines of unstructured output that still satisfy the structural rule,
/// with list markup stripped.
fn salvage_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*'])
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
                .trim()
                .trim_matches(['"', ','])
                .trim_end_matches(',')
                .to_string()
        })
        .filter(|line| is_well_formed(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JudgeResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Chat stub returning a fixed payload and counting calls.
    struct FakeChat {
        payload: String,
        calls: AtomicUsize,
    }

    impl FakeChat {
        fn new(payload: &str) -> Self {
            Self {
                payload: payload.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
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

    fn claim(n: usize) -> String {
        format!("The answer should mention requirement number {n}")
    }

    #[tokio::test]
    async fn test_valid_array_returns_exactly_n() {
        let payload = serde_json::to_string(&[claim(1), claim(2), claim(3)]).unwrap();
        let chat = Arc::new(FakeChat::new(&payload));
        let generator = HypothesisGenerator::new(chat.clone());
        let claims = generator.generate("How do I scale a deployment?", 3).await.unwrap();
        assert_eq!(claims.len(), 3);
        assert_eq!(claims[0], claim(1));
        assert_eq!(chat.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chatty_payload_with_embedded_array_parses() {
        let payload = format!(
            "Here are the requirements:\n[\"{}\", \"{}\"]",
            claim(1),
            claim(2)
        );
        let chat = Arc::new(FakeChat::new(&payload));
        let generator = HypothesisGenerator::new(chat.clone());
        let claims = generator.generate("q", 2).await.unwrap();
        assert_eq!(claims, vec![claim(1), claim(2)]);
    }

    #[tokio::test]
    async fn test_malformed_json_salvages_lines() {
        let payload = format!("not json at all\n- {}\n- {}\n", claim(1), claim(2));
        let chat = Arc::new(FakeChat::new(&payload));
        let generator = HypothesisGenerator::new(chat.clone());
        let claims = generator.generate("q", 2).await.unwrap();
        assert_eq!(claims, vec![claim(1), claim(2)]);
    }

    #[tokio::test]
    async fn test_underflow_pads_with_empty_strings() {
        let payload = serde_json::to_string(&[claim(1)]).unwrap();
        let chat = Arc::new(FakeChat::new(&payload));
        let generator = HypothesisGenerator::new(chat.clone());
        let claims = generator.generate("q", 4).await.unwrap();
        assert_eq!(claims.len(), 4);
        assert_eq!(claims[0], claim(1));
        assert_eq!(&claims[1..], &["", "", ""]);
    }

    #[tokio::test]
    async fn test_wrong_prefix_items_are_dropped() {
        let payload = serde_json::to_string(&[
            claim(1),
            "Mentions a Service object somewhere in the text".to_string(),
        ])
        .unwrap();
        let chat = Arc::new(FakeChat::new(&payload));
        let generator = HypothesisGenerator::new(chat.clone());
        let claims = generator.generate("q", 2).await.unwrap();
        assert_eq!(claims[0], claim(1));
        assert_eq!(claims[1], "");
    }

    #[tokio::test]
    async fn test_overlong_items_are_dropped() {
        let long_claim = format!("The answer should {}", "x".repeat(400));
        let payload = serde_json::to_string(&[long_claim, claim(2)]).unwrap();
        let chat = Arc::new(FakeChat::new(&payload));
        let generator = HypothesisGenerator::new(chat.clone());
        let claims = generator.generate("q", 2).await.unwrap();
        assert_eq!(claims[0], claim(2));
    }
}
