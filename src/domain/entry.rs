//! Entry-related domain types.
//!
//! An entry is one question/answer record from the evaluation set.

use serde::{Deserialize, Serialize};

/// Output modality of a generated answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputCategory {
    /// A Kubernetes manifest (structured configuration).
    #[serde(rename = "YAML")]
    Yaml,
    /// A command-line invocation (kubectl, helm, docker).
    #[serde(rename = "CLI")]
    Cli,
    /// Free-text explanation.
    Explanation,
    /// Not yet classified.
    Unknown,
}

impl Default for OutputCategory {
    fn default() -> Self {
        OutputCategory::Unknown
    }
}

impl std::fmt::Display for OutputCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputCategory::Yaml => write!(f, "YAML"),
            OutputCategory::Cli => write!(f, "CLI"),
            OutputCategory::Explanation => write!(f, "Explanation"),
            OutputCategory::Unknown => write!(f, "Unknown"),
        }
    }
}

impl std::str::FromStr for OutputCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" => Ok(OutputCategory::Yaml),
            "cli" => Ok(OutputCategory::Cli),
            "explanation" => Ok(OutputCategory::Explanation),
            "unknown" => Ok(OutputCategory::Unknown),
            _ => Err(format!("Unknown output category: {}", s)),
        }
    }
}

/// One question/answer record to verify.
///
/// Immutable after classification; verification only appends fields on the
/// output record, never rewrites these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// The original question (title and body combined upstream).
    pub question: String,

    /// The RAG system's generated answer.
    pub generated_response: String,

    /// Human reference answer, when one exists.
    #[serde(default)]
    pub reference_answer: Option<String>,

    /// Contexts retrieved for generation; empty for baseline runs.
    #[serde(default)]
    pub retrieved_contexts: Vec<String>,

    /// Output modality, assigned by the classifier exactly once.
    #[serde(default)]
    pub output_category: OutputCategory,
}

impl Entry {
    /// Create an unclassified entry.
    pub fn new(question: impl Into<String>, generated_response: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            generated_response: generated_response.into(),
            reference_answer: None,
            retrieved_contexts: Vec::new(),
            output_category: OutputCategory::Unknown,
        }
    }

    /// Builder-style setter for the reference answer.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_answer = Some(reference.into());
        self
    }
}
