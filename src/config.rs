//! Configuration module for Kubejudge.
//!
//! Loads configuration from YAML files and environment variables.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub tools: ToolsConfig,
    pub verification: VerificationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Completion service configuration.
///
/// Injected into the client at construction; the engine never reads
/// API keys or proxies from ambient process state.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible chat completions API.
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Global cap on concurrent completion calls.
    pub max_concurrency: usize,
    /// Retry attempts for rate-limited or transient failures.
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries (milliseconds).
    pub backoff_base_ms: u64,
}

/// External Kubernetes toolchain configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    pub kubeconform_bin: String,
    pub kubectl_bin: String,
    pub kube_score_bin: String,
    /// Run the kube-score lint check on manifest answers.
    #[serde(default)]
    pub lint_enabled: bool,
    /// Namespace used for server-side dry-run.
    pub namespace: String,
    /// Wall-clock limit for a single tool invocation; expiry is a failed
    /// check, never a hang.
    pub timeout_secs: u64,
}

/// Verification thresholds and scoring parameters.
///
/// All cutoffs observed in the source pipeline are kept configurable here.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// Field coverage (percent) a manifest answer must reach.
    pub coverage_threshold: f64,
    /// Number of hypotheses generated per question.
    pub hypothesis_count: usize,
    /// Scoring strategy for the explanation path.
    pub scoring: ScoringMode,
    /// Pass cutoff for the blended strategy.
    pub blend_pass_threshold: f64,
    /// Lexical-coverage weight in the blended strategy.
    pub rule_weight: f64,
    /// Entailment weight in the blended strategy.
    pub nli_weight: f64,
    /// Maximum nesting depth kept when flattening manifests.
    pub max_field_depth: usize,
    /// Whether a schema-conformance failure flips the manifest verdict.
    /// Diagnostic-only by default.
    #[serde(default)]
    pub schema_gates_pass: bool,
    /// Parallel entries during a batch run.
    pub max_concurrent_entries: usize,
}

/// Selects how explanation-path signals are reconciled into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Majority vote over entailed hypotheses.
    Majority,
    /// Weighted blend of lexical coverage and entailment coverage.
    Blended,
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (KUBEJUDGE__*)
    /// 2. config/local.yaml (if exists)
    /// 3. config/default.yaml
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            // Start with default config
            .add_source(File::with_name("config/default").required(false))
            // Layer on local overrides
            .add_source(File::with_name("config/local").required(false))
            // Layer on environment variables with KUBEJUDGE prefix
            .add_source(
                Environment::with_prefix("KUBEJUDGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            coverage_threshold: 80.0,
            hypothesis_count: 5,
            scoring: ScoringMode::Majority,
            blend_pass_threshold: 0.75,
            rule_weight: 0.4,
            nli_weight: 0.6,
            max_field_depth: 8,
            schema_gates_pass: false,
            max_concurrent_entries: 4,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            kubeconform_bin: "kubeconform".to_string(),
            kubectl_bin: "kubectl".to_string(),
            kube_score_bin: "kube-score".to_string(),
            lint_enabled: false,
            namespace: "default".to_string(),
            timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_verification_config() {
        let config = VerificationConfig::default();
        assert_eq!(config.coverage_threshold, 80.0);
        assert_eq!(config.hypothesis_count, 5);
        assert_eq!(config.scoring, ScoringMode::Majority);
        assert!(!config.schema_gates_pass);
    }

    #[test]
    fn test_scoring_mode_deserializes_snake_case() {
        let mode: ScoringMode = serde_json::from_str("\"blended\"").unwrap();
        assert_eq!(mode, ScoringMode::Blended);
    }

    #[test]
    fn test_default_tools_config() {
        let config = ToolsConfig::default();
        assert_eq!(config.namespace, "default");
        assert_eq!(config.timeout_secs, 30);
        assert!(!config.lint_enabled);
    }
}
