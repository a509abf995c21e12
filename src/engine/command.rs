//! Command-line verifier.
//!
//! Syntax-checks a generated command with POSIX word-splitting rules, runs
//! mutating `kubectl apply` invocations as a server-side dry-run, and scores
//! flag coverage against the reference. When the reference carries no flags
//! the verifier defers the entry to the explanation path instead of failing.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::VerificationConfig;
use crate::domain::{ReportDetail, VerificationReport};
use crate::engine::extract::extract_fenced_block;
use crate::tools::ClusterTools;

fn flag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"--[A-Za-z0-9][A-Za-z0-9-]*(?:=\S+)?").expect("valid flag regex")
    })
}

/// All `--flag[=value]` tokens in a text, as a set.
fn extract_flags(text: &str) -> BTreeSet<String> {
    flag_re()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Verifies command-line answers.
pub struct CommandVerifier {
    tools: Arc<dyn ClusterTools>,
    verification: VerificationConfig,
}

impl CommandVerifier {
    pub fn new(tools: Arc<dyn ClusterTools>, verification: VerificationConfig) -> Self {
        Self {
            tools,
            verification,
        }
    }

    /// The command text to tokenize: the first fenced block when present,
    /// otherwise the whole answer.
    fn command_text(generated: &str) -> String {
        let fenced = extract_fenced_block(generated);
        if fenced.is_empty() {
            generated.trim().to_string()
        } else {
            fenced
        }
    }

    /// Rewrite a `kubectl apply` token vector into a non-persisting form:
    /// existing dry-run flags are stripped, a server-side dry-run appended.
    fn rewrite_for_dry_run(tokens: &[String]) -> Option<Vec<String>> {
        let kubectl_pos = tokens.iter().position(|t| t.ends_with("kubectl"))?;
        let rest = &tokens[kubectl_pos..];
        let is_apply = rest
            .iter()
            .skip(1)
            .find(|t| !t.starts_with('-'))
            .is_some_and(|sub| sub == "apply");
        if !is_apply {
            return None;
        }

        let mut argv: Vec<String> = rest
            .iter()
            .filter(|t| !t.starts_with("--dry-run"))
            .cloned()
            .collect();
        argv.push("--dry-run=server".to_string());
        Some(argv)
    }

    /// Verify a generated command against the reference answer.
    pub async fn verify(&self, generated: &str, reference: Option<&str>) -> VerificationReport {
        let command = Self::command_text(generated);

        // 1) Syntax: shell word-splitting must succeed.
        let tokens = match shell_words::split(&command) {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::debug!(error = %e, "Command tokenization failed");
                return VerificationReport {
                    pass: false,
                    coverage_percent: None,
                    missing: Vec::new(),
                    value_errors: Vec::new(),
                    diagnostics: format!("syntax error: {e}"),
                    detail: ReportDetail::Command {
                        syntax_pass: false,
                        dry_run: None,
                        deferred: false,
                    },
                };
            }
        };

        // 2) Mutating apply commands run as a server-side dry-run.
        let dry_run = match Self::rewrite_for_dry_run(&tokens) {
            Some(argv) => Some(self.tools.dry_run_command(&argv).await),
            None => None,
        };

        // 3) Flag coverage against the reference, when it has flags.
        let reference_flags = reference.map(extract_flags).unwrap_or_default();
        let mut deferred = false;
        let mut missing = Vec::new();
        let coverage_percent = if reference_flags.is_empty() {
            // Nothing flag-shaped to compare; the explanation path decides.
            deferred = true;
            None
        } else {
            let generated_flags = extract_flags(generated);
            let matched = reference_flags.intersection(&generated_flags).count();
            missing = reference_flags
                .difference(&generated_flags)
                .cloned()
                .collect();
            Some(100.0 * matched as f64 / reference_flags.len() as f64)
        };

        let mut diagnostics = Vec::new();
        if let Some(dry_run) = dry_run.as_ref().filter(|d| !d.pass) {
            diagnostics.push(format!("dry-run failed: {}", dry_run.output.trim()));
        }
        if !missing.is_empty() {
            diagnostics.push(format!("missing flags: {}", missing.join(", ")));
        }

        let dry_run_ok = dry_run.as_ref().map(|d| d.pass).unwrap_or(true);
        let coverage_ok = coverage_percent
            .map(|c| c >= self.verification.coverage_threshold)
            .unwrap_or(true);
        let pass = dry_run_ok && coverage_ok;

        tracing::debug!(
            tokens = tokens.len(),
            dry_run_attempted = dry_run.is_some(),
            coverage = ?coverage_percent,
            deferred,
            pass,
            "Command verification complete"
        );

        VerificationReport {
            pass,
            coverage_percent,
            missing,
            value_errors: Vec::new(),
            diagnostics: diagnostics.join("; "),
            detail: ReportDetail::Command {
                syntax_pass: true,
                dry_run,
                deferred,
            },
        }
    }
}
