//! Structured-config (manifest) verifier.
//!
//! Validates a generated manifest answer against the reference: field-level
//! diff scoring plus external schema-conformance and server-side dry-run
//! checks. Tool failures are captured in the report; nothing here aborts
//! the batch.

use std::sync::Arc;

use crate::config::{ToolsConfig, VerificationConfig};
use crate::domain::{ReportDetail, VerificationReport};
use crate::engine::extract::extract_fenced_block;
use crate::engine::fieldmap::FieldMap;
use crate::tools::ClusterTools;

/// Verifies manifest answers.
pub struct ManifestVerifier {
    tools: Arc<dyn ClusterTools>,
    tools_config: ToolsConfig,
    verification: VerificationConfig,
}

impl ManifestVerifier {
    pub fn new(
        tools: Arc<dyn ClusterTools>,
        tools_config: ToolsConfig,
        verification: VerificationConfig,
    ) -> Self {
        Self {
            tools,
            tools_config,
            verification,
        }
    }

    /// Verify a generated manifest against the reference answer.
    pub async fn verify(&self, generated: &str, reference: Option<&str>) -> VerificationReport {
        let manifest = extract_fenced_block(generated);
        // An answer classified as YAML may carry the manifest unfenced.
        let manifest = if manifest.is_empty() {
            generated.to_string()
        } else {
            manifest
        };

        let max_depth = self.verification.max_field_depth;
        let generated_map = FieldMap::from_manifest(&manifest, max_depth);

        // The reference often carries its manifest without a fence.
        let reference_map = reference.map(|text| {
            let block = extract_fenced_block(text);
            let source = if block.is_empty() { text } else { &block };
            FieldMap::from_manifest(source, max_depth)
        });

        let mut diagnostics = Vec::new();
        let (coverage_percent, missing, value_errors) = match &reference_map {
            Some(reference_map) if !reference_map.is_empty() => {
                let diff = reference_map.diff(&generated_map);
                (diff.coverage_percent, diff.missing, diff.value_errors)
            }
            _ => {
                // Vacuously non-scored, surfaced rather than silently passed.
                diagnostics.push(
                    "reference contains no comparable fields; nothing to check".to_string(),
                );
                (None, Vec::new(), Vec::new())
            }
        };

        let schema = self.tools.schema_check(&manifest).await;
        let lint = if self.tools_config.lint_enabled {
            Some(self.tools.lint(&manifest).await)
        } else {
            None
        };
        let dry_run = self
            .tools
            .dry_run_manifest(&manifest, &self.tools_config.namespace)
            .await;

        if !schema.pass {
            diagnostics.push(format!("schema check failed: {}", schema.output.trim()));
        }
        if let Some(lint) = lint.as_ref().filter(|l| !l.pass) {
            diagnostics.push(format!("lint reported critical findings: {}", lint.output.trim()));
        }
        if !dry_run.pass {
            diagnostics.push(format!("dry-run failed: {}", dry_run.output.trim()));
        }

        let coverage_ok = coverage_percent
            .map(|c| c >= self.verification.coverage_threshold)
            // No reference fields: vacuous pass.
            .unwrap_or(true);
        let schema_ok = schema.pass || !self.verification.schema_gates_pass;
        let pass = coverage_ok && value_errors.is_empty() && dry_run.pass && schema_ok;

        tracing::debug!(
            coverage = ?coverage_percent,
            missing = missing.len(),
            value_errors = value_errors.len(),
            schema_pass = schema.pass,
            dry_run_pass = dry_run.pass,
            pass,
            "Manifest verification complete"
        );

        VerificationReport {
            pass,
            coverage_percent,
            missing,
            value_errors,
            diagnostics: diagnostics.join("; "),
            detail: ReportDetail::Manifest {
                schema,
                lint,
                dry_run,
            },
        }
    }
}
