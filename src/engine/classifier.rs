//! Output-modality classifier.
//!
//! Assigns exactly one [`OutputCategory`] to a generated answer. Pure and
//! total: unclassifiable text defaults to `Explanation`, never an error.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::OutputCategory;
use crate::engine::extract::{extract_fenced_block, first_fence_tag};

const RESOURCE_VERSION_MARKER: &str = "apiVersion:";
const KIND_MARKER: &str = "kind:";

fn cli_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(kubectl|helm|docker)\b").expect("valid CLI token regex"))
}

fn has_manifest_markers(text: &str) -> bool {
    text.contains(RESOURCE_VERSION_MARKER) && text.contains(KIND_MARKER)
}

/// Classify a generated answer into its output modality.
///
/// Order of checks (first match wins):
/// 1. a yaml-tagged fence, or manifest markers in the first fenced block or
///    the raw text, make it `Yaml`;
/// 2. a CLI tool token without an `apiVersion:` marker makes it `Cli`;
/// 3. everything else is `Explanation`.
pub fn classify(response: &str) -> OutputCategory {
    let fence_tag = first_fence_tag(response);
    if fence_tag == "yaml" || fence_tag == "yml" {
        return OutputCategory::Yaml;
    }

    let fenced = extract_fenced_block(response);
    if has_manifest_markers(&fenced) || has_manifest_markers(response) {
        return OutputCategory::Yaml;
    }

    if cli_token_re().is_match(response) && !response.contains(RESOURCE_VERSION_MARKER) {
        return OutputCategory::Cli;
    }

    OutputCategory::Explanation
}
