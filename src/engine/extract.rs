//! Fenced-block extraction.
//!
//! Pulls the first triple-backtick block out of free text. Tolerates a
//! missing language tag and any number of later blocks.

use std::sync::OnceLock;

use regex::Regex;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```([A-Za-z0-9_+-]*)\n(.*?)```").expect("valid fence regex")
    })
}

/// Inner content of the first fenced block, trimmed; empty if none.
pub fn extract_fenced_block(text: &str) -> String {
    fence_re()
        .captures(text)
        .map(|caps| caps[2].trim().to_string())
        .unwrap_or_default()
}

/// Language tag of the first fenced block, lowercased; empty when untagged
/// or when no block exists.
pub fn first_fence_tag(text: &str) -> String {
    fence_re()
        .captures(text)
        .map(|caps| caps[1].to_lowercase())
        .unwrap_or_default()
}
