//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::domain::{Entry, OutputCategory, VerificationReport, Verdict};

// ==================== Verify Entry ====================

/// Request to verify one entry.
#[derive(Debug, Deserialize)]
pub struct VerifyEntryRequest {
    /// The entry to verify.
    #[serde(flatten)]
    pub entry: Entry,
}

/// Response from entry verification.
#[derive(Debug, Serialize)]
pub struct VerifyEntryResponse {
    /// The modality assigned to the entry.
    pub output_category: OutputCategory,
    /// The modality verifier's report.
    pub verification: VerificationReport,
    /// The final verdict.
    pub verdict: Verdict,
}

// ==================== Health ====================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}
