//! HTTP request handlers.

use axum::{extract::State, Json};

use crate::api::types::*;
use crate::error::{JudgeError, JudgeResult};
use crate::AppState;

/// Verify one entry through the full pipeline.
///
/// POST /v1/entries/verify
pub async fn verify_entry(
    State(state): State<AppState>,
    Json(request): Json<VerifyEntryRequest>,
) -> JudgeResult<Json<VerifyEntryResponse>> {
    let entry = request.entry;

    if entry.generated_response.trim().is_empty() {
        return Err(JudgeError::BadRequest(
            "generated_response must not be empty".to_string(),
        ));
    }

    tracing::info!(
        question_len = entry.question.len(),
        has_reference = entry.reference_answer.is_some(),
        "Verifying entry"
    );

    let result = state.coordinator.verify(&entry).await;

    tracing::info!(
        category = %result.category,
        is_correct = result.verdict.is_correct,
        confidence = result.verdict.confidence_score,
        "Entry verification complete"
    );

    Ok(Json(VerifyEntryResponse {
        output_category: result.category,
        verification: result.report,
        verdict: result.verdict,
    }))
}

/// Health check endpoint.
///
/// GET /v1/health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
