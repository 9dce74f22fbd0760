use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use tracing::info;

use crate::catalog::WriteAction;
use crate::error::ApiError;
use crate::extract::Payload;
use crate::models::verification::CreateVerificationRequest;
use crate::state::AppState;

/// Submit proof of a pass for manual review
/// POST /api/verification/request
pub async fn request_verification(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<CreateVerificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (requester_name, exam) = request.requester_and_exam().map_err(ApiError::Validation)?;
    state.gate().ensure_writable(exam.as_str(), WriteAction::Verification)?;

    let new_request = request.validate(requester_name, exam).map_err(ApiError::Validation)?;
    info!(
        "Verification request from {} ({}) for {}",
        new_request.requester_name,
        new_request.verification_type,
        exam.as_str()
    );

    let created = state.db.create_verification(&new_request).await?;

    info!("Created verification request with id: {}", created.id);
    Ok(Json(json!({ "ok": true, "request": created })))
}
