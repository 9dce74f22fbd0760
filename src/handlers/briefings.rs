use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::models::briefing::BRIEFING_LIMIT;
use crate::state::AppState;

/// GET /api/daily/:exam
pub async fn daily_briefings(
    State(state): State<Arc<AppState>>,
    Path(exam_slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let exam_slug = exam_slug.trim().to_string();
    if exam_slug.is_empty() {
        return Err(ApiError::validation("exam 파라미터가 필요합니다."));
    }
    state.gate().ensure_readable(&exam_slug)?;

    let briefings = state.db.latest_briefings(&exam_slug, BRIEFING_LIMIT).await?;

    info!("Retrieved {} briefings for exam: {}", briefings.len(), exam_slug);
    Ok(Json(json!({ "ok": true, "source": "db", "briefings": briefings })))
}
