use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::models::cutoff::{exam_or_default, CutoffQuery};
use crate::state::AppState;

const PUBLIC_CUTOFF_LIMIT: i64 = 30;

/// Latest reported cutoffs
/// GET /api/cutoffs?exam=transfer
pub async fn list_cutoffs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CutoffQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let exam_slug = exam_or_default(&query.exam);
    state.gate().ensure_readable(&exam_slug)?;
    info!("Fetching cutoffs for exam: {}", exam_slug);

    let cutoffs = state.db.latest_cutoffs(&exam_slug, PUBLIC_CUTOFF_LIMIT).await?;

    info!("Retrieved {} cutoffs", cutoffs.len());
    Ok(Json(json!({ "ok": true, "source": "db", "cutoffs": cutoffs })))
}
