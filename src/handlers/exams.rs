use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::catalog::find_exam;
use crate::error::ApiError;
use crate::models::catalog::{BoardOverview, ExamSummary, BOARD_PREVIEW_LIMIT};
use crate::models::post::{pick_popular, POPULAR_LIMIT, POPULAR_WINDOW};
use crate::state::AppState;

/// GET /api/exams
pub async fn list_exams(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let exams: Vec<ExamSummary> = state
        .gate()
        .enabled_exams()
        .into_iter()
        .map(ExamSummary::from)
        .collect();

    info!("Listing {} enabled exams", exams.len());
    Json(json!({ "ok": true, "exams": exams }))
}

/// GET /api/exams/:exam/boards
pub async fn exam_boards(
    State(state): State<Arc<AppState>>,
    Path(exam_slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Fetching boards of exam: {}", exam_slug);

    let exam = find_exam(&exam_slug).ok_or_else(|| ApiError::not_found("존재하지 않는 시험입니다."))?;
    state.gate().ensure_readable(exam.slug)?;

    let mut latest = state.db.latest_posts_by_board(exam.slug, BOARD_PREVIEW_LIMIT).await?;
    let boards: Vec<BoardOverview> = exam
        .boards
        .iter()
        .map(|board| BoardOverview::new(board, latest.remove(board.slug).unwrap_or_default()))
        .collect();

    info!("Returning {} boards for exam {}", boards.len(), exam.slug);
    Ok(Json(json!({ "ok": true, "exam": exam, "boards": boards })))
}

/// GET /api/exams/:exam/popular
pub async fn popular_posts(
    State(state): State<Arc<AppState>>,
    Path(exam_slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Computing popular posts for exam: {}", exam_slug);
    state.gate().ensure_readable(&exam_slug)?;

    let candidates = state.db.popular_candidates(&exam_slug, POPULAR_WINDOW).await?;
    let posts = pick_popular(candidates, POPULAR_LIMIT);

    info!("Selected {} popular posts for exam {}", posts.len(), exam_slug);
    Ok(Json(json!({ "ok": true, "posts": posts })))
}
