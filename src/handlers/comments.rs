use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::{json, Value};
use tracing::info;

use crate::catalog::WriteAction;
use crate::db::AdoptionRecord;
use crate::error::ApiError;
use crate::extract::Payload;
use crate::handlers::ok_json;
use crate::models::comment::{adoption_award, selected_author_name, AdoptRequest, AdoptionResult, CreateCommentRequest};
use crate::state::AppState;

/// POST /api/comments
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = request.validate().map_err(ApiError::Validation)?;
    info!("Creating comment on post: {}", comment.post_id);

    let context = state
        .db
        .find_post_context(comment.post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("게시글 정보를 확인할 수 없습니다."))?;
    state.gate().ensure_writable(&context.exam_slug, WriteAction::Comment)?;

    if let Some(parent_id) = comment.parent_id {
        let parent = state.db.find_comment(parent_id).await?;
        if parent.map(|parent| parent.post_id) != Some(context.id) {
            return Err(ApiError::validation("유효하지 않은 답글 대상입니다."));
        }
    }

    let created = state.db.create_comment(&comment).await?;

    info!("Successfully created comment with id: {}", created.id);
    Ok(Json(json!({ "ok": true, "comment": created })))
}

/// POST /api/comments/adopt
///
/// The post author picks one answer; its author receives points once.
pub async fn adopt_comment(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<AdoptRequest>,
) -> Result<Json<Value>, ApiError> {
    let (post_id, comment_id) = request.ids().map_err(ApiError::Validation)?;
    let adopter_name = request
        .adopter()
        .ok_or_else(|| ApiError::unauthorized("로그인 정보가 필요합니다."))?;
    info!("Adoption request for comment {} on post {}", comment_id, post_id);

    let context = state
        .db
        .find_post_context(post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("게시글을 찾을 수 없습니다."))?;
    state.gate().ensure_writable(&context.exam_slug, WriteAction::Adopt)?;

    if context.author_name.trim() != adopter_name {
        return Err(ApiError::forbidden("게시글 작성자만 채택할 수 있습니다."));
    }

    if state.db.adopted_comment_id(post_id).await?.is_some() {
        return Err(ApiError::conflict("이미 채택된 답변이 있습니다."));
    }

    let comment = state
        .db
        .find_comment(comment_id)
        .await?
        .filter(|comment| comment.post_id == post_id)
        .ok_or_else(|| ApiError::validation("댓글 정보를 확인할 수 없습니다."))?;

    let selected = selected_author_name(Some(&comment.author_name));
    let profile = state.db.find_profile_by_display_name(&selected).await?;
    let verified = profile.as_ref().map(|p| p.is_verified()).unwrap_or(false);
    let (points, source) = adoption_award(verified);

    state
        .db
        .record_adoption(&AdoptionRecord {
            post_id,
            comment_id,
            adopter_name,
            selected_author_name: selected.clone(),
            profile_id: profile.map(|p| p.id),
            points,
            source,
        })
        .await?;

    let result = AdoptionResult {
        awarded: points,
        selected_author_name: selected,
        adopted_comment_id: comment_id,
    };

    info!("Comment {} adopted, {} points awarded", comment_id, points);
    ok_json(&result)
}
