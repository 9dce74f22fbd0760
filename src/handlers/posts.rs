// Post handlers
// HTTP handlers for board posts and likes

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::REFERER, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::catalog::{board_name, board_post_type, WriteAction};
use crate::error::ApiError;
use crate::extract::Payload;
use crate::models::comment::build_comment_tree;
use crate::models::post::{CreatePostRequest, LikeRequest, PostDetail};
use crate::state::AppState;

/// Create a new post
/// POST /api/posts
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Payload(request): Payload<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let referer = headers.get(REFERER).and_then(|value| value.to_str().ok());
    let (exam_slug, board_slug) = request.board_location(referer).map_err(ApiError::Validation)?;

    state.gate().ensure_writable(&exam_slug, WriteAction::Post)?;
    let post = request.validate().map_err(ApiError::Validation)?;
    info!("Creating post on {}/{} with title: {}", exam_slug, board_slug, post.title);

    let board_id = state.db.ensure_board(&exam_slug, &board_slug).await?;
    let created = state.db.create_post(board_id, &post, board_post_type(&board_slug)).await?;

    info!("Successfully created post with id: {}", created.id);
    Ok(Json(json!({ "ok": true, "post": created })))
}

/// Board listing, newest first
/// GET /api/boards/:exam/:board/posts
pub async fn list_board_posts(
    State(state): State<Arc<AppState>>,
    Path((exam_slug, board_slug)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Fetching posts of board {}/{}", exam_slug, board_slug);
    state.gate().ensure_readable(&exam_slug)?;

    let posts = match state.db.find_board_id(&exam_slug, &board_slug).await? {
        Some(board_id) => state.db.list_board_posts(board_id).await?,
        None => Vec::new(),
    };

    info!("Retrieved {} posts for board {}/{}", posts.len(), exam_slug, board_slug);
    Ok(Json(json!({
        "ok": true,
        "board": { "slug": board_slug, "name": board_name(&exam_slug, &board_slug) },
        "posts": posts,
    })))
}

/// Post detail with its comment tree
/// GET /api/boards/:exam/:board/posts/:post_id
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path((exam_slug, board_slug, post_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Fetching post {} on {}/{}", post_id, exam_slug, board_slug);
    state.gate().ensure_readable(&exam_slug)?;

    let not_found = || ApiError::not_found("게시글을 찾을 수 없습니다.");
    let post_id = Uuid::parse_str(&post_id).map_err(|_| not_found())?;
    let board_id = state.db.find_board_id(&exam_slug, &board_slug).await?.ok_or_else(not_found)?;

    state.db.increment_view_count(post_id).await;

    let post = state.db.get_board_post(board_id, post_id).await?.ok_or_else(not_found)?;
    let comments = state.db.list_comments(post_id).await?;
    let like_count = state.db.count_likes(post_id).await?;
    let adopted_comment_id = state.db.adopted_comment_id(post_id).await?;

    let detail = PostDetail {
        post,
        comments: build_comment_tree(comments),
        like_count,
        adopted_comment_id,
    };

    Ok(Json(json!({ "ok": true, "post": detail })))
}

/// Toggle a like
/// POST /api/posts/like
pub async fn toggle_like(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<LikeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = request
        .post_id()
        .ok_or_else(|| ApiError::validation("게시글 정보가 올바르지 않습니다."))?;
    let user_id = request.user_id().ok_or_else(ApiError::login_required)?;

    let context = state
        .db
        .find_post_context(post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("게시글 정보를 확인할 수 없습니다."))?;
    state.gate().ensure_writable(&context.exam_slug, WriteAction::Like)?;

    let liked = state.db.toggle_like(context.id, user_id).await?;

    info!("Like on post {} is now {}", context.id, liked);
    Ok(Json(json!({ "ok": true, "liked": liked })))
}
