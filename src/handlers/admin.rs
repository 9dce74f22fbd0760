// Admin handlers
// Role bootstrap plus moderation of rankings, cutoffs and verification requests

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use crate::auth::{is_admin, AdminUser, AuthUser};
use crate::catalog::ScopedExam;
use crate::error::ApiError;
use crate::extract::Payload;
use crate::models::auth::{email_local_part, sanitize_username};
use crate::models::cutoff::{exam_or_default, CutoffDeleteRequest, CutoffQuery, CutoffUpsertRequest, CutoffView};
use crate::models::normalize_text;
use crate::models::parse_uuid;
use crate::models::ranking::{aggregate_rankings, AdminRankingView, RankingDeleteRequest, RankingUpsertRequest};
use crate::models::verification::{DecisionRequest, VerificationListQuery};
use crate::state::AppState;

const ADMIN_ROLE: &str = "admin";

/// GET /api/admin/me
pub async fn me(State(state): State<Arc<AppState>>, auth: AuthUser) -> Result<impl IntoResponse, ApiError> {
    let user = &auth.user;
    let admin = is_admin(&state, user).await?;

    Ok(Json(json!({
        "ok": true,
        "user": { "id": user.id, "email": user.email_or_empty() },
        "isAdmin": admin,
        "canBootstrap": state.config.is_admin_email(user.email_or_empty()),
        "adminEmailConfigured": !state.config.admin_emails.is_empty(),
    })))
}

/// Grants the admin role to an account listed in `ADMIN_EMAILS`
/// POST /api/admin/bootstrap
pub async fn bootstrap(State(state): State<Arc<AppState>>, auth: AuthUser) -> Result<impl IntoResponse, ApiError> {
    let user = &auth.user;

    if is_admin(&state, user).await? {
        return Ok(Json(json!({ "ok": true, "isAdmin": true, "upgraded": false })));
    }

    let email = user.email_or_empty();
    if !state.config.is_admin_email(email) {
        warn!("Admin bootstrap refused for user {}", user.id);
        return Err(ApiError::forbidden(
            "관리자 승격 권한이 없습니다. ADMIN_EMAILS 설정을 확인해 주세요.",
        ));
    }

    let local = email_local_part(email);
    let username = sanitize_username(local).unwrap_or_else(|| {
        let id = user.id.simple().to_string();
        format!("user_{}", &id[..8])
    });
    let display_name: String = local.chars().take(30).collect();

    state.db.upsert_profile(user.id, &username, &display_name).await?;
    state.db.grant_role(user.id, ADMIN_ROLE).await?;

    info!("User {} bootstrapped as admin", user.id);
    Ok(Json(json!({ "ok": true, "isAdmin": true, "upgraded": true })))
}

/// Admin routes only serve exams that carry rankings and cutoffs.
fn admin_exam(state: &AppState, slug: &str) -> Result<ScopedExam, ApiError> {
    let exam = ScopedExam::require(slug)?;
    state.gate().ensure_readable(exam.as_str())?;
    Ok(exam)
}

async fn ranking_stats(state: &AppState, exam: ScopedExam) -> Result<Json<serde_json::Value>, ApiError> {
    let seeds = state.db.list_ranking_seeds(exam.as_str(), None).await?;
    let votes = state.db.vote_counts(exam.as_str()).await?;
    let board = aggregate_rankings(seeds, &votes);

    let rankings: Vec<AdminRankingView> = board.entries.iter().map(AdminRankingView::from).collect();

    Ok(Json(json!({
        "ok": true,
        "rankings": rankings,
        "totalVotes": board.total_votes,
    })))
}

/// GET /api/admin/rankings/:exam
pub async fn list_rankings(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(exam_slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let exam = admin_exam(&state, &exam_slug)?;
    info!("Admin {} listing rankings of {}", admin.user.id, exam.as_str());

    ranking_stats(&state, exam).await
}

/// Creates or edits one instructor row
/// POST /api/admin/rankings/:exam
pub async fn upsert_ranking(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(exam_slug): Path<String>,
    Payload(request): Payload<RankingUpsertRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let exam = admin_exam(&state, &exam_slug)?;
    let (subject, instructor_name) = request.validate().map_err(ApiError::Validation)?;

    let existing = state.db.find_ranking_row(exam.as_str(), &subject, &instructor_name).await?;
    let max_rank = state.db.max_rank(exam.as_str()).await?;
    let ranking = request.resolve(subject, instructor_name, existing, max_rank);

    state.db.upsert_ranking(exam.as_str(), &ranking).await?;
    info!(
        "Admin {} saved ranking {}/{} (rank {}, votes {})",
        admin.user.id, ranking.subject, ranking.instructor_name, ranking.rank, ranking.confidence
    );

    ranking_stats(&state, exam).await
}

/// Removes an instructor together with the votes cast for them
/// DELETE /api/admin/rankings/:exam
pub async fn delete_ranking(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(exam_slug): Path<String>,
    Payload(request): Payload<RankingDeleteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let exam = admin_exam(&state, &exam_slug)?;

    let raw_id = normalize_text(&request.id, 80);
    if raw_id.is_empty() {
        return Err(ApiError::validation("삭제할 id가 필요합니다."));
    }
    let id = parse_uuid(&raw_id).ok_or_else(|| ApiError::validation("유효하지 않은 id입니다."))?;

    if state.db.delete_ranking(exam.as_str(), id).await? {
        info!("Admin {} deleted ranking {}", admin.user.id, id);
    } else {
        warn!("Ranking {} not found in {}", id, exam.as_str());
    }

    ranking_stats(&state, exam).await
}

async fn cutoff_list(state: &AppState, exam: ScopedExam) -> Result<Json<serde_json::Value>, ApiError> {
    let cutoffs: Vec<CutoffView> = state
        .db
        .list_cutoffs(exam.as_str())
        .await?
        .into_iter()
        .map(CutoffView::from)
        .collect();

    Ok(Json(json!({ "ok": true, "cutoffs": cutoffs })))
}

/// GET /api/admin/cutoffs?exam=transfer
pub async fn list_cutoffs(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Query(query): Query<CutoffQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let exam = admin_exam(&state, &exam_or_default(&query.exam))?;
    cutoff_list(&state, exam).await
}

/// POST /api/admin/cutoffs
pub async fn upsert_cutoff(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Payload(request): Payload<CutoffUpsertRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let exam = admin_exam(&state, &exam_or_default(&request.exam))?;
    let cutoff = request.validate().map_err(ApiError::Validation)?;

    state.db.upsert_cutoff(exam.as_str(), &cutoff).await?;
    info!(
        "Admin {} saved cutoff {} {} {} ({})",
        admin.user.id, cutoff.university, cutoff.major, cutoff.year, cutoff.result_type
    );

    cutoff_list(&state, exam).await
}

/// DELETE /api/admin/cutoffs
pub async fn delete_cutoff(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Payload(request): Payload<CutoffDeleteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let exam = admin_exam(&state, &exam_or_default(&request.exam))?;
    let id = request.id().map_err(ApiError::Validation)?;

    if state.db.delete_cutoff(exam.as_str(), id).await? {
        info!("Admin {} deleted cutoff {}", admin.user.id, id);
    }

    cutoff_list(&state, exam).await
}

/// GET /api/admin/verifications?status=pending
pub async fn list_verifications(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Query(query): Query<VerificationListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = query.status_filter().map_err(ApiError::Validation)?;
    let requests = state.db.list_verifications(status).await?;

    info!("Retrieved {} verification requests", requests.len());
    Ok(Json(json!({ "ok": true, "requests": requests })))
}

/// Approves or rejects a pending request
/// POST /api/admin/verifications/:id
pub async fn decide_verification(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(request_id): Path<String>,
    Payload(request): Payload<DecisionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let decision = request.decision().map_err(ApiError::Validation)?;
    let id = parse_uuid(&request_id).ok_or_else(|| ApiError::not_found("인증 요청을 찾을 수 없습니다."))?;

    let decided = state.db.decide_verification(id, decision).await?;

    info!("Admin {} marked verification {} as {}", admin.user.id, id, decided.status);
    Ok(Json(json!({ "ok": true, "request": decided })))
}
