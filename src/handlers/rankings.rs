// Ranking handlers
// Instructor popularity board and one-vote-per-user ballots

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::catalog::resolve_vote_exam;
use crate::error::ApiError;
use crate::extract::Payload;
use crate::handlers::ok_json;
use crate::models::ranking::{aggregate_rankings, RankingView, VoteRequest, VoteStatus};
use crate::state::AppState;

const PUBLIC_RANKING_LIMIT: i64 = 100;

/// GET /api/rankings/:exam
pub async fn get_rankings(
    State(state): State<Arc<AppState>>,
    Path(exam_slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let exam_slug = exam_slug.trim().to_string();
    if exam_slug.is_empty() {
        return Err(ApiError::validation("exam 파라미터가 필요합니다."));
    }
    state.gate().ensure_readable(&exam_slug)?;
    info!("Aggregating rankings for exam: {}", exam_slug);

    let seeds = state.db.list_ranking_seeds(&exam_slug, Some(PUBLIC_RANKING_LIMIT)).await?;
    let votes = state.db.vote_counts(&exam_slug).await?;
    let board = aggregate_rankings(seeds, &votes);

    let rankings: Vec<RankingView> = board.entries.iter().map(RankingView::from).collect();

    info!("Ranked {} instructors over {} votes", rankings.len(), board.total_votes);
    Ok(Json(json!({
        "ok": true,
        "source": "db",
        "totalVotes": board.total_votes,
        "rankings": rankings,
    })))
}

/// GET /api/rankings/:exam/vote
pub async fn get_vote_status(
    State(state): State<Arc<AppState>>,
    Path(exam_slug): Path<String>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let exam = resolve_vote_exam(&exam_slug)?;
    state.gate().ensure_readable(exam.as_str())?;

    let status = state.db.vote_status(exam.as_str(), &auth.user.id.to_string()).await?;

    info!("Vote status of user {} in {}: {}", auth.user.id, exam.as_str(), status.has_voted);
    ok_json(&status)
}

/// POST /api/rankings/:exam/vote
pub async fn cast_vote(
    State(state): State<Arc<AppState>>,
    Path(exam_slug): Path<String>,
    auth: AuthUser,
    Payload(request): Payload<VoteRequest>,
) -> Result<Json<Value>, ApiError> {
    let exam = resolve_vote_exam(&exam_slug)?;
    state.gate().ensure_readable(exam.as_str())?;

    let instructor_name = request.validate().map_err(ApiError::Validation)?;
    let voter = auth.user.id.to_string();
    info!("User {} voting for {} in {}", voter, instructor_name, exam.as_str());

    if !state.db.instructor_exists(exam.as_str(), &instructor_name).await? {
        return Err(ApiError::validation("투표 가능한 강사가 아닙니다."));
    }

    let status = state.db.vote_status(exam.as_str(), &voter).await?;
    if status.has_voted {
        return already_voted(status, &instructor_name);
    }

    match state.db.insert_vote(exam.as_str(), &instructor_name, &voter).await {
        Ok(()) => {}
        Err(ApiError::Conflict { .. }) => {
            // Another request from the same voter got in first.
            warn!("Concurrent vote detected for user {}", voter);
            let status = state.db.vote_status(exam.as_str(), &voter).await?;
            return already_voted(status, &instructor_name);
        }
        Err(e) => return Err(e),
    }

    info!("Vote recorded for {} in {}", instructor_name, exam.as_str());
    Ok(Json(json!({
        "ok": true,
        "alreadyVoted": false,
        "instructorName": instructor_name,
    })))
}

/// Same instructor again is an idempotent success; a different one conflicts.
fn already_voted(status: VoteStatus, requested: &str) -> Result<Json<Value>, ApiError> {
    let voted_for = status.instructor_name.unwrap_or_default();

    if voted_for == requested {
        return Ok(Json(json!({
            "ok": true,
            "alreadyVoted": true,
            "instructorName": voted_for,
            "votedAt": status.voted_at,
        })));
    }

    Err(ApiError::conflict_with(
        format!("이미 투표를 완료했습니다. ({})", voted_for),
        json!({ "instructorName": voted_for, "votedAt": status.voted_at }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::{DateTime, Utc};

    fn status(name: &str) -> VoteStatus {
        VoteStatus {
            has_voted: true,
            instructor_name: Some(name.to_string()),
            voted_at: Some(DateTime::parse_from_rfc3339("2025-05-01T12:00:00Z").unwrap().with_timezone(&Utc)),
        }
    }

    #[test]
    fn test_same_instructor_is_idempotent() {
        let Json(body) = already_voted(status("김강사"), "김강사").unwrap();
        assert_eq!(body["alreadyVoted"], json!(true));
        assert_eq!(body["votedAt"], json!("2025-05-01T12:00:00Z"));
    }

    #[test]
    fn test_other_instructor_conflicts() {
        let err = already_voted(status("김강사"), "이강사").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(matches!(
            err,
            ApiError::Conflict { ref message, details: Some(ref details) }
                if message.contains("김강사") && details["instructorName"] == json!("김강사")
        ));
    }
}
