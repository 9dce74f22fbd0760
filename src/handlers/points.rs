// Point handlers
// Balance and recent ledger of one community member

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::error::ApiError;
use crate::handlers::ok_json;
use crate::models::parse_uuid;
use crate::models::point::{summarize_ledger, verification_label, PointsQuery, PointsView, LEDGER_LIMIT};
use crate::models::profile::Profile;
use crate::state::AppState;

/// GET /api/points/me?nickname=&userId=
pub async fn my_points(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PointsQuery>,
) -> Result<Json<Value>, ApiError> {
    let nickname = query.nickname();
    let user_id = query.user_id();
    if nickname.is_empty() && user_id.is_empty() {
        return Err(ApiError::validation("nickname 또는 userId가 필요합니다."));
    }

    let profile = find_owner_profile(&state, &user_id, &nickname).await?;
    let owner_name = profile
        .as_ref()
        .and_then(Profile::owner_name)
        .map(str::to_string)
        .unwrap_or(nickname);
    info!("Fetching points of: {}", owner_name);

    let limit = LEDGER_LIMIT as i64;
    let by_profile = match &profile {
        Some(profile) => state.db.ledger_by_profile(profile.id, limit).await?,
        None => Vec::new(),
    };
    let by_name = if owner_name.is_empty() {
        Vec::new()
    } else {
        state.db.ledger_by_receiver(&owner_name, limit).await?
    };

    let cached_points = profile.as_ref().and_then(|p| p.points).map(i64::from);
    let summary = summarize_ledger(by_profile, by_name, cached_points);

    let view = PointsView {
        owner_name,
        points: summary.points,
        verification_level: verification_label(profile.as_ref().and_then(|p| p.verification_level.as_deref())),
        ledger: summary.entries,
    };

    info!("{} has {} points over {} entries", view.owner_name, view.points, view.ledger.len());
    ok_json(&view)
}

/// By id when it parses as a UUID, then by display name, then by username.
async fn find_owner_profile(state: &AppState, user_id: &str, nickname: &str) -> Result<Option<Profile>, ApiError> {
    if let Some(id) = parse_uuid(user_id) {
        if let Some(profile) = state.db.find_profile(id).await? {
            return Ok(Some(profile));
        }
    }

    if nickname.is_empty() {
        return Ok(None);
    }

    if let Some(profile) = state.db.find_profile_by_display_name(nickname).await? {
        return Ok(Some(profile));
    }
    state.db.find_profile_by_username(nickname).await
}
