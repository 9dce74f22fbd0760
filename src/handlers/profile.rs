use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use tracing::info;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::Payload;
use crate::models::profile::{UpdateProfileRequest, UserView};
use crate::state::AppState;

/// POST /api/profile/update
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Payload(request): Payload<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = request.user_id().map_err(ApiError::Validation)?;
    let nickname = request.nickname().map_err(ApiError::Validation)?;

    if auth.user.id != user_id {
        return Err(ApiError::forbidden("본인 계정만 수정할 수 있습니다."));
    }
    info!("Updating nickname of user: {}", user_id);

    if state.db.display_name_taken(&nickname, Some(user_id)).await? {
        return Err(ApiError::conflict("이미 사용 중인 닉네임입니다."));
    }

    let profile = state.db.update_display_name(user_id, &nickname).await?;

    let user = UserView {
        id: user_id,
        email: None,
        username: profile.as_ref().and_then(|p| p.username.clone()).unwrap_or_default(),
        nickname: profile.and_then(|p| p.display_name).unwrap_or(nickname),
    };

    info!("Nickname updated for user: {}", user_id);
    Ok(Json(json!({ "ok": true, "user": user })))
}
