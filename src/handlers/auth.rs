// Auth handlers
// Thin glue over the hosted auth service plus the profile rows it needs

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use crate::baas::{BaasUser, SocialProvider};
use crate::error::ApiError;
use crate::extract::Payload;
use crate::models::auth::{
    build_display_name, fallback_username, normalize_next_path, username_candidates, username_seed,
    validate_email, AvailabilityCheck, CheckAvailabilityRequest, FinalizeRequest, LoginRequest,
    OAuthStartQuery, SendCodeRequest, SessionView, SignupRequest,
};
use crate::models::char_len;
use crate::models::profile::UserView;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "아이디 또는 비밀번호가 올바르지 않습니다.";

/// POST /api/auth/check-availability
pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<CheckAvailabilityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let check = request.check().map_err(ApiError::Validation)?;
    info!("Checking availability of {}", check.stage());

    let available = match &check {
        AvailabilityCheck::Username(username) => state.db.username_owner(username).await?.is_none(),
        AvailabilityCheck::Nickname(nickname) => !state.db.display_name_taken(nickname, None).await?,
        AvailabilityCheck::Email(email) => !state.baas.admin_email_exists(email).await?,
    };

    info!("Availability of {}: {}", check.stage(), available);
    Ok(Json(json!({ "ok": true, "available": available })))
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.config.features.enable_email_auth {
        return Err(ApiError::forbidden("소셜 회원가입으로 이용해 주세요."));
    }

    let account = request.validate().map_err(ApiError::Validation)?;
    info!("Creating account for username: {}", account.username);

    let user = state
        .baas
        .admin_create_user(
            &account.email,
            &account.password,
            json!({ "username": account.username, "nickname": account.nickname }),
        )
        .await?;

    state.db.create_profile(user.id, &account.username, &account.nickname).await?;

    info!("Account created: {}", user.id);
    Ok(Json(json!({ "ok": true })))
}

/// POST /api/auth/login
///
/// Accounts sign in by username; the email needed for the password grant is
/// looked up through the profile's auth user.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (username, password) = request.validate().map_err(ApiError::Validation)?;
    info!("Login attempt for username: {}", username);

    let profile = state.db.find_profile_by_username(&username).await?.ok_or_else(|| {
        info!("Login failed, unknown username: {}", username);
        ApiError::unauthorized(INVALID_CREDENTIALS)
    })?;

    let email = state
        .baas
        .admin_get_user(profile.id)
        .await?
        .and_then(|user| user.email)
        .filter(|email| !email.is_empty())
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    let session = state
        .baas
        .sign_in_with_password(&email, &password)
        .await?
        .ok_or_else(|| {
            info!("Login failed, password rejected for username: {}", username);
            ApiError::unauthorized(INVALID_CREDENTIALS)
        })?;

    let user = UserView {
        id: session.user.id,
        email: session.user.email.clone(),
        nickname: profile.display_name.clone().filter(|name| !name.is_empty()).unwrap_or_else(|| username.clone()),
        username,
    };
    let session = SessionView {
        access_token: session.access_token,
        refresh_token: session.refresh_token,
        expires_at: session.expires_at,
    };

    info!("Login succeeded for user: {}", user.id);
    Ok(Json(json!({ "ok": true, "user": user, "session": session })))
}

/// POST /api/auth/send-code
pub async fn send_code(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<SendCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = validate_email(&request.email).map_err(ApiError::Validation)?;

    state.baas.send_otp(&email).await?;

    info!("Sign-in code sent");
    Ok(Json(json!({ "ok": true })))
}

/// GET /api/auth/oauth/start
///
/// Always answers with a redirect; problems go back to the signup page.
pub async fn oauth_start(State(state): State<Arc<AppState>>, Query(query): Query<OAuthStartQuery>) -> Redirect {
    let site = &state.config.site_url;

    if !state.config.features.enable_social_auth {
        warn!("Social sign-in requested while disabled");
        return Redirect::to(&format!("{}/signup?error=social_disabled", site));
    }

    let Some(provider) = query.provider.as_deref().and_then(SocialProvider::parse) else {
        info!("Rejected OAuth start for provider: {:?}", query.provider);
        return Redirect::to(&format!("{}/signup?error=invalid_provider", site));
    };

    let next = normalize_next_path(query.next.as_deref());
    let callback = format!("{}/auth/callback?next={}", site, urlencoding::encode(&next));

    info!("Starting {} OAuth flow", provider.as_str());
    Redirect::to(&state.baas.authorize_url(provider, &callback))
}

/// POST /api/auth/oauth/finalize
///
/// Makes sure a social account has a profile with a username and display
/// name, keeping whatever the profile already had.
pub async fn oauth_finalize(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<FinalizeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let access_token = request.access_token().map_err(ApiError::Validation)?;

    let user = state
        .baas
        .get_user(&access_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("소셜 인증 사용자 확인 실패"))?;
    info!("Finalizing social sign-in for user: {}", user.id);

    let existing = state.db.find_profile(user.id).await?;

    let username = match existing
        .as_ref()
        .and_then(|profile| profile.username.clone())
        .filter(|username| char_len(username) >= 3)
    {
        Some(username) => username,
        None => find_available_username(&state, &user).await?,
    };

    let display_name = existing
        .as_ref()
        .and_then(|profile| profile.display_name.clone())
        .filter(|name| char_len(name.trim()) >= 2)
        .unwrap_or_else(|| build_display_name(&user.user_metadata, user.email_or_empty(), &username));

    state.db.upsert_profile(user.id, &username, &display_name).await?;

    let view = UserView {
        id: user.id,
        email: Some(user.email_or_empty().to_string()),
        username,
        nickname: display_name,
    };
    let session = request.session(access_token);

    info!("Social sign-in finalized for user: {}", view.id);
    Ok(Json(json!({ "ok": true, "user": view, "session": session })))
}

/// First candidate no other profile holds. Lookup failures skip the
/// candidate instead of failing the sign-in.
async fn find_available_username(state: &AppState, user: &BaasUser) -> Result<String, ApiError> {
    let seed = username_seed(&user.user_metadata, user.email_or_empty(), user.provider(), user.id);

    for candidate in username_candidates(&seed, user.id) {
        match state.db.username_owner(&candidate).await {
            Ok(None) => return Ok(candidate),
            Ok(Some(owner)) if owner == user.id => return Ok(candidate),
            Ok(Some(_)) => continue,
            Err(e) => {
                warn!("Username lookup failed for {}: {}", candidate, e);
                continue;
            }
        }
    }

    Ok(fallback_username(user.id))
}
