//! Request authentication against the hosted auth service.
//!
//! Tokens are never verified locally: the bearer token is handed to the auth
//! service, which returns the user or rejects it.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use crate::baas::BaasUser;
use crate::error::{ApiError, ADMIN_REQUIRED};
use crate::state::AppState;

/// Token of an `Authorization: Bearer <token>` header. The scheme is matched
/// case-insensitively; blank tokens count as missing.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim().to_string()).filter(|token| !token.is_empty())
}

/// A caller whose bearer token the auth service accepted.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: BaasUser,
    pub access_token: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(ApiError::login_required)?;

        let user = state.baas.get_user(&token).await?.ok_or_else(|| {
            debug!("Bearer token rejected by auth service");
            ApiError::login_required()
        })?;

        Ok(AuthUser { user, access_token: token })
    }
}

/// Admin when a `user_roles` row grants `admin`/`moderator`, or the account
/// email is listed in `ADMIN_EMAILS`.
pub async fn is_admin(state: &AppState, user: &BaasUser) -> Result<bool, ApiError> {
    if state.config.is_admin_email(user.email_or_empty()) {
        return Ok(true);
    }
    state.db.has_admin_role(user.id).await
}

/// An authenticated caller with admin rights.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        if !is_admin(state, &auth.user).await? {
            warn!("Admin access denied for user {}", auth.user.id);
            return Err(ApiError::forbidden(ADMIN_REQUIRED));
        }

        Ok(AdminUser(auth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def".to_string()));
        assert_eq!(bearer_token(&headers("bearer   xyz ")), Some("xyz".to_string()));
        assert_eq!(bearer_token(&headers("BEARER t")), Some("t".to_string()));
    }

    #[test]
    fn test_bearer_token_rejections() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer   ")), None);
    }
}
