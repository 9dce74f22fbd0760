use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio_postgres::error::SqlState;

use crate::baas::BaasError;

pub const GENERIC_SERVER_ERROR: &str = "서버 오류가 발생했습니다.";
pub const LOGIN_REQUIRED: &str = "로그인이 필요합니다.";
pub const ADMIN_REQUIRED: &str = "관리자 권한이 필요합니다.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// The store rejected the query or mutation. Its message is surfaced as-is.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        details: Option<Value>,
    },

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn login_required() -> Self {
        Self::Unauthorized(LOGIN_REQUIRED.to_string())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            details: None,
        }
    }

    /// Conflict whose object `details` are merged into the response body.
    pub fn conflict_with(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Store(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Store(_) => "STORE_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn body(&self) -> Value {
        let message = match self {
            ApiError::Validation(message)
            | ApiError::Store(message)
            | ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message)
            | ApiError::Unavailable(message) => message.clone(),
            ApiError::Conflict { message, .. } => message.clone(),
            ApiError::Internal(_) => GENERIC_SERVER_ERROR.to_string(),
        };

        let mut body = Map::new();
        body.insert("ok".to_string(), Value::Bool(false));
        body.insert("code".to_string(), json!(self.code()));
        body.insert("error".to_string(), Value::String(message));

        if let ApiError::Conflict { details: Some(Value::Object(extra)), .. } = self {
            for (key, value) in extra {
                body.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        Value::Object(body)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(message) => tracing::error!("Store rejected request: {}", message),
            ApiError::Unavailable(message) => tracing::error!("Upstream unavailable: {}", message),
            ApiError::Internal(err) => tracing::error!("Internal server error: {:#}", err),
            ApiError::Validation(message) => tracing::debug!("Validation error: {}", message),
            ApiError::Unauthorized(message) | ApiError::Forbidden(message) => {
                tracing::debug!("Access denied: {}", message)
            }
            ApiError::NotFound(message) => tracing::debug!("Resource not found: {}", message),
            ApiError::Conflict { message, .. } => tracing::debug!("Conflict: {}", message),
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}

// PostgreSQL error mapping
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.code() {
            Some(&SqlState::UNIQUE_VIOLATION) => {
                let message = err
                    .as_db_error()
                    .map(|db| db.message().to_string())
                    .unwrap_or_else(|| "이미 존재하는 항목입니다.".to_string());
                ApiError::conflict(message)
            }
            Some(&SqlState::CONNECTION_EXCEPTION)
            | Some(&SqlState::CONNECTION_DOES_NOT_EXIST)
            | Some(&SqlState::CONNECTION_FAILURE)
            | Some(&SqlState::SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION) => {
                tracing::error!("PostgreSQL connection error: {}", err);
                ApiError::Unavailable("데이터베이스에 연결할 수 없습니다.".to_string())
            }
            _ => match err.as_db_error() {
                Some(db) => ApiError::Store(db.message().to_string()),
                None if err.is_closed() => {
                    ApiError::Unavailable("데이터베이스 연결이 종료되었습니다.".to_string())
                }
                None => ApiError::Internal(anyhow::Error::new(err)),
            },
        }
    }
}

// Connection pool error mapping
impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Timeout(_) => {
                tracing::warn!("Database connection pool timeout: {}", err);
                ApiError::Unavailable("데이터베이스 연결 대기 시간이 초과되었습니다.".to_string())
            }
            deadpool_postgres::PoolError::Closed => {
                tracing::error!("Database connection pool is closed: {}", err);
                ApiError::Unavailable("데이터베이스 서비스를 사용할 수 없습니다.".to_string())
            }
            deadpool_postgres::PoolError::NoRuntimeSpecified => {
                ApiError::Internal(anyhow::anyhow!("Database pool runtime error: {}", err))
            }
            _ => {
                tracing::error!("Database connection pool error: {}", err);
                ApiError::Unavailable("데이터베이스에 연결할 수 없습니다.".to_string())
            }
        }
    }
}

impl From<BaasError> for ApiError {
    fn from(err: BaasError) -> Self {
        match err {
            BaasError::Api { message, .. } => ApiError::Store(message),
            BaasError::Transport(message) => ApiError::Unavailable(message),
            BaasError::Decode(message) => {
                ApiError::Internal(anyhow::anyhow!("BaaS response decode failed: {}", message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::store("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::login_required().status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_error_hides_details() {
        let body = ApiError::Internal(anyhow::anyhow!("secret stack")).body();
        assert_eq!(body["ok"], json!(false));
        assert_eq!(body["code"], json!("INTERNAL_ERROR"));
        assert_eq!(body["error"], json!(GENERIC_SERVER_ERROR));
    }

    #[test]
    fn test_store_error_surfaces_message() {
        let body = ApiError::store("duplicate key value violates unique constraint").body();
        assert_eq!(body["code"], json!("STORE_ERROR"));
        assert_eq!(body["error"], json!("duplicate key value violates unique constraint"));
    }

    #[test]
    fn test_conflict_details_are_merged() {
        let err = ApiError::conflict_with(
            "이미 투표를 완료했습니다. (김강사)",
            json!({ "instructorName": "김강사", "error": "ignored" }),
        );
        let body = err.body();
        assert_eq!(body["instructorName"], json!("김강사"));
        assert_eq!(body["error"], json!("이미 투표를 완료했습니다. (김강사)"));
    }

    #[test]
    fn test_baas_error_mapping() {
        let err: ApiError = BaasError::Api { status: 422, message: "User already registered".to_string() }.into();
        assert!(matches!(err, ApiError::Store(ref m) if m == "User already registered"));

        let err: ApiError = BaasError::Transport("timed out".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
