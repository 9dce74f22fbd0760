// Handlers module
// HTTP handlers for the REST API

pub mod admin;
pub mod auth;
pub mod briefings;
pub mod comments;
pub mod cutoffs;
pub mod exams;
pub mod points;
pub mod posts;
pub mod profile;
pub mod rankings;
pub mod upload;
pub mod verification;

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Liveness probe. Does not touch the store.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe: one round trip to the store.
pub async fn health_check_db(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.db.health_check().await?;

    info!("Database health check passed");
    Ok(Json(json!({ "ok": true, "database": "connected" })))
}

/// `{"ok": true}` merged into the serialized fields of `body`.
pub(crate) fn ok_json<T: Serialize>(body: &T) -> Result<Json<Value>, ApiError> {
    let mut value = serde_json::to_value(body).map_err(|e| ApiError::Internal(e.into()))?;
    if let Value::Object(fields) = &mut value {
        fields.insert("ok".to_string(), Value::Bool(true));
    }
    Ok(Json(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        has_voted: bool,
    }

    #[test]
    fn test_ok_json_merges_flag() {
        let Json(value) = ok_json(&Sample { has_voted: true }).unwrap();
        assert_eq!(value, json!({ "ok": true, "hasVoted": true }));
    }
}
