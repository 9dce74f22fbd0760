use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::ok_json;
use crate::models::upload::{object_path, validate_upload, UploadResult};
use crate::state::AppState;

const FILE_FIELD: &str = "file";

/// Stores one attachment in the public bucket
/// POST /api/upload (multipart, field `file`)
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Malformed multipart body: {}", e);
        ApiError::validation("파일이 없습니다.")
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::validation("파일 크기는 5MB 이하여야 합니다."))?;

        file = Some((filename, content_type, bytes));
        break;
    }

    let (filename, content_type, bytes) = file.ok_or_else(|| ApiError::validation("파일이 없습니다."))?;
    validate_upload(&content_type, &filename, bytes.len()).map_err(ApiError::Validation)?;

    let random = Uuid::new_v4().simple().to_string();
    let path = object_path(&filename, Utc::now().timestamp_millis(), &random[..8]);
    info!("Uploading {} ({} bytes, {}) to {}", filename, bytes.len(), content_type, path);

    let stored_type = if content_type.is_empty() { "application/octet-stream" } else { content_type.as_str() };
    state.baas.upload_object(&path, bytes.to_vec(), stored_type).await?;

    let result = UploadResult {
        url: state.baas.public_object_url(&path),
        filename,
    };

    info!("Upload stored at {}", result.url);
    ok_json(&result)
}
