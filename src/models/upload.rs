use serde::Serialize;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const UPLOAD_PREFIX: &str = "posts";

pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/zip",
    "application/x-zip-compressed",
    "text/plain",
];

#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub url: String,
    pub filename: String,
}

/// Lower-cased extension after the last dot, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_lowercase()).filter(|ext| !ext.is_empty())
}

/// Allowed when the MIME type is on the list, or the file is a `.hwp` document
/// (browsers rarely know its MIME type).
pub fn is_allowed_file(content_type: &str, filename: &str) -> bool {
    ALLOWED_CONTENT_TYPES.contains(&content_type) || file_extension(filename).as_deref() == Some("hwp")
}

pub fn validate_upload(content_type: &str, filename: &str, size: usize) -> Result<(), String> {
    if !is_allowed_file(content_type, filename) {
        return Err("지원하지 않는 파일 형식입니다.".to_string());
    }
    if size > MAX_UPLOAD_BYTES {
        return Err("파일 크기는 5MB 이하여야 합니다.".to_string());
    }
    Ok(())
}

/// Object path `posts/<millis>-<random>.<ext>`. Extensions are reduced to
/// ASCII alphanumerics; anything unusable becomes `jpg`.
pub fn object_path(filename: &str, millis: i64, random: &str) -> String {
    let ext: String = file_extension(filename)
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(10)
        .collect();
    let ext = if ext.is_empty() { "jpg".to_string() } else { ext };

    format!("{}/{}-{}.{}", UPLOAD_PREFIX, millis, random, ext)
}
