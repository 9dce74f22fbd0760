use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{char_len, finite_number, lenient_string, non_empty, trimmed};

const USERNAME_MAX_CHARS: usize = 24;
const USERNAME_SUFFIX_BASE_CHARS: usize = 20;
const USERNAME_ATTEMPTS: usize = 50;
const DISPLAY_NAME_MAX_CHARS: usize = 30;

#[derive(Debug, Default, Deserialize)]
pub struct CheckAvailabilityRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nickname: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
}

/// What an availability check is about; the first non-empty field wins.
#[derive(Debug, Clone, PartialEq)]
pub enum AvailabilityCheck {
    Username(String),
    Nickname(String),
    Email(String),
}

impl AvailabilityCheck {
    pub fn stage(&self) -> &'static str {
        match self {
            AvailabilityCheck::Username(_) => "username",
            AvailabilityCheck::Nickname(_) => "nickname",
            AvailabilityCheck::Email(_) => "email",
        }
    }
}

impl CheckAvailabilityRequest {
    pub fn check(&self) -> Result<AvailabilityCheck, String> {
        if let Some(username) = non_empty(&self.username) {
            return Ok(AvailabilityCheck::Username(username));
        }
        if let Some(nickname) = non_empty(&self.nickname) {
            return Ok(AvailabilityCheck::Nickname(nickname));
        }
        if let Some(email) = non_empty(&self.email) {
            return Ok(AvailabilityCheck::Email(email));
        }
        Err("값이 없습니다.".to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nickname: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub username: String,
    pub nickname: String,
    pub email: String,
    pub password: String,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<NewAccount, String> {
        let username = trimmed(&self.username);
        if char_len(&username) < 3 {
            return Err("아이디는 3자 이상이어야 합니다.".to_string());
        }
        let nickname = trimmed(&self.nickname);
        if char_len(&nickname) < 2 {
            return Err("닉네임은 2자 이상이어야 합니다.".to_string());
        }
        let email = validate_email(&self.email)?;
        // Passwords are taken verbatim.
        let password = self.password.clone().unwrap_or_default();
        if char_len(&password) < 6 {
            return Err("비밀번호는 6자 이상이어야 합니다.".to_string());
        }
        Ok(NewAccount { username, nickname, email, password })
    }
}

/// Trimmed email containing an `@`.
pub fn validate_email(raw: &Option<String>) -> Result<String, String> {
    let email = trimmed(raw);
    if email.is_empty() || !email.contains('@') {
        return Err("이메일 주소가 올바르지 않습니다.".to_string());
    }
    Ok(email)
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(String, String), String> {
        let username = trimmed(&self.username);
        let password = self.password.clone().unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return Err("아이디와 비밀번호를 입력해 주세요.".to_string());
        }
        Ok((username, password))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SendCodeRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OAuthStartQuery {
    pub provider: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub access_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<Value>,
}

impl FinalizeRequest {
    pub fn access_token(&self) -> Result<String, String> {
        non_empty(&self.access_token).ok_or_else(|| "토큰이 없습니다.".to_string())
    }

    /// Echo of the client's session, with `expires_at` kept only when numeric.
    pub fn session(&self, access_token: String) -> SessionView {
        SessionView {
            access_token,
            refresh_token: trimmed(&self.refresh_token),
            expires_at: finite_number(self.expires_at.as_ref()).map(|value| value.round() as i64),
        }
    }
}

/// Session tokens handed back to the client.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionView {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<i64>,
}

/// Keeps `[a-z0-9_]` after lower-casing; `None` when fewer than 3 characters
/// survive. Longer values are cut to 24 characters.
pub fn sanitize_username(value: &str) -> Option<String> {
    let normalized: String = value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();

    if normalized.len() >= 3 {
        Some(normalized.chars().take(USERNAME_MAX_CHARS).collect())
    } else {
        None
    }
}

fn id_prefix(user_id: Uuid, len: usize) -> String {
    user_id.simple().to_string().chars().take(len).collect()
}

/// Usernames to try in order for a new social account: the sanitized seed
/// (or `user_<id8>`), then the seed with `_1` .. `_49` appended.
pub fn username_candidates(seed: &str, user_id: Uuid) -> Vec<String> {
    let base = sanitize_username(seed).unwrap_or_else(|| format!("user_{}", id_prefix(user_id, 8)));
    let stem: String = base.chars().take(USERNAME_SUFFIX_BASE_CHARS).collect();

    std::iter::once(base)
        .chain((1..USERNAME_ATTEMPTS).map(|index| format!("{}_{}", stem, index)))
        .collect()
}

/// Used once every candidate is taken.
pub fn fallback_username(user_id: Uuid) -> String {
    format!("user_{}", id_prefix(user_id, 12))
}

/// Seed for a social account's username: preferred username, email local
/// part, then `<provider>_<id8>`.
pub fn username_seed(metadata: &Map<String, Value>, email: &str, provider: &str, user_id: Uuid) -> String {
    if let Some(preferred) = metadata.get("preferred_username").and_then(Value::as_str) {
        if !preferred.is_empty() {
            return preferred.to_string();
        }
    }
    let local = email_local_part(email);
    if !local.is_empty() {
        return local.to_string();
    }
    format!("{}_{}", provider, id_prefix(user_id, 8))
}

pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or_default()
}

/// Display name from the provider's metadata, falling back to the email
/// local part and then the username. At most 30 characters.
pub fn build_display_name(metadata: &Map<String, Value>, email: &str, fallback_username: &str) -> String {
    let from_metadata = ["nickname", "name", "full_name", "user_name"]
        .iter()
        .filter_map(|key| metadata.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty());

    let chosen = match from_metadata {
        Some(value) => value,
        None if !email.is_empty() => email_local_part(email),
        None => fallback_username,
    };
    chosen.chars().take(DISPLAY_NAME_MAX_CHARS).collect()
}

/// Post-login destination: must be a local absolute path.
pub fn normalize_next_path(value: Option<&str>) -> String {
    match value {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_sanitize_username() {
        assert_eq!(sanitize_username("Hong.Gil-Dong"), Some("honggildong".to_string()));
        assert_eq!(sanitize_username("홍길동"), None);
        assert_eq!(sanitize_username("a_"), None);
        assert_eq!(sanitize_username(&"abc".repeat(10)).map(|s| s.len()), Some(24));
    }

    #[test]
    fn test_username_candidates() {
        let user_id = Uuid::parse_str("0a1b2c3d-4e5f-6789-abcd-ef0123456789").unwrap();
        let candidates = username_candidates("김철수", user_id);

        assert_eq!(candidates.len(), 50);
        assert_eq!(candidates[0], "user_0a1b2c3d");
        assert_eq!(candidates[1], "user_0a1b2c3d_1");
        assert_eq!(candidates[49], "user_0a1b2c3d_49");

        let long = username_candidates("abcdefghijklmnopqrstuvwxyz", user_id);
        assert_eq!(long[0], "abcdefghijklmnopqrstuvwx");
        assert_eq!(long[2], "abcdefghijklmnopqrst_2");

        assert_eq!(fallback_username(user_id), "user_0a1b2c3d4e5f");
    }

    #[test]
    fn test_username_seed() {
        let user_id = Uuid::parse_str("0a1b2c3d-4e5f-6789-abcd-ef0123456789").unwrap();
        let meta = metadata(json!({ "preferred_username": "Kim_Pass" }));
        assert_eq!(username_seed(&meta, "a@b.c", "kakao", user_id), "Kim_Pass");
        assert_eq!(username_seed(&Map::new(), "student@example.com", "kakao", user_id), "student");
        assert_eq!(username_seed(&Map::new(), "", "naver", user_id), "naver_0a1b2c3d");
    }

    #[test]
    fn test_build_display_name() {
        let meta = metadata(json!({ "nickname": " ", "name": " 김합격 ", "full_name": "Kim" }));
        assert_eq!(build_display_name(&meta, "x@y.z", "user1"), "김합격");
        assert_eq!(build_display_name(&Map::new(), "student@example.com", "user1"), "student");
        assert_eq!(build_display_name(&Map::new(), "", "user1"), "user1");

        let long = metadata(json!({ "nickname": "가".repeat(40) }));
        assert_eq!(char_len(&build_display_name(&long, "", "u")), 30);
    }

    #[test]
    fn test_normalize_next_path() {
        assert_eq!(normalize_next_path(Some("/transfer")), "/transfer");
        assert_eq!(normalize_next_path(Some("//evil.com")), "/");
        assert_eq!(normalize_next_path(Some("https://evil.com")), "/");
        assert_eq!(normalize_next_path(None), "/");
    }

    #[test]
    fn test_signup_validation() {
        let request = SignupRequest {
            username: Some("kim".to_string()),
            nickname: Some("김합격".to_string()),
            email: Some("kim@example.com".to_string()),
            password: Some("secret1".to_string()),
        };
        assert!(request.validate().is_ok());

        let short_password = SignupRequest { password: Some("12345".to_string()), ..request };
        assert_eq!(short_password.validate().unwrap_err(), "비밀번호는 6자 이상이어야 합니다.");

        let bad_email = SignupRequest {
            username: Some("kim".to_string()),
            nickname: Some("김합격".to_string()),
            email: Some("kim.example.com".to_string()),
            password: Some("secret1".to_string()),
        };
        assert_eq!(bad_email.validate().unwrap_err(), "이메일 주소가 올바르지 않습니다.");
    }

    #[test]
    fn test_availability_priority() {
        let request: CheckAvailabilityRequest =
            serde_json::from_value(json!({ "nickname": "닉", "email": "a@b.c" })).unwrap();
        assert_eq!(request.check().unwrap(), AvailabilityCheck::Nickname("닉".to_string()));
        assert!(CheckAvailabilityRequest::default().check().is_err());
    }

    #[test]
    fn test_finalize_session_echo() {
        let request: FinalizeRequest = serde_json::from_value(json!({
            "accessToken": " token ",
            "refreshToken": "refresh",
            "expiresAt": "1735689600"
        }))
        .unwrap();
        let token = request.access_token().unwrap();
        let session = request.session(token);

        assert_eq!(session.access_token, "token");
        assert_eq!(session.expires_at, Some(1_735_689_600));

        let missing: FinalizeRequest = serde_json::from_value(json!({ "expiresAt": true })).unwrap();
        assert!(missing.access_token().is_err());
        assert_eq!(missing.session(String::new()).expires_at, None);
    }
}
