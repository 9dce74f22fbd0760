use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{char_len, lenient_string, parse_uuid, trimmed};

pub const VERIFICATION_NONE: &str = "none";

/// Profile entity keyed by the auth user id
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub points: Option<i32>,
    pub verification_level: Option<String>,
}

impl Profile {
    /// Display name, then username, both ignoring blanks.
    pub fn owner_name(&self) -> Option<&str> {
        [self.display_name.as_deref(), self.username.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.verification_level.as_deref(), Some(level) if !level.is_empty() && level != VERIFICATION_NONE)
    }
}

/// Public user shape returned by auth and profile endpoints.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserView {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub username: String,
    pub nickname: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nickname: Option<String>,
}

impl UpdateProfileRequest {
    pub fn user_id(&self) -> Result<Uuid, String> {
        parse_uuid(&trimmed(&self.user_id)).ok_or_else(|| "유효하지 않은 사용자 정보입니다.".to_string())
    }

    pub fn nickname(&self) -> Result<String, String> {
        let nickname = trimmed(&self.nickname);
        validate_nickname(&nickname)?;
        Ok(nickname)
    }
}

/// 2 to 20 characters of Hangul syllables, ASCII letters/digits, `_` or space.
pub fn validate_nickname(nickname: &str) -> Result<(), String> {
    let length = char_len(nickname);
    if length < 2 {
        return Err("닉네임은 2자 이상이어야 합니다.".to_string());
    }
    if length > 20 {
        return Err("닉네임은 20자 이하여야 합니다.".to_string());
    }
    if !nickname.chars().all(is_nickname_char) {
        return Err("닉네임은 한글/영문/숫자/_/공백만 사용할 수 있습니다.".to_string());
    }
    Ok(())
}

fn is_nickname_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ' ' || ('가'..='힣').contains(&c)
}
