use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::{BaasClient, BaasError, KeyKind};

const ADMIN_USERS_PAGE_SIZE: usize = 200;
const ADMIN_USERS_MAX_PAGES: usize = 50;

/// A user record as returned by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaasUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
}

impl BaasUser {
    pub fn email_or_empty(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }

    /// Non-empty string metadata value.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn provider(&self) -> &str {
        self.app_metadata
            .get("provider")
            .and_then(Value::as_str)
            .unwrap_or("social")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: BaasUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    Kakao,
    Naver,
    Google,
}

impl SocialProvider {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "kakao" => Some(SocialProvider::Kakao),
            "naver" => Some(SocialProvider::Naver),
            "google" => Some(SocialProvider::Google),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SocialProvider::Kakao => "kakao",
            SocialProvider::Naver => "naver",
            SocialProvider::Google => "google",
        }
    }
}

#[derive(Deserialize)]
struct UserList {
    #[serde(default)]
    users: Vec<BaasUser>,
}

impl BaasClient {
    /// Resolves an access token to its user. Rejected tokens yield `Ok(None)`.
    pub async fn get_user(&self, access_token: &str) -> Result<Option<BaasUser>, BaasError> {
        let token = access_token.trim();
        if token.is_empty() {
            return Ok(None);
        }

        let request = self.get("/auth/v1/user", KeyKind::Anon, Some(token));
        match self.send_json::<BaasUser>(request, "get user").await {
            Ok(user) => Ok(Some(user)),
            Err(BaasError::Api { status, message }) if (400..500).contains(&status) => {
                debug!("Access token rejected (HTTP {}): {}", status, message);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Looks a user up by id with the service role key.
    pub async fn admin_get_user(&self, user_id: Uuid) -> Result<Option<BaasUser>, BaasError> {
        let request = self.get(&format!("/auth/v1/admin/users/{}", user_id), KeyKind::ServiceRole, None);
        match self.send_json::<BaasUser>(request, "admin get user").await {
            Ok(user) => Ok(Some(user)),
            Err(BaasError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Walks the admin user listing looking for an email (case-insensitive).
    /// The auth service has no direct lookup by email.
    pub async fn admin_email_exists(&self, email: &str) -> Result<bool, BaasError> {
        let wanted = email.trim().to_lowercase();

        for page in 1..=ADMIN_USERS_MAX_PAGES {
            let path = format!("/auth/v1/admin/users?page={}&per_page={}", page, ADMIN_USERS_PAGE_SIZE);
            let request = self.get(&path, KeyKind::ServiceRole, None);
            let list: UserList = self.send_json(request, "admin list users").await?;

            let found = list
                .users
                .iter()
                .any(|user| user.email.as_deref().map(str::to_lowercase).as_deref() == Some(wanted.as_str()));
            if found {
                return Ok(true);
            }
            if list.users.len() < ADMIN_USERS_PAGE_SIZE {
                break;
            }
        }

        Ok(false)
    }

    /// Creates a confirmed email/password user carrying the given metadata.
    pub async fn admin_create_user(
        &self,
        email: &str,
        password: &str,
        user_metadata: Value,
    ) -> Result<BaasUser, BaasError> {
        let request = self.post("/auth/v1/admin/users", KeyKind::ServiceRole).json(&json!({
            "email": email,
            "password": password,
            "email_confirm": true,
            "user_metadata": user_metadata,
        }));

        let user: BaasUser = self.send_json(request, "admin create user").await?;
        info!("Created auth user {}", user.id);
        Ok(user)
    }

    /// Password grant. Bad credentials yield `Ok(None)`.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Option<AuthSession>, BaasError> {
        let request = self
            .post("/auth/v1/token?grant_type=password", KeyKind::Anon)
            .json(&json!({ "email": email, "password": password }));

        match self.send_json::<AuthSession>(request, "password grant").await {
            Ok(session) => Ok(Some(session)),
            Err(BaasError::Api { status, message }) if status == 400 || status == 401 => {
                debug!("Password grant rejected: {}", message);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Mails a one-time sign-in code, creating the user when missing.
    pub async fn send_otp(&self, email: &str) -> Result<(), BaasError> {
        let request = self
            .post("/auth/v1/otp", KeyKind::Anon)
            .json(&json!({ "email": email, "create_user": true }));

        self.send(request, "send otp").await?;
        Ok(())
    }

    /// Browser entry point of the provider's OAuth flow.
    pub fn authorize_url(&self, provider: SocialProvider, redirect_to: &str) -> String {
        format!(
            "{}/auth/v1/authorize?provider={}&redirect_to={}",
            self.base_url(),
            provider.as_str(),
            urlencoding::encode(redirect_to)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BaasConfig;
    use std::time::Duration;

    fn client() -> BaasClient {
        BaasClient::new(BaasConfig {
            url: "https://project.supabase.co".to_string(),
            anon_key: "anon".to_string(),
            service_role_key: "service".to_string(),
            storage_bucket: "attachments".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect("client should build")
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!(SocialProvider::parse("kakao"), Some(SocialProvider::Kakao));
        assert_eq!(SocialProvider::parse(" naver "), Some(SocialProvider::Naver));
        assert_eq!(SocialProvider::parse("github"), None);
    }

    #[test]
    fn test_authorize_url() {
        let url = client().authorize_url(
            SocialProvider::Google,
            "https://hapgyeokpan.kr/auth/callback?next=/transfer",
        );
        assert_eq!(
            url,
            "https://project.supabase.co/auth/v1/authorize?provider=google&redirect_to=https%3A%2F%2Fhapgyeokpan.kr%2Fauth%2Fcallback%3Fnext%3D%2Ftransfer"
        );
    }

    #[test]
    fn test_blank_token_skips_the_auth_service() {
        let user = tokio_test::block_on(client().get_user("   "));
        assert!(tokio_test::assert_ok!(user).is_none());
    }

    #[test]
    fn test_user_deserialization() {
        let json = r#"{
            "id": "123e4567-e89b-12d3-a456-426614174000",
            "email": "student@example.com",
            "user_metadata": {"nickname": " 합격생 ", "name": ""},
            "app_metadata": {"provider": "kakao"}
        }"#;
        let user: BaasUser = serde_json::from_str(json).expect("Failed to deserialize user");

        assert_eq!(user.email_or_empty(), "student@example.com");
        assert_eq!(user.metadata_str("nickname"), Some("합격생"));
        assert_eq!(user.metadata_str("name"), None);
        assert_eq!(user.provider(), "kakao");
    }

    #[test]
    fn test_user_without_metadata() {
        let json = r#"{"id": "123e4567-e89b-12d3-a456-426614174000"}"#;
        let user: BaasUser = serde_json::from_str(json).expect("Failed to deserialize user");

        assert_eq!(user.email_or_empty(), "");
        assert_eq!(user.provider(), "social");
    }
}
