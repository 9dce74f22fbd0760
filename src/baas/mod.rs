//! HTTP client for the hosted auth and storage services.
//!
//! The relational data lives in the same platform's Postgres and is reached
//! through [`crate::db::Database`]; everything that is not plain SQL (token
//! introspection, password grants, user administration, object uploads) goes
//! through the REST endpoints wrapped here.

pub mod auth;
pub mod storage;

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::config::BaasConfig;

pub use auth::{AuthSession, BaasUser, SocialProvider};

#[derive(Debug, Error)]
pub enum BaasError {
    /// The service answered with a non-success status.
    #[error("BaaS API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("BaaS request failed: {0}")]
    Transport(String),

    #[error("BaaS response could not be decoded: {0}")]
    Decode(String),
}

impl BaasError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BaasError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Which key a request is signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Anon,
    ServiceRole,
}

#[derive(Clone)]
pub struct BaasClient {
    http: reqwest::Client,
    config: BaasConfig,
}

impl BaasClient {
    pub fn new(config: BaasConfig) -> Result<Self, BaasError> {
        info!("Creating BaaS client for {}", config.url);

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BaasError::Transport(format!("client build: {e}")))?;

        Ok(BaasClient { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.url
    }

    pub fn bucket(&self) -> &str {
        &self.config.storage_bucket
    }

    fn key(&self, kind: KeyKind) -> &str {
        match kind {
            KeyKind::Anon => &self.config.anon_key,
            KeyKind::ServiceRole => &self.config.service_role_key,
        }
    }

    /// Attaches the `apikey` header plus a bearer: the caller's token when
    /// given, otherwise the key itself.
    fn signed(&self, builder: RequestBuilder, kind: KeyKind, bearer: Option<&str>) -> RequestBuilder {
        let key = self.key(kind);
        builder
            .header("apikey", key)
            .header("Authorization", format!("Bearer {}", bearer.unwrap_or(key)))
    }

    fn get(&self, path: &str, kind: KeyKind, bearer: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.config.url, path);
        self.signed(self.http.get(url), kind, bearer)
    }

    fn post(&self, path: &str, kind: KeyKind) -> RequestBuilder {
        let url = format!("{}{}", self.config.url, path);
        self.signed(self.http.post(url), kind, None)
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response, BaasError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| BaasError::Transport(format!("{what}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BaasError::Api {
                status,
                message: extract_error_message(&body)
                    .unwrap_or_else(|| format!("{what}: HTTP {status}")),
            });
        }

        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T, BaasError> {
        self.send(builder, what)
            .await?
            .json()
            .await
            .map_err(|e| BaasError::Decode(format!("{what}: {e}")))
    }
}

/// Pulls a human readable message out of the service's error bodies, which
/// come as `{"msg"}`, `{"message"}`, `{"error_description"}` or `{"error"}`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"code":422,"msg":"User already registered"}"#),
            Some("User already registered".to_string())
        );
        assert_eq!(
            extract_error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            Some("Invalid login credentials".to_string())
        );
        assert_eq!(
            extract_error_message(r#"{"statusCode":"409","message":"The resource already exists"}"#),
            Some("The resource already exists".to_string())
        );
        assert_eq!(extract_error_message("<html>bad gateway</html>"), None);
        assert_eq!(extract_error_message(r#"{"msg":"  "}"#), None);
    }

    #[test]
    fn test_error_status() {
        let err = BaasError::Api { status: 401, message: "bad jwt".to_string() };
        assert_eq!(err.status(), Some(401));
        assert_eq!(BaasError::Transport("x".to_string()).status(), None);
    }
}
