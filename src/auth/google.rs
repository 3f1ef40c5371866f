use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::{AuthError, Identity, TokenSource};
use crate::config;

/// Verifies Google ID tokens against the tokeninfo endpoint
#[derive(Clone, Debug)]
pub struct GoogleVerifier {
    client: reqwest::Client,
    tokeninfo_url: String,
    client_id: Option<String>,
}

/// Subset of the tokeninfo response. Google encodes most numbers and
/// booleans as strings here, so those stay loosely typed.
#[derive(Debug, Deserialize)]
pub struct TokenInfo {
    pub sub: String,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub exp: Option<Value>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl GoogleVerifier {
    pub fn new(tokeninfo_url: impl Into<String>, client_id: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            tokeninfo_url: tokeninfo_url.into(),
            client_id,
        }
    }

    pub fn from_config() -> Self {
        let security = &config::config().security;
        Self::new(security.google_tokeninfo_url.clone(), security.google_client_id.clone())
    }

    pub async fn verify(&self, id_token: &str) -> Result<Identity, AuthError> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Google tokeninfo request failed: {}", e);
                AuthError::ProviderUnavailable(e.to_string())
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AuthError::ProviderUnavailable(format!("tokeninfo returned {}", status)));
        }
        if !status.is_success() {
            // Google answers 400 for malformed or expired tokens
            return Err(AuthError::InvalidToken("Google rejected the ID token".to_string()));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidToken(format!("unreadable tokeninfo response: {}", e)))?;

        identity_from_tokeninfo(info, self.client_id.as_deref(), Utc::now().timestamp())
    }
}

/// Apply audience, expiry and verification checks to a tokeninfo payload
pub fn identity_from_tokeninfo(info: TokenInfo, client_id: Option<&str>, now: i64) -> Result<Identity, AuthError> {
    if let Some(expected) = client_id {
        if info.aud.as_deref() != Some(expected) {
            return Err(AuthError::AudienceMismatch);
        }
    }

    if let Some(exp) = info.exp.as_ref().and_then(loose_i64) {
        if exp <= now {
            return Err(AuthError::Expired);
        }
    }

    if info.email.is_some() && !info.email_verified.as_ref().map(loose_bool).unwrap_or(false) {
        return Err(AuthError::EmailNotVerified);
    }

    let mut identity = Identity::new(TokenSource::Google, info.sub);
    identity.email = info.email.map(|e| e.to_ascii_lowercase());
    identity.display_name = info.name;
    identity.given_name = info.given_name;
    identity.family_name = info.family_name;
    identity.photo_url = info.picture;
    Ok(identity)
}

fn loose_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn loose_bool(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
