pub mod google;
pub mod passport;
pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::config;

pub use google::GoogleVerifier;

/// Identity provider named by the `tokensource` request header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    Google,
    Passport,
    Local,
}

impl TokenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSource::Google => "google",
            TokenSource::Passport => "passport",
            TokenSource::Local => "local",
        }
    }
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenSource {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(TokenSource::Google),
            "passport" => Ok(TokenSource::Passport),
            "local" => Ok(TokenSource::Local),
            other => Err(AuthError::UnknownTokenSource(other.to_string())),
        }
    }
}

/// Identity asserted by a verified token, before it is matched to a user row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub source: TokenSource,
    /// Provider-side subject; the user id for local tokens
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub photo_url: Option<String>,
}

impl Identity {
    pub fn new(source: TokenSource, subject: impl Into<String>) -> Self {
        Self {
            source,
            subject: subject.into(),
            email: None,
            display_name: None,
            given_name: None,
            family_name: None,
            photo_url: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing tokensource header")]
    MissingTokenSource,

    #[error("Unsupported token source: {0}")]
    UnknownTokenSource(String),

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    Expired,

    #[error("Token audience does not match this application")]
    AudienceMismatch,

    #[error("Email address has not been verified")]
    EmailNotVerified,

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("JWT secret not configured")]
    SecretNotConfigured,

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

/// Claims carried by locally issued tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i32>,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i32, email: impl Into<String>, tenant_id: Option<i32>) -> Self {
        Self::with_expiry(user_id, email, tenant_id, config::config().security.jwt_expiry_hours)
    }

    pub fn with_expiry(user_id: i32, email: impl Into<String>, tenant_id: Option<i32>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id.to_string(),
            email: email.into(),
            tenant_id,
            jti: Uuid::new_v4().to_string(),
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn user_id(&self) -> Result<i32, AuthError> {
        self.sub
            .parse()
            .map_err(|_| AuthError::InvalidToken("subject is not a user id".to_string()))
    }
}

/// Sign claims with the configured secret
pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    encode_claims(claims, &config::config().security.jwt_secret)
}

/// Verify a locally issued token with the configured secret
pub fn validate_jwt(token: &str) -> Result<Claims, AuthError> {
    decode_claims(token, &config::config().security.jwt_secret)
}

pub fn encode_claims(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::SecretNotConfigured);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::SecretNotConfigured);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidToken(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_source_parses_case_insensitively() {
        assert_eq!("Google".parse::<TokenSource>().unwrap(), TokenSource::Google);
        assert_eq!(" passport ".parse::<TokenSource>().unwrap(), TokenSource::Passport);
        assert_eq!("LOCAL".parse::<TokenSource>().unwrap(), TokenSource::Local);
        assert!(matches!("facebook".parse::<TokenSource>(), Err(AuthError::UnknownTokenSource(s)) if s == "facebook"));
    }

    #[test]
    fn local_token_verifies_with_same_secret() {
        let claims = Claims::with_expiry(42, "staff@example.com", Some(7), 1);
        let token = encode_claims(&claims, "secret-a").unwrap();

        let decoded = decode_claims(&token, "secret-a").unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.user_id().unwrap(), 42);

        assert!(matches!(decode_claims(&token, "secret-b"), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let mut claims = Claims::with_expiry(1, "a@example.com", None, 1);
        claims.exp = Utc::now().timestamp() - 3600;
        claims.iat = claims.exp - 60;
        let token = encode_claims(&claims, "secret").unwrap();
        assert!(matches!(decode_claims(&token, "secret"), Err(AuthError::Expired)));
    }

    #[test]
    fn empty_secret_is_rejected() {
        let claims = Claims::with_expiry(1, "a@example.com", None, 1);
        assert!(matches!(encode_claims(&claims, ""), Err(AuthError::SecretNotConfigured)));
        assert!(matches!(decode_claims("x.y.z", ""), Err(AuthError::SecretNotConfigured)));
    }
}
