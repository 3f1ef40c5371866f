use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;

use super::{AuthError, Identity, TokenSource};

/// Passport profile as serialized by the front-end session layer
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PassportProfile {
    id: serde_json::Value,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    name: Option<PassportName>,
    #[serde(default)]
    emails: Vec<PassportValue>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    photos: Vec<PassportValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PassportName {
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PassportValue {
    value: String,
}

/// Decode a base64 passport payload into an identity
pub fn decode_passport(token: &str) -> Result<Identity, AuthError> {
    let token = token.trim();
    let bytes = [&STANDARD, &STANDARD_NO_PAD, &URL_SAFE, &URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(token).ok())
        .ok_or_else(|| AuthError::InvalidToken("passport token is not valid base64".to_string()))?;

    let profile: PassportProfile = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::InvalidToken(format!("passport payload is not a profile: {}", e)))?;

    let subject = match profile.id {
        serde_json::Value::String(s) if !s.trim().is_empty() => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => return Err(AuthError::InvalidToken("passport profile has no id".to_string())),
    };

    let email = profile
        .emails
        .into_iter()
        .map(|e| e.value)
        .next()
        .or(profile.email)
        .map(|e| e.trim().to_ascii_lowercase());

    let mut identity = Identity::new(TokenSource::Passport, subject);
    identity.email = email;
    identity.display_name = profile.display_name;
    if let Some(name) = profile.name {
        identity.given_name = name.given_name;
        identity.family_name = name.family_name;
    }
    identity.photo_url = profile.photos.into_iter().map(|p| p.value).next();
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_standard_profile() {
        let payload = json!({
            "id": "abc-123",
            "displayName": "Grace Hopper",
            "name": { "givenName": "Grace", "familyName": "Hopper" },
            "emails": [{ "value": "Grace@Example.com" }],
            "photos": [{ "value": "https://example.com/g.png" }]
        });
        let token = STANDARD.encode(payload.to_string());

        let identity = decode_passport(&token).unwrap();
        assert_eq!(identity.source, TokenSource::Passport);
        assert_eq!(identity.subject, "abc-123");
        assert_eq!(identity.email.as_deref(), Some("grace@example.com"));
        assert_eq!(identity.family_name.as_deref(), Some("Hopper"));
        assert_eq!(identity.photo_url.as_deref(), Some("https://example.com/g.png"));
    }

    #[test]
    fn accepts_url_safe_unpadded_and_numeric_id() {
        let payload = json!({ "id": 991, "email": "x@example.com" });
        let token = URL_SAFE_NO_PAD.encode(payload.to_string());

        let identity = decode_passport(&token).unwrap();
        assert_eq!(identity.subject, "991");
        assert_eq!(identity.email.as_deref(), Some("x@example.com"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_passport("%%%"), Err(AuthError::InvalidToken(_))));
        let no_id = STANDARD.encode(json!({ "displayName": "x" }).to_string());
        assert!(decode_passport(&no_id).is_err());
    }
}
