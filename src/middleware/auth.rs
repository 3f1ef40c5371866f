use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::passport::decode_passport;
use crate::auth::{validate_jwt, AuthError, Identity, TokenSource};
use crate::error::ApiError;
use crate::state::AppState;

pub const TOKEN_SOURCE_HEADER: &str = "tokensource";

/// Verifies the bearer token with the provider named by `tokensource` and
/// stores the resulting [`Identity`] on the request.
pub async fn token_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let source = extract_token_source(&headers)?;
    let token = extract_bearer(&headers)?;

    let identity = match source {
        TokenSource::Google => state.google.verify(token).await?,
        TokenSource::Passport => decode_passport(token)?,
        TokenSource::Local => {
            let claims = validate_jwt(token)?;
            let user_id = claims.user_id()?;
            let mut identity = Identity::new(TokenSource::Local, user_id.to_string());
            identity.email = Some(claims.email);
            identity
        }
    };

    tracing::debug!("Authenticated {} identity {}", identity.source, identity.subject);
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

fn extract_token_source(headers: &HeaderMap) -> Result<TokenSource, AuthError> {
    headers
        .get(TOKEN_SOURCE_HEADER)
        .ok_or(AuthError::MissingTokenSource)?
        .to_str()
        .map_err(|_| AuthError::UnknownTokenSource("<non-ascii>".to_string()))?
        .parse()
}

/// Extract the token from `Authorization: Bearer <token>`
fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Authorization header is not valid text".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or_else(|| AuthError::InvalidToken("Authorization header must use Bearer format".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}
