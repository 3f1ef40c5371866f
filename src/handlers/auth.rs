use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::{generate_jwt, Claims};
use crate::config;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::identity_service::{self, RegisterRequest};
use crate::state::AppState;
use crate::types::{CurrentUser, RequestScope};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    /// Seconds until the token expires
    pub expires_in: u64,
    pub user: CurrentUser,
}

impl TokenResponse {
    fn issue(user: CurrentUser) -> Result<Self, crate::auth::AuthError> {
        let claims = Claims::new(user.id, user.email.clone(), user.tenant_id);
        Ok(Self {
            token: generate_jwt(&claims)?,
            expires_in: config::config().security.jwt_expiry_hours * 3600,
            user,
        })
    }
}

/// POST /auth/local/register
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    let Json(request) = body?;
    let user = identity_service::register_local(&state.pool, request).await?;
    Ok(ApiResponse::created(TokenResponse::issue(user)?))
}

/// POST /auth/local/login
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    let Json(request) = body?;
    let user = identity_service::login_local(&state.pool, &request.email, &request.password).await?;
    tracing::info!("Local login for user {}", user.id);
    Ok(ApiResponse::success(TokenResponse::issue(user)?))
}

/// GET /auth/whoami
pub async fn whoami(Extension(user): Extension<CurrentUser>, Extension(scope): Extension<RequestScope>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "user": user,
        "scope": scope,
    })))
}
