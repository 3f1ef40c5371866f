use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::services::identity_service;
use crate::state::AppState;
use crate::types::{CurrentUser, RequestScope};

/// Matches the verified identity to a user row (creating it on first
/// login), loads roles and enforces the tenant boundary. Stores the
/// [`CurrentUser`] and the final [`RequestScope`].
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required before user validation"))?;
    let scope = request.extensions().get::<RequestScope>().copied().unwrap_or_default();

    let user = identity_service::resolve_user(&state.pool, &identity, &scope).await?;
    let scope = guard_tenant(&user, scope)?;

    tracing::debug!("User {} ({:?}) acting in {:?}", user.id, user.roles, scope);
    request.extensions_mut().insert(scope);
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Only a SuperAdmin may address a tenant other than their own, and a
/// user without a tenant may address none. An unscoped request falls back
/// to the user's own tenant.
pub fn guard_tenant(user: &CurrentUser, mut scope: RequestScope) -> Result<RequestScope, ApiError> {
    match (user.tenant_id, scope.tenant_id) {
        (own, Some(requested)) if own != Some(requested) && !user.is_super_admin() => {
            tracing::warn!("User {} (tenant {:?}) addressed tenant {}", user.id, own, requested);
            Err(ApiError::forbidden(format!("Access to tenant {} is not allowed", requested)))
        }
        (Some(own), None) => {
            scope.tenant_id = Some(own);
            Ok(scope)
        }
        _ => Ok(scope),
    }
}
