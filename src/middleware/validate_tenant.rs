use axum::{
    extract::{Query, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{App, Organization, Tenant};
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::RequestScope;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScopeQuery {
    tenant_id: Option<i32>,
    app_id: Option<i32>,
    org_id: Option<i32>,
}

/// Resolves `tenantId` / `appId` / `orgId` from the query string (or the
/// `x-tenant-id` / `x-app-id` / `x-org-id` headers) and checks the chain
/// tenant → app → org before storing the [`RequestScope`].
pub async fn validate_tenant_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Query(query) = Query::<ScopeQuery>::try_from_uri(request.uri())
        .map_err(|e| ApiError::bad_request(format!("Invalid scope parameters: {}", e.body_text())))?;

    let requested = RequestScope {
        tenant_id: query.tenant_id.map(Ok).or_else(|| header_id(&headers, "x-tenant-id")).transpose()?,
        app_id: query.app_id.map(Ok).or_else(|| header_id(&headers, "x-app-id")).transpose()?,
        org_id: query.org_id.map(Ok).or_else(|| header_id(&headers, "x-org-id")).transpose()?,
    };

    let scope = resolve_scope(&state.pool, requested).await?;
    tracing::debug!("Request scope: {:?}", scope);
    request.extensions_mut().insert(scope);

    Ok(next.run(request).await)
}

fn header_id(headers: &HeaderMap, name: &str) -> Option<Result<i32, ApiError>> {
    let value = headers.get(name)?;
    Some(
        value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| ApiError::bad_request(format!("{} must be an integer", name))),
    )
}

async fn resolve_scope(pool: &PgPool, requested: RequestScope) -> Result<RequestScope, ApiError> {
    let mut scope = requested;

    if let Some(org_id) = requested.org_id {
        let org = sqlx::query_as::<_, Organization>(
            "SELECT id, tenant_id, app_id, is_active FROM organizations WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(org_id)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| ApiError::not_found(format!("Organization {} not found", org_id)))?;

        check_parent("Organization", org_id, "tenant", org.tenant_id, requested.tenant_id)?;
        check_parent("Organization", org_id, "app", org.app_id, requested.app_id)?;
        scope.tenant_id = Some(org.tenant_id);
        scope.app_id = Some(org.app_id);
    }

    if let Some(app_id) = scope.app_id {
        let app = sqlx::query_as::<_, App>("SELECT id, tenant_id, is_active FROM apps WHERE id = $1 AND deleted_at IS NULL")
            .bind(app_id)
            .fetch_optional(pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| ApiError::not_found(format!("App {} not found", app_id)))?;

        check_parent("App", app_id, "tenant", app.tenant_id, requested.tenant_id)?;
        if app.is_active == Some(false) {
            return Err(ApiError::forbidden(format!("App {} is inactive", app_id)));
        }
        scope.tenant_id = Some(app.tenant_id);
    }

    if let Some(tenant_id) = scope.tenant_id {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT id, name, is_active FROM tenants WHERE id = $1 AND deleted_at IS NULL")
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| ApiError::not_found(format!("Tenant {} not found", tenant_id)))?;

        if tenant.is_active == Some(false) {
            return Err(ApiError::forbidden(format!("Tenant {} is inactive", tenant.name)));
        }
    }

    Ok(scope)
}

/// A child row must sit under the parent the request named, when it named one
fn check_parent(kind: &str, id: i32, parent: &str, actual: i32, requested: Option<i32>) -> Result<(), ApiError> {
    match requested {
        Some(requested) if requested != actual => Err(ApiError::forbidden(format!(
            "{} {} does not belong to {} {}",
            kind, id, parent, requested
        ))),
        _ => Ok(()),
    }
}
