// Generic CRUD routes shared by every resource in the registry
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Extension, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::manager::DatabaseError;
use crate::database::Repository;
use crate::error::ApiError;
use crate::handlers::attendance;
use crate::middleware::{ApiResponse, ApiResult};
use crate::observer::ObserverContext;
use crate::resources::{registry::ATTENDANCE, ResourceDef, WriteMode};
use crate::state::AppState;
use crate::types::{CurrentUser, RequestScope};

type Params = Query<HashMap<String, String>>;
type Body = Result<Json<Value>, JsonRejection>;
type Id = Result<Path<i32>, PathRejection>;

/// `/{Name}` and `/{Name}/:id` for one resource
pub fn resource_routes(def: &'static ResourceDef) -> Router<AppState> {
    let list_route = get(
        move |State(state): State<AppState>,
              Extension(scope): Extension<RequestScope>,
              Extension(user): Extension<CurrentUser>,
              Query(params): Params| list(def, state, scope, user, params),
    );
    let collection = if def.name == ATTENDANCE.name {
        list_route.post(attendance::record_attendance)
    } else {
        list_route.post(
            move |State(state): State<AppState>,
                  Extension(scope): Extension<RequestScope>,
                  Extension(user): Extension<CurrentUser>,
                  body: Body| create(def, state, scope, user, body),
        )
    };

    let item = get(
        move |State(state): State<AppState>,
              Extension(scope): Extension<RequestScope>,
              Extension(user): Extension<CurrentUser>,
              id: Id| fetch(def, state, scope, user, id),
    )
    .put(
        move |State(state): State<AppState>,
              Extension(scope): Extension<RequestScope>,
              Extension(user): Extension<CurrentUser>,
              id: Id,
              body: Body| update(def, WriteMode::Replace, state, scope, user, id, body),
    )
    .patch(
        move |State(state): State<AppState>,
              Extension(scope): Extension<RequestScope>,
              Extension(user): Extension<CurrentUser>,
              id: Id,
              body: Body| update(def, WriteMode::Patch, state, scope, user, id, body),
    )
    .delete(
        move |State(state): State<AppState>,
              Extension(scope): Extension<RequestScope>,
              Extension(user): Extension<CurrentUser>,
              id: Id| remove(def, state, scope, user, id),
    );

    Router::new()
        .route(&format!("/{}", def.name), collection)
        .route(&format!("/{}/:id", def.name), item)
}

/// GET /{Name}. With `?id=` the single matching row is returned instead of a list.
async fn list(
    def: &'static ResourceDef,
    state: AppState,
    scope: RequestScope,
    user: CurrentUser,
    params: HashMap<String, String>,
) -> ApiResult<Value> {
    require_tenant(def, &scope, &user)?;
    let single = params.get("id").cloned();
    let mut filter = def.list_filter(&params, &scope)?;
    if let Some(extra) = read_restriction(def, &user, &scope) {
        filter.where_clause = Some(match filter.where_clause.take() {
            None => extra,
            Some(existing) => json!({ "$and": [existing, extra] }),
        });
    }

    let mut conn = state.pool.acquire().await.map_err(DatabaseError::from)?;
    let rows = Repository::new(def).select_any(&mut conn, filter).await?;
    tracing::debug!("Listed {} {} row(s)", rows.len(), def.name);

    match single {
        Some(id) => rows
            .into_iter()
            .next()
            .map(ApiResponse::success)
            .ok_or_else(|| ApiError::not_found(format!("{} {} not found", def.name, id))),
        None => Ok(ApiResponse::success(Value::Array(rows))),
    }
}

/// GET /{Name}/:id, limited to the request scope
async fn fetch(def: &'static ResourceDef, state: AppState, scope: RequestScope, user: CurrentUser, id: Id) -> ApiResult<Value> {
    let Path(id) = id?;
    let params = HashMap::from([("id".to_string(), id.to_string())]);
    list(def, state, scope, user, params).await
}

async fn create(def: &'static ResourceDef, state: AppState, scope: RequestScope, user: CurrentUser, body: Body) -> ApiResult<Value> {
    let Json(body) = body?;
    require_tenant(def, &scope, &user)?;
    let ctx = ObserverContext::create(def, body, scope, user);
    let row = state.pipeline.execute(&state.pool, ctx).await?;
    Ok(ApiResponse::created(row))
}

/// PUT (`Replace`) or PATCH (`Patch`) /{Name}/:id
async fn update(
    def: &'static ResourceDef,
    mode: WriteMode,
    state: AppState,
    scope: RequestScope,
    user: CurrentUser,
    id: Id,
    body: Body,
) -> ApiResult<Value> {
    let Path(id) = id?;
    let Json(body) = body?;
    require_tenant(def, &scope, &user)?;
    let ctx = ObserverContext::update(def, id, mode, body, scope, user);
    let row = state.pipeline.execute(&state.pool, ctx).await?;
    Ok(ApiResponse::success(row))
}

/// DELETE /{Name}/:id marks the row deleted and returns it
async fn remove(def: &'static ResourceDef, state: AppState, scope: RequestScope, user: CurrentUser, id: Id) -> ApiResult<Value> {
    let Path(id) = id?;
    require_tenant(def, &scope, &user)?;
    let ctx = ObserverContext::delete(def, id, scope, user);
    let row = state.pipeline.execute(&state.pool, ctx).await?;
    Ok(ApiResponse::success(row))
}

/// Tenant-bound resources are out of reach without a tenant, short of a SuperAdmin
pub(crate) fn require_tenant(def: &ResourceDef, scope: &RequestScope, user: &CurrentUser) -> Result<(), ApiError> {
    if def.is_tenant_bound() && scope.tenant_id.is_none() && !user.is_super_admin() {
        return Err(ApiError::forbidden(format!("A tenant is required to access {}", def.name)));
    }
    Ok(())
}

/// Read conditions on top of the request scope. Login rows are only
/// visible to their owner short of an Admin; tenants see only themselves.
fn read_restriction(def: &ResourceDef, user: &CurrentUser, scope: &RequestScope) -> Option<Value> {
    match def.name {
        "UserLogin" if !user.is_admin() => Some(json!({ "userId": user.id })),
        "Tenant" if !user.is_super_admin() => scope.tenant_id.map(|tenant_id| json!({ "id": tenant_id })),
        _ => None,
    }
}
