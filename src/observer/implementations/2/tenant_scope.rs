// Ring 2: Security - rows stay inside the request's tenant / app / org
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgConnection;

use crate::database::repository::Repository;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};
use crate::resources::{Owner, ResourceDef, SCOPE_FIELDS};

#[derive(Default)]
pub struct TenantScopeObserver;

#[async_trait]
impl Observer for TenantScopeObserver {
    fn name(&self) -> &'static str {
        "TenantScopeObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Security
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update | Operation::Delete)
    }

    fn applies_to_resource(&self, resource: &ResourceDef) -> bool {
        resource.is_scoped() || resource.owner().is_some()
    }

    fn priority(&self) -> u8 {
        20
    }

    async fn execute(&self, ctx: &mut ObserverContext, conn: &mut PgConnection) -> Result<(), ObserverError> {
        let Some(tenant_id) = ctx.scope.tenant_id else {
            if ctx.actor.is_super_admin() {
                return Ok(());
            }
            return Err(ObserverError::SecurityError(format!(
                "A tenant scope is required to modify {}",
                ctx.resource.name
            )));
        };

        match ctx.resource.owner() {
            Some(owner) => check_owner(ctx, conn, owner, tenant_id).await,
            None => check_scope_fields(ctx, tenant_id),
        }
    }
}

fn check_scope_fields(ctx: &ObserverContext, tenant_id: i32) -> Result<(), ObserverError> {
    for field in SCOPE_FIELDS {
        let Some(expected) = ctx.scope.get(field) else {
            continue;
        };
        if let Some(given) = ctx.record.get(*field).filter(|v| !v.is_null()) {
            if given != &Value::from(expected) {
                return Err(ObserverError::SecurityError(format!(
                    "{} {} is outside the request scope",
                    field, given
                )));
            }
        }
    }

    // Stored rows of another tenant are treated as absent
    if let Some(existing) = &ctx.existing {
        if existing.get("tenantId") != Some(&Value::from(tenant_id)) {
            return Err(not_found(ctx));
        }
    }
    Ok(())
}

/// Rows without a tenant column answer to the tenant of their parent, both
/// the parent they are stored under and the one a write moves them to
async fn check_owner(
    ctx: &ObserverContext,
    conn: &mut PgConnection,
    owner: Owner,
    tenant_id: i32,
) -> Result<(), ObserverError> {
    let stored_parent = ctx.existing.as_ref().and_then(|e| e.get(owner.field.name)).and_then(as_i32);
    if let Some(parent_id) = stored_parent {
        if parent_tenant(conn, owner, parent_id).await? != Some(tenant_id) {
            return Err(not_found(ctx));
        }
    }

    if let Some(parent_id) = ctx.record.get(owner.field.name).and_then(as_i32) {
        if Some(parent_id) != stored_parent && parent_tenant(conn, owner, parent_id).await? != Some(tenant_id) {
            return Err(ObserverError::SecurityError(format!(
                "{} {} is outside the request scope",
                owner.parent.name, parent_id
            )));
        }
    }
    Ok(())
}

async fn parent_tenant(conn: &mut PgConnection, owner: Owner, parent_id: i32) -> Result<Option<i32>, ObserverError> {
    Ok(Repository::new(owner.parent).lookup_tenant(conn, parent_id).await?.flatten())
}

fn not_found(ctx: &ObserverContext) -> ObserverError {
    ObserverError::NotFound(format!("{} {} not found", ctx.resource.name, ctx.record_id.unwrap_or_default()))
}

fn as_i32(value: &Value) -> Option<i32> {
    value.as_i64().and_then(|n| i32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenSource;
    use crate::resources::{self, WriteMode};
    use crate::types::{CurrentUser, RequestScope};
    use serde_json::json;

    fn actor(roles: &[&str]) -> CurrentUser {
        CurrentUser {
            id: 3,
            email: "a@example.com".into(),
            display_name: None,
            tenant_id: Some(1),
            app_id: None,
            org_id: None,
            token_source: TokenSource::Local,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn scope(tenant_id: i32) -> RequestScope {
        RequestScope { tenant_id: Some(tenant_id), app_id: None, org_id: None }
    }

    #[test]
    fn guards_scoped_and_owned_resources_only() {
        let observer = TenantScopeObserver;
        assert!(observer.applies_to_resource(resources::find("Application").unwrap()));
        assert!(observer.applies_to_resource(resources::find("AppElementProperty").unwrap()));
        assert!(observer.applies_to_resource(resources::find("UserLogin").unwrap()));
        assert!(!observer.applies_to_resource(resources::find("ElementType").unwrap()));
    }

    #[test]
    fn scope_fields_must_match() {
        let def = resources::find("Application").unwrap();
        let mut ctx = ObserverContext::create(def, json!({}), scope(1), actor(&["Admin"]));
        ctx.record.insert("tenantId".into(), json!(2));
        assert!(matches!(check_scope_fields(&ctx, 1), Err(ObserverError::SecurityError(_))));

        ctx.record.insert("tenantId".into(), json!(1));
        assert!(check_scope_fields(&ctx, 1).is_ok());
    }

    #[test]
    fn foreign_rows_look_absent() {
        let def = resources::find("Application").unwrap();
        let mut ctx = ObserverContext::update(def, 8, WriteMode::Patch, json!({}), scope(1), actor(&["Admin"]));
        ctx.existing = Some(json!({ "id": 8, "tenantId": 2 }).as_object().cloned().unwrap_or_default());
        assert!(matches!(check_scope_fields(&ctx, 1), Err(ObserverError::NotFound(_))));
    }
}
