// Ring 2: Security - the resource's write role
use async_trait::async_trait;
use sqlx::PgConnection;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};
use crate::resources::{WriteMode, SCOPE_FIELDS};
use crate::types::{CurrentUser, ROLE_ADMIN, ROLE_STAFF, ROLE_SUPER_ADMIN};

/// Fields a user may not change on their own profile
const SELF_LOCKED_FIELDS: &[&str] = &["isActive", "email"];

#[derive(Default)]
pub struct RoleGuardObserver;

#[async_trait]
impl Observer for RoleGuardObserver {
    fn name(&self) -> &'static str {
        "RoleGuardObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Security
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update | Operation::Delete)
    }

    fn priority(&self) -> u8 {
        10
    }

    async fn execute(&self, ctx: &mut ObserverContext, _conn: &mut PgConnection) -> Result<(), ObserverError> {
        let Some(role) = ctx.resource.write_role else {
            return Ok(());
        };
        if holds(&ctx.actor, role) || is_own_profile_patch(ctx) {
            return Ok(());
        }

        tracing::warn!(
            "User {} lacks {} for {:?} on {}",
            ctx.actor.id, role, ctx.operation, ctx.resource.name
        );
        Err(ObserverError::SecurityError(format!(
            "{} role required to modify {}",
            role, ctx.resource.name
        )))
    }
}

fn holds(user: &CurrentUser, role: &str) -> bool {
    match role {
        ROLE_SUPER_ADMIN => user.is_super_admin(),
        ROLE_ADMIN => user.is_admin(),
        ROLE_STAFF => user.is_staff(),
        other => user.has_role(other),
    }
}

/// A user may PATCH their own User row, short of scope and account fields
fn is_own_profile_patch(ctx: &ObserverContext) -> bool {
    ctx.resource.name == "User"
        && ctx.operation == Operation::Update
        && ctx.mode == WriteMode::Patch
        && ctx.record_id == Some(ctx.actor.id)
        && !ctx
            .record
            .keys()
            .any(|k| SCOPE_FIELDS.contains(&k.as_str()) || SELF_LOCKED_FIELDS.contains(&k.as_str()))
}
