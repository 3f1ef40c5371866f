// Ring 1: Input Validation - referenced rows must exist and share the tenant
use async_trait::async_trait;
use sqlx::PgConnection;

use crate::database::repository::Repository;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};
use crate::resources::{self, ValidationErrors};

#[derive(Default)]
pub struct ForeignKeyObserver;

#[async_trait]
impl Observer for ForeignKeyObserver {
    fn name(&self) -> &'static str {
        "ForeignKeyObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    // after field validation has produced ctx.record
    fn priority(&self) -> u8 {
        60
    }

    async fn execute(&self, ctx: &mut ObserverContext, conn: &mut PgConnection) -> Result<(), ObserverError> {
        let mut errors = ValidationErrors::default();
        let caller_tenant = ctx.scope.tenant_id.or(ctx.actor.tenant_id);

        for field in ctx.resource.fields {
            let Some(target_name) = field.references else {
                continue;
            };
            let Some(id) = ctx.record.get(field.name).and_then(|v| v.as_i64()) else {
                continue;
            };
            let target = resources::find(target_name)
                .ok_or_else(|| ObserverError::PipelineError(format!("unknown resource {}", target_name)))?;
            let Ok(id) = i32::try_from(id) else {
                errors.add(field.name, format!("must reference an existing {}", target_name));
                continue;
            };

            let owner = match Repository::new(target).lookup_tenant(&mut *conn, id).await? {
                None => {
                    errors.add(field.name, format!("must reference an existing {}", target_name));
                    continue;
                }
                // a tenant owns itself
                Some(_) if target.name == "Tenant" => Some(id),
                Some(owner) => owner,
            };

            if let (Some(owner), Some(caller)) = (owner, caller_tenant) {
                if owner != caller && !ctx.actor.is_super_admin() {
                    return Err(ObserverError::SecurityError(format!(
                        "{} {} belongs to another tenant",
                        target_name, id
                    )));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}
