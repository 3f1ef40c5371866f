// Ring 1: Input Validation - types, required fields, unknown and system fields
use async_trait::async_trait;
use sqlx::PgConnection;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

#[derive(Default)]
pub struct FieldValidationObserver;

#[async_trait]
impl Observer for FieldValidationObserver {
    fn name(&self) -> &'static str {
        "FieldValidationObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn priority(&self) -> u8 {
        10
    }

    async fn execute(&self, ctx: &mut ObserverContext, _conn: &mut PgConnection) -> Result<(), ObserverError> {
        ctx.record = ctx.resource.validate(&ctx.body, ctx.mode)?;
        tracing::debug!("Validated {} field(s) for {}", ctx.record.len(), ctx.resource.name);
        Ok(())
    }
}
