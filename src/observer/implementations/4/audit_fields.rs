// Ring 4: Enrichment - createdBy / updatedBy from the caller
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgConnection;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

#[derive(Default)]
pub struct AuditFieldsObserver;

#[async_trait]
impl Observer for AuditFieldsObserver {
    fn name(&self) -> &'static str {
        "AuditFieldsObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Enrichment
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    async fn execute(&self, ctx: &mut ObserverContext, _conn: &mut PgConnection) -> Result<(), ObserverError> {
        let actor = Value::from(ctx.actor.id);
        if ctx.operation == Operation::Create {
            ctx.record.insert("createdBy".to_string(), actor.clone());
        }
        ctx.record.insert("updatedBy".to_string(), actor);
        Ok(())
    }
}
