// Ring 2: Security - only admins decide leave requests
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgConnection;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};
use crate::resources::ResourceDef;

const DECIDED: &[&str] = &["approved", "rejected"];

#[derive(Default)]
pub struct LeaveApprovalObserver;

#[async_trait]
impl Observer for LeaveApprovalObserver {
    fn name(&self) -> &'static str {
        "LeaveApprovalObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Security
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_resource(&self, resource: &ResourceDef) -> bool {
        resource.name == "StaffLeaveRequest"
    }

    fn priority(&self) -> u8 {
        30
    }

    async fn execute(&self, ctx: &mut ObserverContext, _conn: &mut PgConnection) -> Result<(), ObserverError> {
        let Some(status) = ctx.record.get("status").and_then(Value::as_str) else {
            if ctx.record.contains_key("approvedBy") && !ctx.actor.is_admin() {
                return Err(ObserverError::SecurityError("Only an Admin may set approvedBy".to_string()));
            }
            return Ok(());
        };
        if !DECIDED.contains(&status) {
            return Ok(());
        }

        let unchanged = ctx
            .existing
            .as_ref()
            .and_then(|e| e.get("status"))
            .and_then(Value::as_str)
            == Some(status);
        if unchanged && !ctx.record.contains_key("approvedBy") {
            return Ok(());
        }

        if !ctx.actor.is_admin() {
            return Err(ObserverError::SecurityError(format!(
                "Only an Admin may mark a leave request {}",
                status
            )));
        }

        tracing::info!("Leave request {:?} {} by user {}", ctx.record_id, status, ctx.actor.id);
        ctx.record.insert("approvedBy".to_string(), Value::from(ctx.actor.id));
        Ok(())
    }
}
