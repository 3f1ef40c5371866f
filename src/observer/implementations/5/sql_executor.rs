// Ring 5: Database - INSERT / UPDATE / soft DELETE returning the row
use async_trait::async_trait;
use sqlx::PgConnection;

use crate::database::repository::{insert_row, soft_delete_row, update_row};
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

#[derive(Default)]
pub struct SqlExecutor;

#[async_trait]
impl Observer for SqlExecutor {
    fn name(&self) -> &'static str {
        "SqlExecutor"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Database
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update | Operation::Delete)
    }

    async fn execute(&self, ctx: &mut ObserverContext, conn: &mut PgConnection) -> Result<(), ObserverError> {
        let resource = ctx.resource;
        let row = match (ctx.operation, ctx.record_id) {
            (Operation::Create, _) => insert_row(conn, resource, &ctx.record).await?,
            (Operation::Update, Some(id)) => update_row(conn, resource, id, &ctx.record).await?,
            (Operation::Delete, Some(id)) => soft_delete_row(conn, resource, id, Some(ctx.actor.id)).await?,
            (op, None) => {
                return Err(ObserverError::PipelineError(format!("{:?} on {} requires an id", op, resource.name)));
            }
            (Operation::Select, _) => {
                return Err(ObserverError::PipelineError("SELECT does not run through the pipeline".to_string()));
            }
        };

        tracing::info!("{:?} {} completed", ctx.operation, resource.name);
        ctx.result = Some(row);
        Ok(())
    }
}
