// Ring 0: Data Preparation - loads the stored row and fills scope defaults
use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgConnection;

use crate::database::query_builder::QueryBuilder;
use crate::filter::FilterData;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};
use crate::resources::{WriteMode, SCOPE_FIELDS};

#[derive(Default)]
pub struct DataPreparationObserver;

#[async_trait]
impl Observer for DataPreparationObserver {
    fn name(&self) -> &'static str {
        "DataPreparationObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::DataPreparation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update | Operation::Delete)
    }

    async fn execute(&self, ctx: &mut ObserverContext, conn: &mut PgConnection) -> Result<(), ObserverError> {
        if let Some(id) = ctx.record_id {
            let filter = FilterData {
                where_clause: Some(json!({ "id": id })),
                ..Default::default()
            };
            let existing = QueryBuilder::new(ctx.resource)?
                .filter(filter)?
                .select_optional(conn)
                .await?;

            match existing {
                Some(Value::Object(row)) => ctx.existing = Some(row),
                _ => {
                    return Err(ObserverError::NotFound(format!("{} {} not found", ctx.resource.name, id)));
                }
            }
        }

        if matches!(ctx.mode, WriteMode::Create | WriteMode::Replace) && ctx.operation != Operation::Delete {
            fill_scope_defaults(ctx);
        }

        Ok(())
    }
}

/// Absent `tenantId` / `appId` / `orgId` take the request scope's value
fn fill_scope_defaults(ctx: &mut ObserverContext) {
    let resource = ctx.resource;
    let scope = ctx.scope;
    let Some(body) = ctx.body.as_object_mut() else {
        return;
    };

    for field in SCOPE_FIELDS {
        if resource.field(field).is_none() || body.contains_key(*field) {
            continue;
        }
        if let Some(value) = scope.get(field) {
            tracing::debug!("Filling {}.{} from request scope", resource.name, field);
            body.insert(field.to_string(), Value::from(value));
        }
    }
}
