// Ring 6: Post-Database - property rows for new AppElement / PageElement instances
use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgConnection;

use crate::database::query_builder::QueryBuilder;
use crate::database::repository::{insert_row, CHILDREN_KEY};
use crate::filter::FilterData;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};
use crate::resources::{self, ResourceDef};
use crate::services::element_service::plan_properties;

/// Instance resource, its property resource, and the property's parent field
const CASCADES: &[(&str, &str, &str)] = &[
    ("AppElement", "AppElementProperty", "appElementId"),
    ("PageElement", "PageElementProperty", "pageElementId"),
];

#[derive(Default)]
pub struct ElementPropertyCascadeObserver;

#[async_trait]
impl Observer for ElementPropertyCascadeObserver {
    fn name(&self) -> &'static str {
        "ElementPropertyCascadeObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::PostDatabase
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        op == Operation::Create
    }

    fn applies_to_resource(&self, resource: &ResourceDef) -> bool {
        CASCADES.iter().any(|(name, ..)| *name == resource.name)
    }

    async fn execute(&self, ctx: &mut ObserverContext, conn: &mut PgConnection) -> Result<(), ObserverError> {
        let Some((_, property_name, parent_field)) = CASCADES.iter().find(|(name, ..)| *name == ctx.resource.name) else {
            return Ok(());
        };
        let row = ctx
            .result
            .as_ref()
            .ok_or_else(|| ObserverError::PipelineError("cascade ran before the row was written".to_string()))?;
        let id = integer(row, "id")
            .ok_or_else(|| ObserverError::PipelineError(format!("{} row has no id", ctx.resource.name)))?;
        let Some(element_type_id) = integer(row, "elementTypeId") else {
            return Ok(());
        };

        let type_properties = select(
            &mut *conn,
            "ElementTypeProperty",
            json!({ "elementTypeId": element_type_id }),
            json!(["sortOrder", "id"]),
        )
        .await?;

        // A PageElement placed from an AppElement inherits its property values
        let overrides = match integer(row, "appElementId") {
            Some(app_element_id) if ctx.resource.name == "PageElement" => {
                select(
                    &mut *conn,
                    "AppElementProperty",
                    json!({ "appElementId": app_element_id }),
                    json!("id"),
                )
                .await?
            }
            _ => Vec::new(),
        };

        let property_def = resource(property_name)?;
        let mut created = Vec::new();
        for planned in plan_properties(&type_properties, &overrides) {
            let values = planned.to_values(parent_field, id, ctx.actor.id);
            created.push(insert_row(&mut *conn, property_def, &values).await?);
        }

        tracing::info!(
            "Created {} {} row(s) for {} {}",
            created.len(), property_name, ctx.resource.name, id
        );

        if let Some(Value::Object(obj)) = ctx.result.as_mut() {
            obj.insert(CHILDREN_KEY.to_string(), Value::Array(created));
        }
        Ok(())
    }
}

fn resource(name: &str) -> Result<&'static ResourceDef, ObserverError> {
    resources::find(name).ok_or_else(|| ObserverError::PipelineError(format!("unknown resource {}", name)))
}

fn integer(row: &Value, field: &str) -> Option<i32> {
    row.get(field).and_then(Value::as_i64).and_then(|n| i32::try_from(n).ok())
}

async fn select(conn: &mut PgConnection, name: &str, where_clause: Value, order: Value) -> Result<Vec<Value>, ObserverError> {
    let filter = FilterData {
        where_clause: Some(where_clause),
        order: Some(order),
        ..Default::default()
    };
    Ok(QueryBuilder::new(resource(name)?)?
        .filter(filter)?
        .unbounded()
        .select_all(conn)
        .await?)
}
