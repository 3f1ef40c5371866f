use serde_json::{json, Map, Value};
use sqlx::{PgConnection, Row};

use crate::database::manager::DatabaseError;
use crate::database::query_builder::{bind_param_query, bind_typed, timed, QueryBuilder};
use crate::filter::FilterData;
use crate::resources::{self, ResourceDef};

/// Key child rows are attached under on their parent record
pub const CHILDREN_KEY: &str = "rowFormData";

/// JSON-shaped access to one resource table
pub struct Repository {
    resource: &'static ResourceDef,
}

impl Repository {
    pub fn new(resource: &'static ResourceDef) -> Self {
        Self { resource }
    }

    pub async fn select_any(&self, conn: &mut PgConnection, filter_data: FilterData) -> Result<Vec<Value>, DatabaseError> {
        let mut rows = QueryBuilder::new(self.resource)?.filter(filter_data)?.select_all(&mut *conn).await?;
        self.attach_children(conn, &mut rows).await?;
        Ok(rows)
    }

    /// Whether a live row with this id exists, and its tenant when the
    /// table is tenant-scoped.
    pub async fn lookup_tenant(&self, conn: &mut PgConnection, id: i32) -> Result<Option<Option<i32>>, DatabaseError> {
        let query = if self.resource.is_scoped() {
            format!("SELECT tenant_id FROM \"{}\" WHERE id = $1 AND deleted_at IS NULL", self.resource.table)
        } else {
            format!("SELECT NULL::integer AS tenant_id FROM \"{}\" WHERE id = $1 AND deleted_at IS NULL", self.resource.table)
        };
        let row = timed(self.resource.table, &query, sqlx::query(&query).bind(id).fetch_optional(conn)).await?;
        row.map(|r| r.try_get::<Option<i32>, _>("tenant_id"))
            .transpose()
            .map_err(DatabaseError::from)
    }

    /// Load every child table for the given parents, grouped under `rowFormData`
    async fn attach_children(&self, conn: &mut PgConnection, rows: &mut [Value]) -> Result<(), DatabaseError> {
        let Some(child) = self.resource.children.first() else {
            return Ok(());
        };
        if rows.is_empty() {
            return Ok(());
        }
        let child_def = resources::find(child.resource)
            .ok_or_else(|| DatabaseError::QueryError(format!("unknown child resource {}", child.resource)))?;
        let foreign_key_name = child_def
            .fields
            .iter()
            .find(|f| f.column == child.foreign_key)
            .map(|f| f.name)
            .ok_or_else(|| DatabaseError::QueryError(format!("unknown foreign key {}", child.foreign_key)))?;

        let ids: Vec<Value> = rows.iter().filter_map(|r| r.get("id").cloned()).collect();
        let mut condition = Map::new();
        condition.insert(child.foreign_key.to_string(), json!({ "$in": ids }));
        let filter = FilterData {
            where_clause: Some(Value::Object(condition)),
            order: Some(json!("id")),
            ..Default::default()
        };
        let children = QueryBuilder::new(child_def)?
            .filter(filter)?
            .unbounded()
            .select_all(conn)
            .await?;

        for row in rows.iter_mut() {
            let id = row.get("id").cloned();
            let mine: Vec<Value> = children
                .iter()
                .filter(|c| c.get(foreign_key_name) == id.as_ref())
                .cloned()
                .collect();
            if let Some(obj) = row.as_object_mut() {
                obj.insert(CHILDREN_KEY.to_string(), Value::Array(mine));
            }
        }
        Ok(())
    }
}

/// INSERT the given wire-keyed values and return the new row
pub async fn insert_row(
    conn: &mut PgConnection,
    resource: &'static ResourceDef,
    values: &Map<String, Value>,
) -> Result<Value, DatabaseError> {
    let columns = resource.filter_columns();
    let mut names = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    let mut binds = Vec::with_capacity(values.len());

    for (key, value) in values {
        let column = columns
            .iter()
            .find(|c| c.name == key.as_str())
            .ok_or_else(|| DatabaseError::QueryError(format!("{} has no column for {}", resource.name, key)))?;
        names.push(format!("\"{}\"", column.column));
        placeholders.push(format!("${}::{}", binds.len() + 1, column.sql_type));
        binds.push((value.clone(), column.sql_type));
    }

    let insert = if names.is_empty() {
        format!("INSERT INTO \"{}\" DEFAULT VALUES RETURNING *", resource.table)
    } else {
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *",
            resource.table,
            names.join(", "),
            placeholders.join(", ")
        )
    };
    let query = returning_json(resource, &insert);

    let mut q = sqlx::query(&query);
    for (value, sql_type) in binds {
        q = bind_typed(q, value, sql_type);
    }
    let row = timed(resource.table, &query, q.fetch_one(conn)).await?;
    Ok(row.try_get::<Value, _>("data")?)
}

/// UPDATE the given wire-keyed values on a live row
pub async fn update_row(
    conn: &mut PgConnection,
    resource: &'static ResourceDef,
    id: i32,
    values: &Map<String, Value>,
) -> Result<Value, DatabaseError> {
    let columns = resource.filter_columns();
    let mut sets = Vec::with_capacity(values.len() + 1);
    let mut binds = Vec::with_capacity(values.len());

    for (key, value) in values {
        let column = columns
            .iter()
            .find(|c| c.name == key.as_str())
            .ok_or_else(|| DatabaseError::QueryError(format!("{} has no column for {}", resource.name, key)))?;
        sets.push(format!("\"{}\" = ${}::{}", column.column, binds.len() + 1, column.sql_type));
        binds.push((value.clone(), column.sql_type));
    }
    sets.push("\"updated_at\" = NOW()".to_string());

    let update = format!(
        "UPDATE \"{}\" SET {} WHERE \"id\" = ${} AND \"deleted_at\" IS NULL RETURNING *",
        resource.table,
        sets.join(", "),
        binds.len() + 1
    );
    let query = returning_json(resource, &update);

    let mut q = sqlx::query(&query);
    for (value, sql_type) in binds {
        q = bind_typed(q, value, sql_type);
    }
    q = q.bind(id);

    let row = timed(resource.table, &query, q.fetch_optional(conn)).await?;
    match row {
        Some(row) => Ok(row.try_get::<Value, _>("data")?),
        None => Err(DatabaseError::NotFound(format!("{} {} not found", resource.name, id))),
    }
}

/// Mark a live row deleted and return it
pub async fn soft_delete_row(
    conn: &mut PgConnection,
    resource: &'static ResourceDef,
    id: i32,
    actor: Option<i32>,
) -> Result<Value, DatabaseError> {
    let update = format!(
        "UPDATE \"{}\" SET \"deleted_at\" = NOW(), \"updated_at\" = NOW(), \"updated_by\" = $2::integer \
         WHERE \"id\" = $1 AND \"deleted_at\" IS NULL RETURNING *",
        resource.table
    );
    let query = returning_json(resource, &update);
    let actor = actor.map(Value::from).unwrap_or(Value::Null);

    let q = bind_param_query(sqlx::query(&query).bind(id), actor);
    let row = timed(resource.table, &query, q.fetch_optional(conn)).await?;
    match row {
        Some(row) => Ok(row.try_get::<Value, _>("data")?),
        None => Err(DatabaseError::NotFound(format!("{} {} not found", resource.name, id))),
    }
}

/// Wrap a `... RETURNING *` statement so the row comes back keyed by wire name
fn returning_json(resource: &ResourceDef, statement: &str) -> String {
    let projection = resource
        .filter_columns()
        .iter()
        .map(|c| format!("\"{}\" AS \"{}\"", c.column, c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "WITH changed AS ({}) SELECT row_to_json(r) AS data FROM (SELECT {} FROM changed) r",
        statement, projection
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returning_wraps_statement_with_wire_names() {
        let resource = resources::find("Role").unwrap();
        let sql = returning_json(resource, "DELETE FROM \"roles\" RETURNING *");
        assert!(sql.starts_with("WITH changed AS (DELETE FROM \"roles\" RETURNING *)"));
        assert!(sql.contains("\"role_name\" AS \"roleName\""));
        assert!(sql.contains("\"created_by\" AS \"createdBy\""));
        assert!(sql.ends_with("FROM changed) r"));
    }
}
