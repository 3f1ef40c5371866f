use serde_json::Value;
use sqlx::{postgres::PgArguments, PgConnection, Postgres, Row};
use std::time::Instant;

use crate::config;
use crate::database::manager::DatabaseError;
use crate::filter::{Filter, FilterData};
use crate::resources::ResourceDef;

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Filtered reads over one resource table, returning each row as a JSON
/// object keyed by wire name.
pub struct QueryBuilder {
    resource: &'static ResourceDef,
    filter: Filter,
}

impl QueryBuilder {
    pub fn new(resource: &'static ResourceDef) -> Result<Self, DatabaseError> {
        let filter = Filter::new(resource.table)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?
            .with_columns(resource.filter_columns());
        Ok(Self { resource, filter })
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, DatabaseError> {
        self.filter
            .assign(filter_data)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(self)
    }

    /// Skip the configured default page size
    pub fn unbounded(mut self) -> Self {
        self.filter.unbounded();
        self
    }

    pub async fn select_all(self, conn: &mut PgConnection) -> Result<Vec<Value>, DatabaseError> {
        let sql = self.filter.to_json_sql().map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        let rows = timed(self.resource.table, &sql.query, bind_all(sqlx::query(&sql.query), &sql.params).fetch_all(conn)).await?;
        rows.iter()
            .map(|row| row.try_get::<Value, _>("data").map_err(DatabaseError::from))
            .collect()
    }

    pub async fn select_optional(self, conn: &mut PgConnection) -> Result<Option<Value>, DatabaseError> {
        Ok(self.select_all(conn).await?.into_iter().next())
    }
}

/// Run a query future, warning when it exceeds the configured threshold
pub async fn timed<T, F>(table: &str, query: &str, fut: F) -> Result<T, DatabaseError>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    let started = Instant::now();
    let result = fut.await;
    let elapsed = started.elapsed().as_millis() as u64;

    let db = &config::config().database;
    if db.enable_slow_query_warning && elapsed > db.slow_query_threshold_ms {
        tracing::warn!("Slow query on {} ({}ms): {}", table, elapsed, query);
    } else {
        tracing::trace!("Query on {} ({}ms)", table, elapsed);
    }
    Ok(result?)
}

pub fn bind_all<'q>(mut q: PgQuery<'q>, params: &[Value]) -> PgQuery<'q> {
    for p in params {
        q = bind_param_query(q, p.clone());
    }
    q
}

/// Bind a JSON value; the placeholder's `::type` cast does the conversion
pub fn bind_param_query(q: PgQuery<'_>, v: Value) -> PgQuery<'_> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // JSONB
        other @ (Value::Array(_) | Value::Object(_)) => q.bind(other),
    }
}

/// Bind a value headed for a column of the given SQL type
pub fn bind_typed<'q>(q: PgQuery<'q>, v: Value, sql_type: &str) -> PgQuery<'q> {
    match (sql_type, v) {
        ("jsonb", Value::Null) => q.bind(None::<Value>),
        ("jsonb", other) => q.bind(other),
        (_, other) => bind_param_query(q, other),
    }
}
