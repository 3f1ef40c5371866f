use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{
    is_identifier, FilterColumn, FilterData, FilterOrderInfo, FilterWhereOptions, SqlResult, TenantOwner,
};

pub struct Filter {
    table_name: String,
    columns: Vec<FilterColumn>,
    select_columns: Vec<FilterColumn>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
    unbounded: bool,
    options: FilterWhereOptions,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            columns: vec![],
            select_columns: vec![],
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
            unbounded: false,
            options: FilterWhereOptions::default(),
        })
    }

    /// Restrict where/order/select to these columns and cast bound
    /// parameters to their SQL types.
    pub fn with_columns(mut self, columns: Vec<FilterColumn>) -> Self {
        self.columns = columns;
        self
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(select) = data.select { self.select(select)?; }
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if let Some(limit) = data.limit { self.limit(limit, data.offset)?; }
        else if let Some(offset) = data.offset { self.offset(offset)?; }
        if let Some(owner) = data.tenant_owner { self.tenant_owner(owner)?; }
        Ok(self)
    }

    /// Keep only rows whose parent belongs to the owner's tenant
    pub fn tenant_owner(&mut self, owner: TenantOwner) -> Result<&mut Self, FilterError> {
        if !is_identifier(owner.column) {
            return Err(FilterError::InvalidColumn(owner.column.to_string()));
        }
        Self::validate_table_name(owner.parent_table)?;
        self.options.tenant_owner = Some(owner);
        Ok(self)
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        let mut selected = Vec::with_capacity(columns.len());
        for name in columns.iter().filter(|c| c.as_str() != "*") {
            let found = self
                .columns
                .iter()
                .find(|c| c.name == name.as_str() || c.column == name.as_str())
                .copied()
                .ok_or_else(|| FilterError::InvalidColumn(name.clone()))?;
            selected.push(found);
        }
        self.select_columns = selected;
        Ok(self)
    }

    /// Merge conditions into the where clause with AND semantics
    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        if conditions.is_null() {
            return Ok(self);
        }
        self.where_data = Some(match self.where_data.take() {
            None => conditions,
            Some(existing) => serde_json::json!({ "$and": [existing, conditions] }),
        });
        Ok(self)
    }

    pub fn order(&mut self, order_value: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_value, &self.columns)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i32, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }

        // Apply max limit from config
        let max_limit = crate::config::CONFIG.filter.max_limit.unwrap_or(i32::MAX);
        let applied_limit = if limit > max_limit {
            if crate::config::CONFIG.filter.debug_logging {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            }
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        if let Some(off) = offset { self.offset(off)?; }
        Ok(self)
    }

    pub fn offset(&mut self, offset: i32) -> Result<&mut Self, FilterError> {
        if offset < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); }
        self.offset = Some(offset);
        Ok(self)
    }

    /// Do not fall back to the configured default limit
    pub fn unbounded(&mut self) -> &mut Self {
        self.unbounded = true;
        self
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let select_clause = self.build_select_clause();
        let where_result = self.to_where_sql()?;
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {}", select_clause),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_result.query),
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    /// Same query with each row folded into one JSON object, keyed by wire name
    pub fn to_json_sql(&self) -> Result<SqlResult, FilterError> {
        let inner = self.to_sql()?;
        Ok(SqlResult {
            query: format!("SELECT row_to_json(r) AS data FROM ({}) r", inner.query),
            params: inner.params,
        })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(self.where_data.as_ref(), &self.columns, 0, &self.options)?;
        Ok(SqlResult { query: where_clause, params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        if name.is_empty() { return Err(FilterError::InvalidTableName("Table name cannot be empty".to_string())); }
        if !is_identifier(name) {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }

    fn build_select_clause(&self) -> String {
        let projected = if self.select_columns.is_empty() { &self.columns } else { &self.select_columns };
        if projected.is_empty() {
            return "*".to_string();
        }
        projected
            .iter()
            .map(|c| format!("\"{}\" AS \"{}\"", c.column, c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn build_limit_clause(&self) -> String {
        let default_limit = if self.unbounded { None } else { crate::config::CONFIG.filter.default_limit };
        let limit = self.limit.or(default_limit);
        match (limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> Vec<FilterColumn> {
        vec![
            FilterColumn::new("id", "id", "integer"),
            FilterColumn::new("tenantId", "tenant_id", "integer"),
            FilterColumn::new("className", "class_name", "text"),
        ]
    }

    #[test]
    fn projects_columns_under_wire_names() {
        let mut filter = Filter::new("class_sections").unwrap().with_columns(columns());
        filter.where_clause(json!({ "tenantId": 2 })).unwrap();
        filter.order(json!("className")).unwrap();
        filter.limit(10, Some(20)).unwrap();

        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"id\" AS \"id\", \"tenant_id\" AS \"tenantId\", \"class_name\" AS \"className\" \
             FROM \"class_sections\" WHERE \"deleted_at\" IS NULL AND \"tenant_id\" = $1::integer \
             ORDER BY \"class_name\" ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params, vec![json!(2)]);
    }

    #[test]
    fn repeated_where_calls_are_conjunctive() {
        let mut filter = Filter::new("class_sections").unwrap().with_columns(columns());
        filter.where_clause(json!({ "tenantId": 2 })).unwrap();
        filter.where_clause(json!({ "id": 5 })).unwrap();

        let sql = filter.to_where_sql().unwrap();
        assert!(sql.query.contains("\"tenant_id\" = $1::integer"));
        assert!(sql.query.contains("\"id\" = $2::integer"));
        assert_eq!(sql.params, vec![json!(2), json!(5)]);
    }

    #[test]
    fn json_wrapper_hides_deleted_rows() {
        let mut filter = Filter::new("class_sections").unwrap().with_columns(columns());
        filter.select(vec!["className".into()]).unwrap();

        let sql = filter.to_json_sql().unwrap();
        assert!(sql.query.starts_with("SELECT row_to_json(r) AS data FROM (SELECT \"class_name\" AS \"className\""));
        assert!(sql.query.contains("WHERE \"deleted_at\" IS NULL"));
    }

    #[test]
    fn tenant_owner_is_appended_after_where_params() {
        let mut filter = Filter::new("app_element_properties").unwrap().with_columns(columns());
        filter
            .assign(FilterData {
                where_clause: Some(json!({ "id": 7 })),
                tenant_owner: Some(TenantOwner { column: "app_element_id", parent_table: "app_elements", tenant_id: 3 }),
                ..Default::default()
            })
            .unwrap();

        let sql = filter.to_where_sql().unwrap();
        assert!(sql.query.ends_with("\"app_element_id\" IN (SELECT id FROM \"app_elements\" WHERE tenant_id = $2::integer)"));
        assert_eq!(sql.params, vec![json!(7), json!(3)]);

        let bad = TenantOwner { column: "x; drop", parent_table: "app_elements", tenant_id: 3 };
        assert!(filter.tenant_owner(bad).is_err());
    }

    #[test]
    fn rejects_bad_names_and_negative_limits() {
        assert!(Filter::new("class_sections; drop").is_err());
        let mut filter = Filter::new("class_sections").unwrap().with_columns(columns());
        assert!(filter.select(vec!["password".into()]).is_err());
        assert!(filter.limit(-1, None).is_err());
        assert!(filter.limit(5, Some(-1)).is_err());
    }
}
