use serde_json::Value;

use super::error::FilterError;
use super::types::{resolve_column, FilterColumn, FilterOp, FilterWhereInfo, FilterWhereOptions};

/// Compiles a JSON where-clause into a parameterised SQL predicate.
/// Nested `$and` / `$or` / `$not` groups share one parameter list so
/// placeholders stay numbered across the whole clause.
pub struct FilterWhere<'a> {
    columns: &'a [FilterColumn],
    param_values: Vec<Value>,
    param_offset: usize,
}

impl<'a> FilterWhere<'a> {
    pub fn new(columns: &'a [FilterColumn], starting_param_index: usize) -> Self {
        Self {
            columns,
            param_values: vec![],
            param_offset: starting_param_index,
        }
    }

    pub fn generate(
        where_data: Option<&Value>,
        columns: &'a [FilterColumn],
        starting_param_index: usize,
        options: &FilterWhereOptions,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(columns, starting_param_index);

        let mut sql_conditions = vec!["\"deleted_at\" IS NULL".to_string()];
        if let Some(data) = where_data.filter(|d| !d.is_null()) {
            sql_conditions.extend(filter_where.parse_group(data)?);
        }
        if let Some(owner) = &options.tenant_owner {
            let placeholder = filter_where.param(Value::from(owner.tenant_id), Some("integer"));
            sql_conditions.push(format!(
                "\"{}\" IN (SELECT id FROM \"{}\" WHERE tenant_id = {})",
                owner.column, owner.parent_table, placeholder
            ));
        }

        let where_clause = sql_conditions.join(" AND ");
        Ok((where_clause, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn parse_group(&mut self, where_data: &Value) -> Result<Vec<String>, FilterError> {
        let obj = where_data
            .as_object()
            .ok_or_else(|| FilterError::InvalidWhereClause("WHERE must be an object".to_string()))?;

        let mut conditions = Vec::new();
        for (key, value) in obj {
            if key.starts_with('$') {
                conditions.push(self.parse_logical_operator(key, value)?);
            } else {
                conditions.extend(self.parse_field_condition(key, value)?);
            }
        }
        Ok(conditions)
    }

    fn parse_logical_operator(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    return Ok(if op == "$and" { "1=1" } else { "1=0" }.to_string());
                }
                let mut sql_parts = Vec::with_capacity(arr.len());
                for v in arr {
                    let conditions = self.parse_group(v)?;
                    sql_parts.push(Self::wrap(conditions));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", sql_parts.join(joiner)))
            }
            "$not" => {
                let conditions = self.parse_group(value)?;
                Ok(format!("NOT {}", Self::wrap(conditions)))
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn wrap(conditions: Vec<String>) -> String {
        if conditions.is_empty() {
            "(1=1)".to_string()
        } else {
            format!("({})", conditions.join(" AND "))
        }
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<Vec<String>, FilterError> {
        let (column, cast) = resolve_column(self.columns, field)?;

        match value {
            Value::Object(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) => {
                let mut out = Vec::with_capacity(obj.len());
                for (op_key, op_val) in obj {
                    let operator = Self::map_operator(op_key)?;
                    let info = FilterWhereInfo { column: column.clone(), cast, operator, data: op_val.clone() };
                    out.push(self.build_sql_condition(&info)?);
                }
                Ok(out)
            }
            // Implicit equality: { field: value }
            _ => {
                let info = FilterWhereInfo { column, cast, operator: FilterOp::Eq, data: value.clone() };
                Ok(vec![self.build_sql_condition(&info)?])
            }
        }
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$nlike" => FilterOp::NLike,
            "$ilike" => FilterOp::ILike,
            "$nilike" => FilterOp::NILike,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$between" => FilterOp::Between,
            "$null" => FilterOp::Null,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", condition.column);
        let cast = condition.cast;
        let data = &condition.data;

        Ok(match condition.operator {
            FilterOp::Eq if data.is_null() => format!("{} IS NULL", quoted_column),
            FilterOp::Eq => format!("{} = {}", quoted_column, self.param(data.clone(), cast)),
            FilterOp::Ne if data.is_null() => format!("{} IS NOT NULL", quoted_column),
            FilterOp::Ne => format!("{} <> {}", quoted_column, self.param(data.clone(), cast)),
            FilterOp::Gt => format!("{} > {}", quoted_column, self.param(data.clone(), cast)),
            FilterOp::Gte => format!("{} >= {}", quoted_column, self.param(data.clone(), cast)),
            FilterOp::Lt => format!("{} < {}", quoted_column, self.param(data.clone(), cast)),
            FilterOp::Lte => format!("{} <= {}", quoted_column, self.param(data.clone(), cast)),

            // Pattern matches compare as text whatever the column type
            FilterOp::Like => format!("{}::text LIKE {}", quoted_column, self.param(data.clone(), Some("text"))),
            FilterOp::NLike => format!("{}::text NOT LIKE {}", quoted_column, self.param(data.clone(), Some("text"))),
            FilterOp::ILike => format!("{}::text ILIKE {}", quoted_column, self.param(data.clone(), Some("text"))),
            FilterOp::NILike => format!("{}::text NOT ILIKE {}", quoted_column, self.param(data.clone(), Some("text"))),

            FilterOp::In | FilterOp::NIn => {
                let negate = condition.operator == FilterOp::NIn;
                match data {
                    Value::Array(values) if values.is_empty() => {
                        if negate { "1=1".to_string() } else { "1=0".to_string() }
                    }
                    Value::Array(values) => {
                        let params: Vec<String> = values.iter().map(|v| self.param(v.clone(), cast)).collect();
                        let keyword = if negate { "NOT IN" } else { "IN" };
                        format!("{} {} ({})", quoted_column, keyword, params.join(", "))
                    }
                    single => {
                        let op = if negate { "<>" } else { "=" };
                        format!("{} {} {}", quoted_column, op, self.param(single.clone(), cast))
                    }
                }
            }

            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => format!(
                    "{} BETWEEN {} AND {}",
                    quoted_column,
                    self.param(values[0].clone(), cast),
                    self.param(values[1].clone(), cast)
                ),
                _ => return Err(FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string())),
            },

            FilterOp::Null => match data.as_bool() {
                Some(true) => format!("{} IS NULL", quoted_column),
                Some(false) => format!("{} IS NOT NULL", quoted_column),
                None => return Err(FilterError::InvalidOperatorData("$null requires true or false".to_string())),
            },
        })
    }

    fn param(&mut self, value: Value, cast: Option<&'static str>) -> String {
        self.param_values.push(value);
        let index = self.param_offset + self.param_values.len();
        match cast {
            Some(sql_type) => format!("${}::{}", index, sql_type),
            None => format!("${}", index),
        }
    }
}
