use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$ne")] Ne,
    #[serde(rename = "$gt")] Gt,
    #[serde(rename = "$gte")] Gte,
    #[serde(rename = "$lt")] Lt,
    #[serde(rename = "$lte")] Lte,

    #[serde(rename = "$like")] Like,
    #[serde(rename = "$nlike")] NLike,
    #[serde(rename = "$ilike")] ILike,
    #[serde(rename = "$nilike")] NILike,

    #[serde(rename = "$in")] In,
    #[serde(rename = "$nin")] NIn,

    #[serde(rename = "$between")] Between,
    #[serde(rename = "$null")] Null,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    pub select: Option<Vec<String>>,
    #[serde(rename = "where")]
    pub where_clause: Option<serde_json::Value>,
    pub order: Option<serde_json::Value>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
    /// Set server-side only, never read from a request
    #[serde(skip)]
    pub tenant_owner: Option<TenantOwner>,
}

/// Rows whose tenant is the tenant of a parent row:
/// `column IN (SELECT id FROM parent_table WHERE tenant_id = ?)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantOwner {
    pub column: &'static str,
    pub parent_table: &'static str,
    pub tenant_id: i32,
}

/// A filterable column: wire name, table column and the SQL type
/// bound parameters are cast to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterColumn {
    pub name: &'static str,
    pub column: &'static str,
    pub sql_type: &'static str,
}

impl FilterColumn {
    pub const fn new(name: &'static str, column: &'static str, sql_type: &'static str) -> Self {
        Self { name, column, sql_type }
    }
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub column: String,
    pub cast: Option<&'static str>,
    pub operator: FilterOp,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct FilterWhereOptions {
    pub tenant_owner: Option<TenantOwner>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<serde_json::Value>,
}

/// Identifier check shared by table, column and order validation
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Map a wire name or raw column onto a known column. With no known
/// columns any well-formed identifier passes through uncast.
pub(crate) fn resolve_column(
    columns: &[FilterColumn],
    field: &str,
) -> Result<(String, Option<&'static str>), super::error::FilterError> {
    if columns.is_empty() {
        return if is_identifier(field) {
            Ok((field.to_string(), None))
        } else {
            Err(super::error::FilterError::InvalidColumn(field.to_string()))
        };
    }

    columns
        .iter()
        .find(|c| c.name == field || c.column == field)
        .map(|c| (c.column.to_string(), Some(c.sql_type)))
        .ok_or_else(|| super::error::FilterError::InvalidColumn(field.to_string()))
}
