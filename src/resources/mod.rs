//! Static resource definitions and the field-level validation shared by
//! every generic CRUD route.

pub mod registry;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::filter::{FilterColumn, FilterData, FilterError, TenantOwner};
use crate::types::RequestScope;

pub use registry::{find, RESOURCES};

/// Wire names of columns every table carries and clients never write
pub const SYSTEM_FIELDS: &[&str] = &["id", "createdAt", "updatedAt", "deletedAt", "createdBy", "updatedBy"];

/// Wire names of the three scoping columns
pub const SCOPE_FIELDS: &[&str] = &["tenantId", "appId", "orgId"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Text with an optional maximum length in characters
    Text(Option<usize>),
    Integer,
    Decimal,
    Boolean,
    /// `YYYY-MM-DD`
    Date,
    /// RFC 3339
    Timestamp,
    Json,
    Enum(&'static [&'static str]),
    /// Integer constrained to an inclusive range
    Range(i64, i64),
}

impl FieldKind {
    pub const fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Text(_) | FieldKind::Enum(_) => "text",
            FieldKind::Integer | FieldKind::Range(..) => "integer",
            FieldKind::Decimal => "numeric",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Timestamp => "timestamptz",
            FieldKind::Json => "jsonb",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Resource the field's value must identify
    pub references: Option<&'static str>,
}

impl FieldDef {
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { name, column, kind, required: false, references: None }
    }

    pub const fn required(self) -> Self {
        Self { required: true, ..self }
    }

    pub const fn references(self, resource: &'static str) -> Self {
        Self { references: Some(resource), ..self }
    }

    fn filter_column(&self) -> FilterColumn {
        FilterColumn::new(self.name, self.column, self.kind.sql_type())
    }
}

/// Child rows attached to a parent under `rowFormData`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildDef {
    pub resource: &'static str,
    /// Column on the child table holding the parent id
    pub foreign_key: &'static str,
}

/// Parent a resource without a `tenant_id` column takes its tenant from
#[derive(Debug, Clone, Copy)]
pub struct Owner {
    pub field: &'static FieldDef,
    pub parent: &'static ResourceDef,
}

#[derive(Debug)]
pub struct ResourceDef {
    pub name: &'static str,
    pub table: &'static str,
    pub fields: &'static [FieldDef],
    /// Wire name of the column `fromDate` / `toDate` filter on
    pub date_field: Option<&'static str>,
    pub children: &'static [ChildDef],
    /// Role needed to create, update or delete rows
    pub write_role: Option<&'static str>,
}

impl ResourceDef {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether rows carry a `tenant_id`
    pub fn is_scoped(&self) -> bool {
        self.field("tenantId").is_some()
    }

    /// For unscoped resources, the first reference to a scoped resource
    pub fn owner(&self) -> Option<Owner> {
        if self.is_scoped() {
            return None;
        }
        self.fields.iter().find_map(|field| {
            let parent = find(field.references?)?;
            parent.is_scoped().then_some(Owner { field, parent })
        })
    }

    /// Rows belong to exactly one tenant: directly, through an owner, or
    /// by being the tenant
    pub fn is_tenant_bound(&self) -> bool {
        self.is_scoped() || self.owner().is_some() || self.name == registry::TENANT.name
    }

    /// Every readable column, in projection order
    pub fn filter_columns(&self) -> Vec<FilterColumn> {
        let mut columns = Vec::with_capacity(self.fields.len() + 5);
        columns.push(FilterColumn::new("id", "id", "integer"));
        columns.extend(self.fields.iter().map(FieldDef::filter_column));
        columns.push(FilterColumn::new("createdAt", "created_at", "timestamptz"));
        columns.push(FilterColumn::new("updatedAt", "updated_at", "timestamptz"));
        columns.push(FilterColumn::new("createdBy", "created_by", "integer"));
        columns.push(FilterColumn::new("updatedBy", "updated_by", "integer"));
        columns
    }

    /// Validate a request body, returning the normalised values keyed by
    /// wire name.
    pub fn validate(&self, body: &Value, mode: WriteMode) -> Result<Map<String, Value>, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let Some(obj) = body.as_object() else {
            errors.add("body", "must be a JSON object");
            return Err(errors);
        };

        let mut normalized = Map::new();
        for (key, value) in obj {
            if SYSTEM_FIELDS.contains(&key.as_str()) {
                errors.add(key, "is managed by the server");
                continue;
            }
            let Some(field) = self.field(key) else {
                errors.add(key, "is not a known field");
                continue;
            };

            if value.is_null() {
                if field.required {
                    errors.add(key, "cannot be null");
                } else {
                    normalized.insert(key.clone(), Value::Null);
                }
                continue;
            }

            match normalize(field.kind, value) {
                Ok(v) => {
                    normalized.insert(key.clone(), v);
                }
                Err(reason) => errors.add(key, reason),
            }
        }

        if mode != WriteMode::Patch {
            for field in self.fields.iter().filter(|f| f.required) {
                if !obj.contains_key(field.name) {
                    errors.add(field.name, "is required");
                }
            }
        }

        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(errors)
        }
    }

    /// Translate list query parameters into a filter. Known fields become
    /// equality conditions; `fromDate` / `toDate` bound the date column.
    pub fn list_filter(&self, params: &HashMap<String, String>, scope: &RequestScope) -> Result<FilterData, FilterError> {
        let mut conditions = Map::new();
        let mut filter = FilterData::default();

        for (key, raw) in params {
            match key.as_str() {
                "limit" => filter.limit = Some(parse_i32(key, raw)?),
                "offset" => filter.offset = Some(parse_i32(key, raw)?),
                "order" => filter.order = Some(Value::String(raw.clone())),
                "where" => {
                    let parsed: Value = serde_json::from_str(raw).map_err(|e| FilterError::InvalidParameter {
                        name: key.clone(),
                        reason: e.to_string(),
                    })?;
                    filter.where_clause = Some(parsed);
                }
                "id" => {
                    conditions.insert("id".to_string(), Value::from(parse_i32(key, raw)?));
                }
                "fromDate" | "toDate" => {}
                _ => match self.field(key) {
                    Some(field) => {
                        let value = normalize_query(field.kind, raw).map_err(|reason| FilterError::InvalidParameter {
                            name: key.clone(),
                            reason,
                        })?;
                        conditions.insert(key.clone(), value);
                    }
                    None => tracing::debug!("Ignoring unknown {} query parameter {}", self.name, key),
                },
            }
        }

        let from = params.get("fromDate");
        let to = params.get("toDate");
        if from.is_some() || to.is_some() {
            let date_field = self.date_field.ok_or_else(|| FilterError::InvalidParameter {
                name: "fromDate".to_string(),
                reason: format!("{} has no date column", self.name),
            })?;
            let mut range = Map::new();
            for (op, name, raw) in [("$gte", "fromDate", from), ("$lte", "toDate", to)] {
                if let Some(raw) = raw {
                    let date = normalize(FieldKind::Date, &Value::String(raw.clone()))
                        .map_err(|reason| FilterError::InvalidParameter { name: name.to_string(), reason })?;
                    range.insert(op.to_string(), date);
                }
            }
            conditions.insert(date_field.to_string(), Value::Object(range));
        }

        // Scope resolved from headers applies even when absent from the query
        for scope_field in SCOPE_FIELDS {
            if let (Some(value), Some(_)) = (scope.get(scope_field), self.field(scope_field)) {
                conditions.entry(scope_field.to_string()).or_insert(Value::from(value));
            }
        }

        if let (Some(owner), Some(tenant_id)) = (self.owner(), scope.tenant_id) {
            filter.tenant_owner = Some(TenantOwner {
                column: owner.field.column,
                parent_table: owner.parent.table,
                tenant_id,
            });
        }

        if !conditions.is_empty() {
            filter.where_clause = Some(match filter.where_clause.take() {
                None => Value::Object(conditions),
                Some(extra) => serde_json::json!({ "$and": [Value::Object(conditions), extra] }),
            });
        }

        Ok(filter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    /// PUT: required fields must be supplied
    Replace,
    /// PATCH: only supplied fields are checked
    Patch,
}

/// Field name to reason, reported as `fieldErrors`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.insert(field.into(), reason.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.0.into_iter().collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{} {}", k, v)).collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Check a body value against a field kind and return its canonical form
pub fn normalize(kind: FieldKind, value: &Value) -> Result<Value, String> {
    match kind {
        FieldKind::Text(max) => {
            let s = value.as_str().ok_or("must be a string")?;
            if let Some(max) = max {
                if s.chars().count() > max {
                    return Err(format!("must be at most {} characters", max));
                }
            }
            Ok(Value::String(s.to_string()))
        }
        FieldKind::Integer => integer(value).map(Value::from),
        FieldKind::Range(lo, hi) => {
            let n = integer(value)?;
            if (lo..=hi).contains(&(n as i64)) {
                Ok(Value::from(n))
            } else {
                Err(format!("must be between {} and {}", lo, hi))
            }
        }
        FieldKind::Decimal => {
            let text = match value {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.trim().to_string(),
                _ => return Err("must be a number".to_string()),
            };
            let parsed = BigDecimal::from_str(&text).map_err(|_| "must be a number".to_string())?;
            // Kept as text so the numeric column receives the exact digits
            Ok(Value::String(parsed.to_string()))
        }
        FieldKind::Boolean => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(Value::Bool(true)),
            Value::Number(n) if n.as_i64() == Some(0) => Ok(Value::Bool(false)),
            _ => Err("must be a boolean".to_string()),
        },
        FieldKind::Date => {
            let s = value.as_str().ok_or("must be a date string")?.trim();
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
                .ok_or("must be a date (YYYY-MM-DD)")?;
            Ok(Value::String(date.format("%Y-%m-%d").to_string()))
        }
        FieldKind::Timestamp => {
            let s = value.as_str().ok_or("must be a timestamp string")?.trim();
            let ts = DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|dt| dt.and_utc())
                })
                .ok_or("must be an RFC 3339 timestamp")?;
            Ok(Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)))
        }
        FieldKind::Json => Ok(value.clone()),
        FieldKind::Enum(allowed) => {
            let s = value.as_str().ok_or("must be a string")?;
            allowed
                .iter()
                .find(|a| a.eq_ignore_ascii_case(s.trim()))
                .map(|a| Value::String(a.to_string()))
                .ok_or_else(|| format!("must be one of: {}", allowed.join(", ")))
        }
    }
}

fn integer(value: &Value) -> Result<i32, String> {
    let n = match value {
        Value::Number(n) => n.as_i64().ok_or("must be an integer")?,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| "must be an integer")?,
        _ => return Err("must be an integer".to_string()),
    };
    i32::try_from(n).map_err(|_| "is out of range".to_string())
}

/// Query strings carry text; coerce to the field kind before binding
fn normalize_query(kind: FieldKind, raw: &str) -> Result<Value, String> {
    match kind {
        FieldKind::Json => serde_json::from_str(raw).map_err(|e| e.to_string()),
        _ => normalize(kind, &Value::String(raw.to_string())),
    }
}

fn parse_i32(name: &str, raw: &str) -> Result<i32, FilterError> {
    raw.trim().parse().map_err(|_| FilterError::InvalidParameter {
        name: name.to_string(),
        reason: "must be an integer".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attendance() -> &'static ResourceDef {
        find("Attendance").unwrap()
    }

    #[test]
    fn create_requires_fields_and_rejects_unknown() {
        let errors = attendance()
            .validate(&json!({ "tenantId": 1, "colour": "red", "id": 4 }), WriteMode::Create)
            .unwrap_err();
        assert_eq!(errors.get("applicationId"), Some("is required"));
        assert_eq!(errors.get("attendanceType"), Some("is required"));
        assert_eq!(errors.get("colour"), Some("is not a known field"));
        assert_eq!(errors.get("id"), Some("is managed by the server"));
        assert_eq!(errors.get("tenantId"), None);
    }

    #[test]
    fn patch_checks_only_supplied_fields() {
        let values = attendance()
            .validate(&json!({ "notes": "late pickup" }), WriteMode::Patch)
            .unwrap();
        assert_eq!(values.get("notes"), Some(&json!("late pickup")));

        let errors = attendance().validate(&json!({ "applicationId": null }), WriteMode::Patch).unwrap_err();
        assert_eq!(errors.get("applicationId"), Some("cannot be null"));
    }

    #[test]
    fn normalizes_loose_input() {
        assert_eq!(normalize(FieldKind::Integer, &json!("42")), Ok(json!(42)));
        assert_eq!(normalize(FieldKind::Boolean, &json!("TRUE")), Ok(json!(true)));
        assert_eq!(normalize(FieldKind::Date, &json!("2024-03-05T10:00:00Z")), Ok(json!("2024-03-05")));
        assert_eq!(normalize(FieldKind::Decimal, &json!(12.50)), Ok(json!("12.5")));
        assert_eq!(
            normalize(FieldKind::Timestamp, &json!("2024-03-05")),
            Ok(json!("2024-03-05T00:00:00.000Z"))
        );
        assert_eq!(
            normalize(FieldKind::Enum(&["cash", "card"]), &json!("Card")),
            Ok(json!("card"))
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(normalize(FieldKind::Text(Some(3)), &json!("abcd")).is_err());
        assert!(normalize(FieldKind::Range(0, 6), &json!(7)).is_err());
        assert!(normalize(FieldKind::Integer, &json!(1.5)).is_err());
        assert!(normalize(FieldKind::Integer, &json!(3_000_000_000_i64)).is_err());
        assert!(normalize(FieldKind::Date, &json!("05/03/2024")).is_err());
        assert!(normalize(FieldKind::Decimal, &json!("ten")).is_err());
    }

    #[test]
    fn list_filter_maps_dates_fields_and_scope() {
        let params: HashMap<String, String> = [
            ("applicationId", "7"),
            ("fromDate", "2024-01-01"),
            ("toDate", "2024-01-31"),
            ("limit", "20"),
            ("cacheBust", "123"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let scope = RequestScope { tenant_id: Some(3), app_id: None, org_id: None };

        let filter = attendance().list_filter(&params, &scope).unwrap();
        let where_clause = filter.where_clause.unwrap();
        assert_eq!(where_clause["applicationId"], json!(7));
        assert_eq!(where_clause["tenantId"], json!(3));
        assert_eq!(where_clause["attendanceDate"], json!({ "$gte": "2024-01-01", "$lte": "2024-01-31" }));
        assert_eq!(filter.limit, Some(20));
    }

    #[test]
    fn unscoped_children_list_through_their_owner() {
        let scope = RequestScope { tenant_id: Some(5), app_id: None, org_id: None };
        let filter = find("AppElementProperty").unwrap().list_filter(&HashMap::new(), &scope).unwrap();
        assert_eq!(
            filter.tenant_owner,
            Some(TenantOwner { column: "app_element_id", parent_table: "app_elements", tenant_id: 5 })
        );

        let logins = find("UserLogin").unwrap().list_filter(&HashMap::new(), &scope).unwrap();
        assert_eq!(logins.tenant_owner.map(|o| o.parent_table), Some("users"));

        let scoped = attendance().list_filter(&HashMap::new(), &scope).unwrap();
        assert!(scoped.tenant_owner.is_none());
    }

    #[test]
    fn tenant_bound_resources() {
        assert!(attendance().is_tenant_bound());
        assert!(find("Tenant").unwrap().is_tenant_bound());
        assert!(find("PageElementProperty").unwrap().is_tenant_bound());
        assert_eq!(find("UserLogin").unwrap().owner().map(|o| o.field.name), Some("userId"));
        assert!(!find("ElementType").unwrap().is_tenant_bound());
        assert!(!find("ElementTypeProperty").unwrap().is_tenant_bound());
    }

    #[test]
    fn list_filter_rejects_bad_values_and_missing_date_column() {
        let bad: HashMap<String, String> = [("applicationId".to_string(), "seven".to_string())].into();
        assert!(attendance().list_filter(&bad, &RequestScope::default()).is_err());

        let dated: HashMap<String, String> = [("fromDate".to_string(), "2024-01-01".to_string())].into();
        assert!(find("Role").unwrap().list_filter(&dated, &RequestScope::default()).is_err());
    }
}
