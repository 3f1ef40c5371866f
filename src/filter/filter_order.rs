use serde_json::Value;

use super::error::FilterError;
use super::types::{resolve_column, FilterColumn, FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Accepts `"created_at desc, name"`, `["createdAt desc"]` or
    /// `{ "createdAt": "desc" }`; names resolve through the known columns.
    pub fn validate_and_parse(order: &Value, columns: &[FilterColumn]) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match order {
            Value::String(s) => Self::parse_order_string(s, columns),
            Value::Array(arr) => {
                let mut out = Vec::new();
                for v in arr {
                    match v {
                        Value::String(s) => out.extend(Self::parse_order_string(s, columns)?),
                        other => {
                            return Err(FilterError::InvalidOperatorData(format!("invalid order entry: {}", other)))
                        }
                    }
                }
                Ok(out)
            }
            Value::Object(obj) => {
                let mut out = Vec::new();
                for (k, v) in obj {
                    let sort = Self::parse_direction(v.as_str().unwrap_or("asc"))?;
                    let (column, _) = resolve_column(columns, k)?;
                    out.push(FilterOrderInfo { column, sort });
                }
                Ok(out)
            }
            Value::Null => Ok(vec![]),
            other => Err(FilterError::InvalidOperatorData(format!("invalid order: {}", other))),
        }
    }

    fn parse_order_string(s: &str, columns: &[FilterColumn]) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let sort = Self::parse_direction(it.next().unwrap_or("asc"))?;
                let (column, _) = resolve_column(columns, col)?;
                out.push(FilterOrderInfo { column, sort });
            }
        }
        Ok(out)
    }

    fn parse_direction(dir: &str) -> Result<SortDirection, FilterError> {
        match dir.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(FilterError::InvalidOperatorData(format!("invalid sort direction: {}", other))),
        }
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[FilterColumn] = &[
        FilterColumn::new("createdAt", "created_at", "timestamptz"),
        FilterColumn::new("name", "name", "text"),
    ];

    #[test]
    fn parses_every_shape_to_columns() {
        let from_string = FilterOrder::validate_and_parse(&json!("createdAt desc, name"), COLUMNS).unwrap();
        assert_eq!(FilterOrder::generate(&from_string), "ORDER BY \"created_at\" DESC, \"name\" ASC");

        let from_object = FilterOrder::validate_and_parse(&json!({ "created_at": "DESC" }), COLUMNS).unwrap();
        assert_eq!(FilterOrder::generate(&from_object), "ORDER BY \"created_at\" DESC");
    }

    #[test]
    fn rejects_unknown_column_and_direction() {
        assert!(FilterOrder::validate_and_parse(&json!("secret desc"), COLUMNS).is_err());
        assert!(FilterOrder::validate_and_parse(&json!("name sideways"), COLUMNS).is_err());
    }
}
