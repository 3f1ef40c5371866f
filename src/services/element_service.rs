use serde_json::{Map, Value};

/// One property row to create for a new element instance
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedProperty {
    pub element_type_property_id: i32,
    pub value: Option<String>,
}

/// Property rows for a new element: one per element type property, valued
/// from the matching override when present, else from the type's default.
///
/// `type_properties` are ElementTypeProperty rows; `overrides` are property
/// rows (`elementTypePropertyId`, `value`) of an instance being inherited
/// from, such as the AppElement a PageElement was placed from.
pub fn plan_properties(type_properties: &[Value], overrides: &[Value]) -> Vec<PlannedProperty> {
    type_properties
        .iter()
        .filter_map(|property| {
            let id = as_i32(property.get("id")?)?;
            let inherited = overrides
                .iter()
                .find(|o| o.get("elementTypePropertyId").and_then(as_i32) == Some(id))
                .and_then(|o| o.get("value"))
                .and_then(as_text);
            let value = inherited.or_else(|| property.get("defaultValue").and_then(as_text));
            Some(PlannedProperty { element_type_property_id: id, value })
        })
        .collect()
}

impl PlannedProperty {
    /// Wire-keyed values for the property row, owned by `parent_field = parent_id`
    /// and written by `actor_id`
    pub fn to_values(&self, parent_field: &str, parent_id: i32, actor_id: i32) -> Map<String, Value> {
        let mut values = Map::new();
        values.insert(parent_field.to_string(), Value::from(parent_id));
        values.insert("elementTypePropertyId".to_string(), Value::from(self.element_type_property_id));
        values.insert(
            "value".to_string(),
            self.value.clone().map(Value::String).unwrap_or(Value::Null),
        );
        values.insert("createdBy".to_string(), Value::from(actor_id));
        values.insert("updatedBy".to_string(), Value::from(actor_id));
        values
    }
}

fn as_i32(value: &Value) -> Option<i32> {
    value.as_i64().and_then(|n| i32::try_from(n).ok())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
