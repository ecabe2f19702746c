use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A per-collection field-constraint definition, mapping field names to
/// their constraints. Immutable once registered with a database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    pub fields: HashMap<String, FieldDefinition>,
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Constraints for a single field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type", default)]
    pub field_type: Option<FieldType>,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "enum", default)]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default)]
    pub default: Option<Value>,
}

/// Field type enumeration. Lists are a distinct type from objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    List,
    Object,
    Null,
}

impl FieldType {
    /// Whether a JSON value has this runtime type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::List => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Null => value.is_null(),
        }
    }
}
