use crate::error::{NebulaDbError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The reserved identifier field present on every stored document.
pub const ID_FIELD: &str = "id";

/// A single record: an open-ended mapping from field name to JSON value,
/// with the reserved `id` field holding a string unique within its
/// collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Document(Map::new())
    }

    /// Build a document from a JSON value. Anything other than an object
    /// is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Document(map)),
            other => Err(NebulaDbError::InvalidDocument(json_type_name(&other))),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Human-readable name for a JSON value's runtime type.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Strategy for generating document ids when the caller supplies none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Timestamp plus random suffix, lexicographically sortable.
    #[default]
    Ulid,
    Uuid,
    Nanoid,
}

impl IdStrategy {
    pub fn generate(&self) -> String {
        match self {
            IdStrategy::Ulid => ulid::Ulid::new().to_string().to_lowercase(),
            IdStrategy::Uuid => uuid::Uuid::new_v4().to_string(),
            IdStrategy::Nanoid => nanoid::nanoid!(),
        }
    }
}
