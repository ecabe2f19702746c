use crate::document::{json_type_name, Document};
use crate::error::{NebulaDbError, Result};
use crate::schema::{FieldDefinition, Schema};
use serde_json::Value;

/// Result of validating a document against a schema
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Copy schema defaults into the document for every field that has a
/// default and no value (absent or null). Defaults are cloned, never
/// shared, so no two documents alias a defaulted container.
pub fn apply_defaults(schema: &Schema, doc: &mut Document) {
    for (field_name, field_def) in &schema.fields {
        let has_value = doc
            .get(field_name)
            .map(|v| *v != Value::Null)
            .unwrap_or(false);

        if !has_value {
            if let Some(default) = &field_def.default {
                doc.insert(field_name.clone(), default.clone());
            }
        }
    }
}

/// Validate a document against a schema. Two independent passes:
/// every `required` field must be present and non-null, and every
/// present field with a schema entry must match its declared type and
/// enum. All errors are accumulated; the document is never mutated.
pub fn validate_document(schema: &Schema, doc: &Document) -> ValidationResult {
    let mut result = ValidationResult::default();

    // Required-field pass
    for (field_name, field_def) in &schema.fields {
        let value = doc.get(field_name);
        if field_def.required && (value.is_none() || value == Some(&Value::Null)) {
            result
                .errors
                .push(format!("Required field '{field_name}' is missing"));
        }
    }

    // Type/enum pass. Null values are the required pass's concern.
    for (field_name, value) in doc.fields() {
        if *value == Value::Null {
            continue;
        }
        if let Some(field_def) = schema.field(field_name) {
            validate_field_value(field_name, field_def, value, &mut result);
        }
    }

    result
}

fn validate_field_value(
    field_name: &str,
    field_def: &FieldDefinition,
    value: &Value,
    result: &mut ValidationResult,
) {
    if let Some(field_type) = &field_def.field_type {
        if !field_type.matches(value) {
            result.errors.push(format!(
                "Field '{field_name}' expected {field_type:?}, got {}",
                json_type_name(value)
            ));
            return;
        }
    }

    if let Some(enum_values) = &field_def.enum_values {
        if !enum_values.contains(value) {
            result.errors.push(format!(
                "Field '{field_name}' value {value} is not in enum: {enum_values:?}"
            ));
        }
    }
}

/// Validate and reject with a single aggregated error listing every
/// violation, not just the first.
pub fn ensure_valid(schema: &Schema, doc: &Document) -> Result<()> {
    let result = validate_document(schema, doc);
    if !result.is_ok() {
        return Err(NebulaDbError::Validation(format!(
            "Document validation failed:\n  - {}",
            result.errors.join("\n  - ")
        )));
    }
    Ok(())
}
