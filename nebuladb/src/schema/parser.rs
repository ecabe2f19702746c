use super::types::Schema;
use crate::error::Result;

/// Parse a YAML schema string into a Schema.
///
/// The document is a mapping from field name to field definition:
///
/// ```yaml
/// id: { type: string, required: true }
/// status: { type: string, enum: [pending, done], default: pending }
/// ```
pub fn parse_schema_str(content: &str) -> Result<Schema> {
    let schema: Schema = serde_yaml::from_str(content)?;
    Ok(schema)
}
