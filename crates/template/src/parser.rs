//! Template JSON parsing and data-source resolution

use serde_json::Value;
use text_fit::group_thousands;

use crate::warnings::{Warning, WarningCategory, WarningSink};
use crate::{DataSource, PreviewMode, Result, TemplateDataRecord, TemplateDefinition, TemplateError};

/// Largest integer magnitude that survives a round trip through an IEEE double
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Longest string produced when joining array values
pub const MAX_JOINED_CHARS: usize = 1000;

/// Parse a template from JSON string
pub fn parse_template(json: &str) -> Result<TemplateDefinition> {
    serde_json::from_str(json).map_err(|e| TemplateError::ParseError(e.to_string()))
}

/// Parse a data record from JSON
///
/// Accepts a bare field map or a REST-style `{ "record": { ... } }` envelope.
pub fn parse_record(json: &str) -> Result<TemplateDataRecord> {
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Object(mut map) => match map.remove("record") {
            Some(Value::Object(inner)) => Ok(inner),
            Some(other) => {
                map.insert("record".to_string(), other);
                Ok(map)
            }
            None => Ok(map),
        },
        _ => Err(TemplateError::ParseError(
            "data record must be a JSON object".to_string(),
        )),
    }
}

/// Look up a field, unwrapping `{ "type": .., "value": .. }` field shapes
pub fn field_value<'a>(record: &'a TemplateDataRecord, field_code: &str) -> Option<&'a Value> {
    let value = record.get(field_code)?;
    match value {
        Value::Object(obj) if obj.contains_key("type") && obj.contains_key("value") => {
            obj.get("value")
        }
        _ => Some(value),
    }
}

/// Rows of a subtable field
///
/// Rows shaped `{ "id": .., "value": { .. } }` are unwrapped. A missing
/// field yields no rows; a field that is not an array also records a data
/// warning.
pub fn subtable_rows(
    record: &TemplateDataRecord,
    field_code: &str,
    sink: &mut WarningSink,
) -> Vec<TemplateDataRecord> {
    let Some(value) = field_value(record, field_code) else {
        return Vec::new();
    };
    let Value::Array(items) = value else {
        sink.push(
            Warning::data("subtable field is not an array").with("fieldCode", field_code),
        );
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(obj) => match obj.get("value") {
                Some(Value::Object(inner)) if obj.contains_key("id") => Some(inner.clone()),
                _ => Some(obj.clone()),
            },
            _ => {
                sink.push(
                    Warning::data("subtable row is not an object").with("fieldCode", field_code),
                );
                None
            }
        })
        .collect()
}

/// Convert a JSON value to string for rendering
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Display text for a record value
///
/// Safe integers get thousands grouping, arrays are joined and capped, and
/// objects fall back to their JSON text with a data warning.
pub fn display_value(value: &Value, field_code: &str, sink: &mut WarningSink) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            let raw = n.to_string();
            let unsafe_int = n.as_u64().is_some_and(|u| u > MAX_SAFE_INTEGER)
                || n.as_i64().is_some_and(|i| i.unsigned_abs() > MAX_SAFE_INTEGER);
            if unsafe_int {
                sink.push(
                    Warning::number("integer exceeds the exactly representable range")
                        .with("fieldCode", field_code)
                        .with("value", &raw),
                );
                raw
            } else {
                group_thousands(&raw, ',')
            }
        }
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::Object(obj) => obj
                        .get("name")
                        .or_else(|| obj.get("value"))
                        .map(value_to_string)
                        .unwrap_or_else(|| item.to_string()),
                    other => display_value(other, field_code, sink),
                })
                .collect();
            let joined = parts.join(", ");
            if joined.chars().count() > MAX_JOINED_CHARS {
                sink.push(
                    Warning::data("joined array value truncated").with("fieldCode", field_code),
                );
                joined.chars().take(MAX_JOINED_CHARS).collect()
            } else {
                joined
            }
        }
        Value::Object(_) => {
            sink.push(
                Warning::data("object value rendered as JSON").with("fieldCode", field_code),
            );
            value.to_string()
        }
    }
}

/// Resolve a data source to display text
///
/// Never fails: anything that cannot be resolved becomes an empty string,
/// with a warning where the template or data is at fault.
pub fn resolve_data_source(
    source: &DataSource,
    record: Option<&TemplateDataRecord>,
    mode: PreviewMode,
    sink: &mut WarningSink,
) -> String {
    match source {
        DataSource::Static { value } => value_to_string(value),
        DataSource::Field { field_code } | DataSource::Subtable { field_code }
            if mode == PreviewMode::FieldCode =>
        {
            field_code.clone()
        }
        DataSource::Field { field_code } => {
            let Some(record) = record else {
                return String::new();
            };
            match field_value(record, field_code) {
                Some(value) => display_value(value, field_code, sink),
                None => {
                    sink.push(
                        Warning::data("field not found in record").with("fieldCode", field_code),
                    );
                    String::new()
                }
            }
        }
        DataSource::Subtable { field_code } => {
            sink.push(Warning::new(
                WarningCategory::Data,
                format!("subtable '{field_code}' cannot be displayed as text"),
            ));
            String::new()
        }
    }
}
