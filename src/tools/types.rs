//! Parameter schemas for tools.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// JSON Schema describing a tool's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentToolParameters {
    pub schema: Value,
}

impl AgentToolParameters {
    pub fn from_schema(schema: Value) -> Self {
        Self { schema }
    }

    /// Object schema with no properties.
    pub fn empty() -> Self {
        Self::object().build()
    }

    pub fn object() -> ParameterBuilder {
        ParameterBuilder::default()
    }

    /// Top-level check of `args` against the schema: object shape, required
    /// keys, and primitive property types.
    pub fn validate(&self, args: &Value) -> std::result::Result<(), String> {
        let Some(obj) = args.as_object() else {
            return Err(format!("expected object arguments, got {}", type_name(args)));
        };

        let required = self
            .schema
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str);
        for name in required {
            if !obj.contains_key(name) {
                return Err(format!("missing required field '{name}'"));
            }
        }

        let Some(properties) = self.schema.get("properties").and_then(Value::as_object) else {
            return Ok(());
        };
        for (key, value) in obj {
            let expected = properties
                .get(key)
                .and_then(|prop| prop.get("type"))
                .and_then(Value::as_str);
            if let Some(expected) = expected {
                if !matches_type(value, expected) {
                    return Err(format!(
                        "field '{key}' expected type '{expected}', got {}",
                        type_name(value)
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Builder for object parameter schemas.
#[derive(Debug, Default)]
pub struct ParameterBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, json!({ "type": "string", "description": description }), required)
    }

    pub fn boolean(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, json!({ "type": "boolean", "description": description }), required)
    }

    pub fn string_enum(self, name: &str, description: &str, values: &[&str], required: bool) -> Self {
        self.property(
            name,
            json!({ "type": "string", "description": description, "enum": values }),
            required,
        )
    }

    fn property(mut self, name: &str, schema: Value, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn build(self) -> AgentToolParameters {
        AgentToolParameters::from_schema(json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        }))
    }
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> AgentToolParameters {
        AgentToolParameters::object()
            .string("question", "What to ask", true)
            .boolean("urgent", "Flag", false)
            .build()
    }

    #[test]
    fn builder_records_required_fields() {
        assert_eq!(schema().schema["required"], json!(["question"]));
        assert_eq!(schema().schema["properties"]["urgent"]["type"], "boolean");
    }

    #[test]
    fn validate_reports_missing_required_field() {
        let err = schema().validate(&json!({ "urgent": true })).unwrap_err();
        assert_eq!(err, "missing required field 'question'");
    }

    #[test]
    fn validate_reports_type_mismatch() {
        let err = schema()
            .validate(&json!({ "question": "q", "urgent": "yes" }))
            .unwrap_err();
        assert!(err.contains("expected type 'boolean'"));
    }

    #[test]
    fn validate_accepts_well_formed_arguments() {
        assert!(schema().validate(&json!({ "question": "q" })).is_ok());
    }
}
