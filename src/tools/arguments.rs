//! Typed access to tool call arguments.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, TetherError};

/// Arguments the model supplied for one tool call.
///
/// Models occasionally send the arguments object as a JSON-encoded string;
/// [`ToolArguments::new`] normalises that into an object.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArguments {
    value: Value,
}

impl ToolArguments {
    pub fn new(value: Value) -> Self {
        let value = match value {
            Value::String(raw) if raw.trim().is_empty() => Value::Object(Default::default()),
            Value::String(raw) => serde_json::from_str(raw.trim()).unwrap_or(Value::String(raw)),
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        Self { value }
    }

    pub fn raw(&self) -> &Value {
        &self.value
    }

    /// Required string argument.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.get_str_opt(key)
            .ok_or_else(|| TetherError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }

    pub fn get_bool_opt(&self, key: &str) -> Option<bool> {
        self.value.get(key).and_then(Value::as_bool)
    }

    /// Deserialize the whole argument object into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.value.clone()).map_err(|err| {
            TetherError::InvalidArgument(format!("Failed to deserialize arguments: {err}"))
        })
    }
}

impl std::fmt::Display for ToolArguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}
