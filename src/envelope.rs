//! Uniform result envelope returned by every tool.
//!
//! `{"success": bool, ...}` with either entity-specific payload fields or an
//! `error` string. `success` is always the first key.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ToolError;

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    body: Map<String, Value>,
}

impl Envelope {
    /// An envelope whose `success` reflects a remote outcome.
    pub fn outcome(success: bool) -> Self {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(success));
        Self { body }
    }

    pub fn ok() -> Self {
        Self::outcome(true)
    }

    /// `{"success": false, "error": <message>}`
    pub fn failure(error: impl fmt::Display) -> Self {
        Self::outcome(false).with("error", error.to_string())
    }

    /// `{"success": true, "count": N, "<plural>": [...]}` with `N == items.len()`.
    pub fn list(plural: &str, items: Vec<Value>) -> Self {
        Self::ok().with("count", items.len()).with(plural, items)
    }

    /// `{"success": true, "<name>": <payload>}`
    pub fn record(name: &str, payload: Value) -> Self {
        Self::ok().with(name, payload)
    }

    /// `{"success": true, "<id_key>": <id>, "message": "<Label> created successfully"}`
    pub fn created(id_key: &str, id: Value, label: &str) -> Self {
        Self::ok()
            .with(id_key, id)
            .with("message", format!("{} created successfully", label))
    }

    /// Append a field. Later calls with the same key replace the value.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.body.insert(key.to_string(), value.into());
        self
    }

    /// Append the message matching the outcome.
    pub fn with_message(self, succeeded: &str, failed: &str) -> Self {
        let message = if self.is_success() { succeeded } else { failed };
        self.with("message", message)
    }

    pub fn is_success(&self) -> bool {
        self.body.get("success").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }

    /// Pretty-printed JSON. Non-ASCII text is emitted verbatim.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.body).unwrap_or_else(|e| {
            format!(
                "{{\"success\": false, \"error\": \"failed to encode result: {}\"}}",
                e.to_string().replace('"', "'")
            )
        })
    }

    /// Collapse the outcome of a tool operation into an envelope, logging
    /// failures against `operation`.
    pub fn settle(result: Result<Envelope, ToolError>, operation: &str) -> Envelope {
        match result {
            Ok(envelope) => envelope,
            Err(err) => {
                match &err {
                    ToolError::InvalidArgument { .. }
                    | ToolError::InvalidEnum { .. }
                    | ToolError::UnsupportedOrder { .. } => {
                        tracing::warn!("Rejected {}: {}", operation, err)
                    }
                    ToolError::NotFound { .. } => tracing::info!("Error {}: {}", operation, err),
                    ToolError::Client(_) => tracing::error!("Error {}: {}", operation, err),
                }
                Envelope::failure(err)
            }
        }
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}
