//! Shapes a `Transport::call` response can take.
//!
//! Depending on the method and transport path, the first response item may be
//! the payload itself, a list of records, or the payload still wrapped in a
//! `{"result": ...}` envelope. Classify once, then unwrap explicitly.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    /// No items, or a `null` first item.
    Empty,
    /// A scalar or record.
    Single(Value),
    /// A list of records.
    List(Vec<Value>),
    /// `{"result": T}` (the inner `T` is stored).
    Wrapped(Value),
}

impl ResponseShape {
    /// Classify the first item of a raw call response.
    pub fn classify(items: Vec<Value>) -> Self {
        match items.into_iter().next() {
            None | Some(Value::Null) => ResponseShape::Empty,
            Some(Value::Array(list)) => ResponseShape::List(list),
            Some(Value::Object(mut obj)) if obj.contains_key("result") => {
                ResponseShape::Wrapped(obj.remove("result").unwrap_or(Value::Null))
            }
            Some(other) => ResponseShape::Single(other),
        }
    }

    /// The payload, if there is one.
    pub fn into_value(self) -> Option<Value> {
        match self {
            ResponseShape::Empty | ResponseShape::Wrapped(Value::Null) => None,
            ResponseShape::Single(v) | ResponseShape::Wrapped(v) => Some(v),
            ResponseShape::List(list) => Some(Value::Array(list)),
        }
    }

    /// The payload when it is a list, otherwise an empty list.
    pub fn into_list(self) -> Vec<Value> {
        match self {
            ResponseShape::List(list) | ResponseShape::Wrapped(Value::Array(list)) => list,
            _ => Vec::new(),
        }
    }

    /// The payload as a record, treating empty or falsy payloads as absent.
    pub fn into_record(self) -> Option<Value> {
        self.into_value().filter(is_truthy)
    }

    /// Whether the payload counts as a positive outcome.
    pub fn is_truthy(&self) -> bool {
        match self {
            ResponseShape::Empty => false,
            ResponseShape::Single(v) | ResponseShape::Wrapped(v) => is_truthy(v),
            ResponseShape::List(list) => !list.is_empty(),
        }
    }

    /// Identifier of a newly created record. `path` names nested keys to
    /// follow when the payload is an object (e.g. `["task", "id"]`).
    pub fn created_id(self, path: &[&str]) -> Value {
        let Some(mut value) = self.into_value() else {
            return Value::Null;
        };
        if value.is_object() {
            for key in path {
                value = match value {
                    Value::Object(mut obj) => obj.remove(*key).unwrap_or(Value::Null),
                    _ => Value::Null,
                };
            }
        }
        value
    }
}

/// Truthiness as the REST API uses it: `false`, `0`, `""`, `null` and empty
/// containers are negative outcomes.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
