//! Record values accepted by a [`RecordSink`](crate::output::RecordSink).
//!
//! Units hand over either a positional row or a keyed set of fields. Both are
//! normalized into a row of JSON values aligned to the sink headers: byte
//! strings become lossy UTF-8 text, scalars become strings, nulls stay null
//! and nested objects keep their shape with normalized leaves.

use serde::Serialize;
use serde_json::{Map, Value};

/// One record as produced by a unit
#[derive(Debug, Clone)]
pub enum Record {
    /// Values in header order
    Row(Vec<Value>),
    /// Values keyed by header name; unknown keys are dropped
    Fields(Map<String, Value>),
}

impl Record {
    /// Build a keyed record from any serializable struct
    pub fn from_serialize<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Record::Fields(map)),
            Value::Array(items) => Ok(Record::Row(items)),
            other => Ok(Record::Row(vec![other])),
        }
    }

    /// Align the record to `headers` and normalize every value
    pub fn into_row(self, headers: &[String]) -> Vec<Value> {
        match self {
            Record::Row(values) => values.into_iter().map(normalize).collect(),
            Record::Fields(mut map) => headers
                .iter()
                .map(|h| map.remove(h).map(normalize).unwrap_or(Value::Null))
                .collect(),
        }
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Record::Row(values)
    }
}

impl From<Vec<String>> for Record {
    fn from(values: Vec<String>) -> Self {
        Record::Row(values.into_iter().map(Value::String).collect())
    }
}

impl From<Vec<&str>> for Record {
    fn from(values: Vec<&str>) -> Self {
        Record::Row(values.into_iter().map(|v| Value::String(v.to_string())).collect())
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Record::Fields(map)
    }
}

/// Text value decoded from raw bytes, replacing invalid sequences
pub fn text_from_bytes(bytes: &[u8]) -> Value {
    Value::String(String::from_utf8_lossy(bytes).into_owned())
}

fn normalize(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect())
        }
    }
}

/// Render one normalized value as a CSV cell
pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Remove null and empty-string members, descending into nested objects
pub(crate) fn prune_empty(map: &mut Map<String, Value>) {
    map.retain(|_, v| !is_empty(v));
    for value in map.values_mut() {
        if let Value::Object(inner) = value {
            prune_empty(inner);
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
