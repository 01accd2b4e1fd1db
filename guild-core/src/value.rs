//! Structured payloads carried by quests.
//!
//! Quest input and output are opaque to the orchestration engine but still
//! typed: a [`QuestValue`] is a small tagged tree of primitives, lists and
//! maps. It decodes untagged from JSON so templates can write plain objects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A structured quest payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<QuestValue>),
    Map(BTreeMap<String, QuestValue>),
}

impl Default for QuestValue {
    fn default() -> Self {
        Self::Null
    }
}

impl QuestValue {
    /// Empty map payload.
    pub fn map() -> Self {
        Self::Map(BTreeMap::new())
    }

    /// Insert into a map payload. No-op on other variants.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<QuestValue>) -> Self {
        if let Self::Map(entries) = &mut self {
            entries.insert(key.into(), value.into());
        }
        self
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Look up a key in a map payload.
    pub fn get(&self, key: &str) -> Option<&QuestValue> {
        match self {
            Self::Map(entries) => entries.get(key),
            _ => None,
        }
    }
}

impl From<&str> for QuestValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for QuestValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for QuestValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for QuestValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for QuestValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<QuestValue>> for QuestValue {
    fn from(value: Vec<QuestValue>) -> Self {
        Self::List(value)
    }
}

impl From<serde_json::Value> for QuestValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}
