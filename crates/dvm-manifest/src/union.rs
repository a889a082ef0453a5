//! Scalar-or-list-or-object values
//!
//! Several schema fields (load events, filetypes, commands, key-binding modes,
//! dependency entries) may hold a string, a list of strings, or a nested object
//! depending on what the user wrote. `UnionValue` is the closed set of those
//! shapes; every consumer matches on all four variants.

use serde_json::Value;
use std::collections::BTreeMap;

static ABSENT: UnionValue = UnionValue::Absent;

/// A value whose shape is only known at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UnionValue {
    #[default]
    Absent,
    Scalar(String),
    List(Vec<String>),
    Object(BTreeMap<String, UnionValue>),
}

impl UnionValue {
    /// Classify a decoded JSON value.
    ///
    /// Returns `None` when the value has no union shape (numbers, booleans,
    /// arrays holding anything but strings). Object members that do not
    /// classify are dropped.
    pub fn classify(value: &Value) -> Option<UnionValue> {
        match value {
            Value::Null => Some(UnionValue::Absent),
            Value::String(s) => Some(UnionValue::Scalar(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(UnionValue::List),
            Value::Object(map) => {
                let mut members = BTreeMap::new();
                for (key, member) in map {
                    match UnionValue::classify(member) {
                        Some(UnionValue::Absent) | None => {}
                        Some(classified) => {
                            members.insert(key.clone(), classified);
                        }
                    }
                }
                Some(UnionValue::Object(members))
            }
            Value::Bool(_) | Value::Number(_) => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, UnionValue::Absent)
    }

    /// Absent, or a present value with nothing in it.
    pub fn is_empty(&self) -> bool {
        match self {
            UnionValue::Absent => true,
            UnionValue::Scalar(s) => s.is_empty(),
            UnionValue::List(items) => items.is_empty(),
            UnionValue::Object(members) => members.is_empty(),
        }
    }

    /// Member lookup; anything other than an object yields `Absent`.
    pub fn member(&self, key: &str) -> &UnionValue {
        match self {
            UnionValue::Object(members) => members.get(key).unwrap_or(&ABSENT),
            UnionValue::Absent | UnionValue::Scalar(_) | UnionValue::List(_) => &ABSENT,
        }
    }

    /// The string inside a `Scalar`.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            UnionValue::Scalar(s) => Some(s),
            UnionValue::Absent | UnionValue::List(_) | UnionValue::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            UnionValue::Absent => Value::Null,
            UnionValue::Scalar(s) => Value::String(s.clone()),
            UnionValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            UnionValue::Object(members) => Value::Object(
                members
                    .iter()
                    .map(|(key, member)| (key.clone(), member.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for UnionValue {
    fn from(value: &str) -> Self {
        UnionValue::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for UnionValue {
    fn from(value: Vec<String>) -> Self {
        UnionValue::List(value)
    }
}
