//! Attribute transcoding between stored JSON text and native shapes
//!
//! Stored blobs are read in one of two modes. `Lenient` drops any field whose
//! blob fails to decode and carries on (legacy data keeps working); `Strict`
//! returns the first failure. Both modes run the same decode and differ only
//! in what happens to the collected failures.

use crate::errors::AttributeError;
use crate::schema::{schema, FieldShape, FieldSpec};
use crate::types::{AttributeValue, Dependency, KeyBinding, ResourceRecord};
use crate::union::UnionValue;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How malformed stored attributes are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Degrade to absent
    #[default]
    Lenient,
    /// Surface an `AttributeError`
    Strict,
}

impl FromStr for DecodeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lenient" => Ok(DecodeMode::Lenient),
            "strict" => Ok(DecodeMode::Strict),
            other => Err(format!(
                "unknown decode mode '{other}' (expected 'lenient' or 'strict')"
            )),
        }
    }
}

impl fmt::Display for DecodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeMode::Lenient => f.write_str("lenient"),
            DecodeMode::Strict => f.write_str("strict"),
        }
    }
}

/// Decoded attributes keyed by schema field name
pub type Attributes = BTreeMap<&'static str, AttributeValue>;

/// A record with every optional blob decoded
#[derive(Debug, Default)]
pub struct DecodedRecord {
    pub tags: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub attributes: Attributes,
    /// Fields that failed to decode and were left out
    pub dropped: Vec<AttributeError>,
}

impl DecodedRecord {
    /// Apply a decode mode to the collected failures
    pub fn resolve(self, mode: DecodeMode) -> Result<DecodedRecord, AttributeError> {
        match mode {
            DecodeMode::Strict => match self.dropped.into_iter().next() {
                Some(err) => Err(err),
                None => Ok(DecodedRecord {
                    dropped: Vec::new(),
                    ..self
                }),
            },
            DecodeMode::Lenient => Ok(self),
        }
    }

    pub fn get(&self, field: &str) -> Option<&AttributeValue> {
        self.attributes.get(field)
    }
}

/// Decode every optional blob of a record, collecting failures instead of stopping
pub fn decode_record(record: &ResourceRecord) -> DecodedRecord {
    let mut decoded = DecodedRecord::default();

    if let Some(tags) = decode_metadata::<Vec<String>>("tags", record.tags.as_deref(), &mut decoded.dropped) {
        decoded.tags = tags;
    }
    if let Some(labels) = decode_metadata("labels", record.labels.as_deref(), &mut decoded.dropped) {
        decoded.labels = labels;
    }
    if let Some(annotations) =
        decode_metadata("annotations", record.annotations.as_deref(), &mut decoded.dropped)
    {
        decoded.annotations = annotations;
    }

    let descriptor = schema(record.kind);
    for field in descriptor.fields {
        let Some(raw) = record.attribute(field.name) else {
            continue;
        };
        match decode_blob(field, raw) {
            Ok(Some(value)) => {
                decoded.attributes.insert(field.name, value);
            }
            Ok(None) => {}
            Err(err) => {
                debug!(
                    "Dropping attribute '{}' of {} '{}': {}",
                    field.name, record.kind, record.name, err
                );
                decoded.dropped.push(err);
            }
        }
    }

    for name in record.attributes.keys() {
        if descriptor.field(name).is_none() {
            debug!(
                "Ignoring stored attribute '{}' not in the {} schema",
                name, record.kind
            );
        }
    }

    decoded
}

fn decode_metadata<T: DeserializeOwned>(
    field: &str,
    raw: Option<&str>,
    dropped: &mut Vec<AttributeError>,
) -> Option<T> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(source) => {
            debug!("Dropping metadata '{}': {}", field, source);
            dropped.push(AttributeError::Malformed {
                field: field.to_string(),
                source,
            });
            None
        }
    }
}

/// Decode one stored blob. `Ok(None)` means the blob held JSON `null`.
pub fn decode_blob(field: &FieldSpec, raw: &str) -> Result<Option<AttributeValue>, AttributeError> {
    let value: Value = serde_json::from_str(raw).map_err(|source| AttributeError::Malformed {
        field: field.name.to_string(),
        source,
    })?;
    from_json(field, &value)
}

/// Convert a JSON value into the field's native shape.
///
/// `null` converts to `Ok(None)` for every shape.
pub fn from_json(field: &FieldSpec, value: &Value) -> Result<Option<AttributeValue>, AttributeError> {
    if value.is_null() {
        return Ok(None);
    }
    let mismatch = || AttributeError::ShapeMismatch {
        field: field.name.to_string(),
        expected: field.shape.describe(),
    };

    let converted = match field.shape {
        FieldShape::Text => match value {
            Value::String(text) => AttributeValue::Text(text.clone()),
            // YAML writes unquoted versions as numbers
            Value::Number(number) => AttributeValue::Text(number.to_string()),
            _ => return Err(mismatch()),
        },
        FieldShape::Code => match value {
            Value::String(code) => AttributeValue::Code(code.clone()),
            _ => return Err(mismatch()),
        },
        FieldShape::Flag => AttributeValue::Flag(value.as_bool().ok_or_else(mismatch)?),
        FieldShape::Integer => AttributeValue::Integer(value.as_i64().ok_or_else(mismatch)?),
        FieldShape::StringOrList => match UnionValue::classify(value) {
            Some(union @ (UnionValue::Scalar(_) | UnionValue::List(_))) => AttributeValue::Union(union),
            Some(UnionValue::Absent) => return Ok(None),
            Some(UnionValue::Object(_)) | None => return Err(mismatch()),
        },
        FieldShape::StringList => match UnionValue::classify(value) {
            Some(UnionValue::List(items)) => AttributeValue::Strings(items),
            Some(UnionValue::Scalar(item)) => AttributeValue::Strings(vec![item]),
            Some(UnionValue::Absent) => return Ok(None),
            Some(UnionValue::Object(_)) | None => return Err(mismatch()),
        },
        FieldShape::KeyBindings => {
            let items = value.as_array().ok_or_else(mismatch)?;
            let keys = items
                .iter()
                .map(|item| UnionValue::classify(item).and_then(|union| KeyBinding::from_union(&union)))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(mismatch)?;
            AttributeValue::Keys(keys)
        }
        FieldShape::Dependencies => {
            let items = value.as_array().ok_or_else(mismatch)?;
            let deps = items
                .iter()
                .map(|item| UnionValue::classify(item).and_then(|union| Dependency::from_union(&union)))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(mismatch)?;
            AttributeValue::Dependencies(deps)
        }
        FieldShape::Options => AttributeValue::Options(value.as_object().ok_or_else(mismatch)?.clone()),
    };
    Ok(Some(converted))
}
