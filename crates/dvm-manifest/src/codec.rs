//! Record <-> manifest transcoding
//!
//! One algorithm for every kind, driven by the kind's schema descriptor.
//!
//! Omission rules differ by direction on purpose:
//! - `to_manifest` leaves out absent fields and empty collections, so exported
//!   manifests stay minimal.
//! - `from_manifest` leaves the blob of an empty or missing field unset rather
//!   than storing an encoded empty container; kind defaults fill unset fields.

use crate::attributes::{decode_record, from_json, DecodeMode, DecodedRecord};
use crate::errors::{AttributeError, ManifestError};
use crate::schema::{schema, FieldSpec, SourceRule};
use crate::types::{AttributeValue, Manifest, Metadata, ResourceKind, ResourceRecord, API_VERSION};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

const ENABLED_KEY: &str = "enabled";

// =============================================================================
// RECORD -> MANIFEST
// =============================================================================

/// Export a record, omitting any attribute whose blob does not decode
pub fn to_manifest(record: &ResourceRecord) -> Manifest {
    let decoded = decode_record(record);
    for err in &decoded.dropped {
        debug!("Omitting '{}' from exported manifest: {}", err.field(), err);
    }
    build_manifest(record, &decoded)
}

/// Export a record, failing on the first malformed blob in strict mode
pub fn to_manifest_with(record: &ResourceRecord, mode: DecodeMode) -> Result<Manifest, AttributeError> {
    let decoded = decode_record(record).resolve(mode)?;
    Ok(build_manifest(record, &decoded))
}

fn build_manifest(record: &ResourceRecord, decoded: &DecodedRecord) -> Manifest {
    let mut tags = decoded.tags.clone();
    tags.sort();
    tags.dedup();

    let metadata = Metadata {
        name: record.name.clone(),
        description: non_empty(record.description.as_deref()),
        category: non_empty(record.category.as_deref()),
        tags,
        labels: decoded.labels.clone(),
        annotations: decoded.annotations.clone(),
    };

    let descriptor = schema(record.kind);
    let mut spec = Map::new();
    match descriptor.source {
        SourceRule::Required(key) => {
            if let Some(source) = non_empty(record.source_ref.as_deref()) {
                spec.insert(key.to_string(), Value::String(source));
            }
        }
        SourceRule::OneOf { source, builtin } => {
            if let Some(value) = non_empty(record.source_ref.as_deref()) {
                spec.insert(source.to_string(), Value::String(value));
            }
            if let Some(value) = non_empty(record.builtin_ref.as_deref()) {
                spec.insert(builtin.to_string(), Value::String(value));
            }
        }
        SourceRule::Unsourced => {}
    }

    for field in descriptor.fields {
        if let Some(value) = decoded.get(field.name) {
            if !value.is_empty() {
                spec.insert(field.name.to_string(), value.to_json());
            }
        }
    }

    if !record.enabled {
        spec.insert(ENABLED_KEY.to_string(), Value::Bool(false));
    }

    Manifest {
        api_version: API_VERSION.to_string(),
        kind: record.kind.as_str().to_string(),
        metadata,
        spec,
    }
}

// =============================================================================
// MANIFEST -> RECORD
// =============================================================================

/// Validate a manifest and encode it into a storage record
pub fn from_manifest(manifest: &Manifest) -> Result<ResourceRecord, ManifestError> {
    if manifest.api_version != API_VERSION {
        return Err(ManifestError::UnsupportedApiVersion {
            found: manifest.api_version.clone(),
            expected: API_VERSION,
        });
    }
    if manifest.kind.is_empty() {
        return Err(ManifestError::MissingField("kind".to_string()));
    }
    let kind: ResourceKind = manifest.kind.parse()?;

    let name = manifest.metadata.name.trim();
    if name.is_empty() {
        return Err(ManifestError::MissingField("metadata.name".to_string()));
    }

    let descriptor = schema(kind);
    let spec = &manifest.spec;
    let mut record = ResourceRecord::new(kind, name);
    record.description = non_empty(manifest.metadata.description.as_deref());
    record.category = non_empty(manifest.metadata.category.as_deref());

    match descriptor.source {
        SourceRule::Required(key) => {
            let source = spec_string(spec, key)?
                .ok_or_else(|| ManifestError::MissingField(format!("spec.{key}")))?;
            record.source_ref = Some(source);
        }
        SourceRule::OneOf { source, builtin } => {
            match (spec_string(spec, source)?, spec_string(spec, builtin)?) {
                (Some(source_ref), None) => record.source_ref = Some(source_ref),
                (None, Some(builtin_ref)) => record.builtin_ref = Some(builtin_ref),
                (Some(_), Some(_)) => {
                    return Err(ManifestError::InvalidField {
                        field: format!("spec.{source}"),
                        reason: format!("'{source}' and '{builtin}' are mutually exclusive"),
                    })
                }
                (None, None) => {
                    return Err(ManifestError::MissingField(format!(
                        "spec.{source} or spec.{builtin}"
                    )))
                }
            }
        }
        SourceRule::Unsourced => {}
    }

    record.enabled = match spec.get(ENABLED_KEY) {
        None | Some(Value::Null) => true,
        Some(Value::Bool(enabled)) => *enabled,
        Some(_) => {
            return Err(ManifestError::InvalidField {
                field: format!("spec.{ENABLED_KEY}"),
                reason: "expected a boolean".to_string(),
            })
        }
    };

    for field in descriptor.fields {
        if let Some(encoded) = encode_field(field, spec.get(field.name))? {
            record.attributes.insert(field.name.to_string(), encoded);
        }
    }

    let source_keys = descriptor.source.keys();
    for key in spec.keys() {
        if key != ENABLED_KEY && !source_keys.contains(&key.as_str()) && descriptor.field(key).is_none() {
            warn!("Ignoring unknown field 'spec.{}' in {} '{}'", key, kind, name);
        }
    }

    let mut tags: Vec<String> = manifest
        .metadata
        .tags
        .iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    if !tags.is_empty() {
        record.tags = Some(Value::from(tags).to_string());
    }
    if !manifest.metadata.labels.is_empty() {
        record.labels = Some(serde_json::to_string(&manifest.metadata.labels)?);
    }
    if !manifest.metadata.annotations.is_empty() {
        record.annotations = Some(serde_json::to_string(&manifest.metadata.annotations)?);
    }

    Ok(record)
}

/// Encode one spec field; `None` leaves the blob unset
fn encode_field(field: &FieldSpec, raw: Option<&Value>) -> Result<Option<String>, ManifestError> {
    let converted = match raw {
        Some(value) => from_json(field, value).map_err(|err| ManifestError::InvalidField {
            field: format!("spec.{}", field.name),
            reason: err.to_string(),
        })?,
        None => None,
    };

    let value = match converted {
        Some(value) if !value.is_empty() => value,
        _ => match field.default {
            Some(default) => default.value(),
            None => return Ok(None),
        },
    };

    if !field.allowed.is_empty() {
        if let AttributeValue::Text(ref text) = value {
            if !field.allowed.contains(&text.as_str()) {
                return Err(ManifestError::InvalidField {
                    field: format!("spec.{}", field.name),
                    reason: format!(
                        "'{}' is not one of: {}",
                        text,
                        field.allowed.join(", ")
                    ),
                });
            }
        }
    }

    Ok(Some(value.encode()))
}

fn spec_string(spec: &Map<String, Value>, key: &str) -> Result<Option<String>, ManifestError> {
    match spec.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(non_empty(Some(value))),
        Some(_) => Err(ManifestError::InvalidField {
            field: format!("spec.{key}"),
            reason: "expected a string".to_string(),
        }),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// DOCUMENT PARSING
// =============================================================================

/// Parse one or more `---`-separated manifest documents (YAML or JSON)
pub fn parse_manifests(text: &str) -> Result<Vec<Manifest>, ManifestError> {
    Ok(parse_documents(text)?
        .into_iter()
        .map(|(_, manifest)| manifest)
        .collect())
}

/// Non-empty documents paired with their 1-based position in the input
fn parse_documents(text: &str) -> Result<Vec<(usize, Manifest)>, ManifestError> {
    let mut manifests = Vec::new();
    for (offset, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let index = offset + 1;
        let value = serde_yaml::Value::deserialize(document).map_err(|err| ManifestError::Document {
            index,
            source: Box::new(err.into()),
        })?;
        if value.is_null() {
            continue;
        }
        let manifest: Manifest = serde_yaml::from_value(value).map_err(|err| ManifestError::Document {
            index,
            source: Box::new(err.into()),
        })?;
        manifests.push((index, manifest));
    }
    Ok(manifests)
}

/// Parse and validate every document, failing on the first invalid one
pub fn parse_records(text: &str) -> Result<Vec<ResourceRecord>, ManifestError> {
    parse_documents(text)?
        .iter()
        .map(|(index, manifest)| {
            from_manifest(manifest).map_err(|err| ManifestError::Document {
                index: *index,
                source: Box::new(err),
            })
        })
        .collect()
}
