//! Type system for devopsmaestro resources
//!
//! This module provides:
//! - `ResourceKind`: the configurable unit kinds and their names
//! - `ResourceRecord`: the storage shape, with optional fields kept as JSON text
//! - `AttributeValue`: a decoded attribute in its native shape
//! - `Manifest`: the portable `apiVersion/kind/metadata/spec` document

use crate::errors::ManifestError;
use crate::union::UnionValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The only manifest API version this crate reads and writes
pub const API_VERSION: &str = "devopsmaestro.io/v1";

// =============================================================================
// RESOURCE KIND
// =============================================================================

/// Kind of configurable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    NvimPlugin,
    NvimTheme,
    NvimPackage,
    TerminalPlugin,
    TerminalProfile,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::NvimPlugin,
        ResourceKind::NvimTheme,
        ResourceKind::NvimPackage,
        ResourceKind::TerminalPlugin,
        ResourceKind::TerminalProfile,
    ];

    /// Name used in the manifest `kind:` field
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::NvimPlugin => "NvimPlugin",
            ResourceKind::NvimTheme => "NvimTheme",
            ResourceKind::NvimPackage => "NvimPackage",
            ResourceKind::TerminalPlugin => "TerminalPlugin",
            ResourceKind::TerminalProfile => "TerminalProfile",
        }
    }

    /// Name used on the command line and in the store
    pub fn cli_name(self) -> &'static str {
        match self {
            ResourceKind::NvimPlugin => "nvim-plugin",
            ResourceKind::NvimTheme => "nvim-theme",
            ResourceKind::NvimPackage => "nvim-package",
            ResourceKind::TerminalPlugin => "terminal-plugin",
            ResourceKind::TerminalProfile => "terminal-profile",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "NvimPlugin" | "nvim-plugin" | "plugin" => ResourceKind::NvimPlugin,
            "NvimTheme" | "nvim-theme" | "theme" => ResourceKind::NvimTheme,
            "NvimPackage" | "nvim-package" | "package" => ResourceKind::NvimPackage,
            "TerminalPlugin" | "terminal-plugin" | "shell-plugin" => ResourceKind::TerminalPlugin,
            "TerminalProfile" | "terminal-profile" | "profile" => ResourceKind::TerminalProfile,
            other => return Err(ManifestError::UnknownKind(other.to_string())),
        };
        Ok(kind)
    }
}

// =============================================================================
// RESOURCE RECORD - storage shape
// =============================================================================

/// Storage-shaped representation of one configurable unit.
///
/// Optional complex values are kept as JSON text. A `None` blob, or a field
/// missing from `attributes`, means "absent" and is never the same as an
/// encoded empty container.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub kind: ResourceKind,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub source_ref: Option<String>,
    pub builtin_ref: Option<String>,
    pub tags: Option<String>,
    pub labels: Option<String>,
    pub annotations: Option<String>,
    /// Field name -> encoded JSON value
    pub attributes: BTreeMap<String, String>,
    pub enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceRecord {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        ResourceRecord {
            kind,
            name: name.into(),
            description: None,
            category: None,
            source_ref: None,
            builtin_ref: None,
            tags: None,
            labels: None,
            annotations: None,
            attributes: BTreeMap::new(),
            enabled: true,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_source(mut self, source_ref: impl Into<String>) -> Self {
        self.source_ref = Some(source_ref.into());
        self
    }

    pub fn with_builtin(mut self, builtin_ref: impl Into<String>) -> Self {
        self.builtin_ref = Some(builtin_ref.into());
        self
    }

    /// Store an already-encoded attribute blob
    pub fn with_attribute(mut self, field: &str, raw: impl Into<String>) -> Self {
        self.attributes.insert(field.to_string(), raw.into());
        self
    }

    pub fn attribute(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).map(String::as_str)
    }
}

// =============================================================================
// DECODED ATTRIBUTE VALUES
// =============================================================================

/// One key binding of an editor plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub key: String,
    pub mode: UnionValue,
    pub action: Option<String>,
    pub desc: Option<String>,
}

impl KeyBinding {
    /// Build from a classified object; other shapes are not key bindings.
    pub fn from_union(value: &UnionValue) -> Option<KeyBinding> {
        match value {
            UnionValue::Object(_) => {
                let key = value.member("key").as_scalar()?.to_string();
                let mode = match value.member("mode") {
                    UnionValue::Object(_) => return None,
                    mode @ (UnionValue::Absent | UnionValue::Scalar(_) | UnionValue::List(_)) => {
                        mode.clone()
                    }
                };
                let desc = value
                    .member("desc")
                    .as_scalar()
                    .or_else(|| value.member("description").as_scalar())
                    .map(str::to_string);
                Some(KeyBinding {
                    key,
                    mode,
                    action: value.member("action").as_scalar().map(str::to_string),
                    desc,
                })
            }
            UnionValue::Absent | UnionValue::Scalar(_) | UnionValue::List(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("key".to_string(), Value::String(self.key.clone()));
        if !self.mode.is_absent() {
            map.insert("mode".to_string(), self.mode.to_json());
        }
        if let Some(ref action) = self.action {
            map.insert("action".to_string(), Value::String(action.clone()));
        }
        if let Some(ref desc) = self.desc {
            map.insert("desc".to_string(), Value::String(desc.clone()));
        }
        Value::Object(map)
    }
}

/// A plugin dependency: a bare reference or a reference with pinning details
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    Reference(String),
    Detailed {
        reference: String,
        build: Option<String>,
        version: Option<String>,
        branch: Option<String>,
    },
}

impl Dependency {
    pub fn from_union(value: &UnionValue) -> Option<Dependency> {
        match value {
            UnionValue::Scalar(reference) => Some(Dependency::Reference(reference.clone())),
            UnionValue::Object(_) => {
                let member = |key: &str| value.member(key).as_scalar().map(str::to_string);
                Some(Dependency::Detailed {
                    reference: member("ref")?,
                    build: member("build"),
                    version: member("version"),
                    branch: member("branch"),
                })
            }
            UnionValue::Absent | UnionValue::List(_) => None,
        }
    }

    pub fn reference(&self) -> &str {
        match self {
            Dependency::Reference(reference) | Dependency::Detailed { reference, .. } => reference,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Dependency::Reference(reference) => Value::String(reference.clone()),
            Dependency::Detailed {
                reference,
                build,
                version,
                branch,
            } => {
                let mut map = Map::new();
                map.insert("ref".to_string(), Value::String(reference.clone()));
                for (key, value) in [("build", build), ("version", version), ("branch", branch)] {
                    if let Some(value) = value {
                        map.insert(key.to_string(), Value::String(value.clone()));
                    }
                }
                Value::Object(map)
            }
        }
    }
}

/// An attribute decoded into its native shape
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Flag(bool),
    Integer(i64),
    Union(UnionValue),
    Strings(Vec<String>),
    Keys(Vec<KeyBinding>),
    Dependencies(Vec<Dependency>),
    Code(String),
    Options(Map<String, Value>),
}

impl AttributeValue {
    /// Zero-value check used by the manifest codec's omission rules.
    /// Flags and integers always carry information.
    pub fn is_empty(&self) -> bool {
        match self {
            AttributeValue::Text(text) => text.is_empty(),
            AttributeValue::Code(code) => code.trim().is_empty(),
            AttributeValue::Flag(_) | AttributeValue::Integer(_) => false,
            AttributeValue::Union(value) => value.is_empty(),
            AttributeValue::Strings(items) => items.is_empty(),
            AttributeValue::Keys(keys) => keys.is_empty(),
            AttributeValue::Dependencies(deps) => deps.is_empty(),
            AttributeValue::Options(map) => map.is_empty(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            AttributeValue::Text(text) | AttributeValue::Code(text) => Value::String(text.clone()),
            AttributeValue::Flag(flag) => Value::Bool(*flag),
            AttributeValue::Integer(number) => Value::from(*number),
            AttributeValue::Union(value) => value.to_json(),
            AttributeValue::Strings(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            AttributeValue::Keys(keys) => Value::Array(keys.iter().map(KeyBinding::to_json).collect()),
            AttributeValue::Dependencies(deps) => {
                Value::Array(deps.iter().map(Dependency::to_json).collect())
            }
            AttributeValue::Options(map) => Value::Object(map.clone()),
        }
    }

    /// Canonical stored form (compact JSON)
    pub fn encode(&self) -> String {
        self.to_json().to_string()
    }
}

// =============================================================================
// MANIFEST DOCUMENT
// =============================================================================

/// Portable resource document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: Map<String, Value>,
}

/// Manifest metadata block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Manifest {
    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parses_all_names() {
        for kind in ResourceKind::ALL {
            assert!(kind.as_str().parse::<ResourceKind>().is_ok_and(|k| k == kind));
            assert!(kind.cli_name().parse::<ResourceKind>().is_ok_and(|k| k == kind));
        }
        assert!("Widget".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_key_binding_from_object() {
        let value = UnionValue::classify(&json!({
            "key": "<leader>ff",
            "action": "find_files",
            "description": "Find files"
        }))
        .unwrap_or_default();
        let binding = KeyBinding::from_union(&value);
        assert_eq!(
            binding,
            Some(KeyBinding {
                key: "<leader>ff".to_string(),
                mode: UnionValue::Absent,
                action: Some("find_files".to_string()),
                desc: Some("Find files".to_string()),
            })
        );
    }

    #[test]
    fn test_key_binding_requires_key() {
        let value = UnionValue::classify(&json!({"action": "x"})).unwrap_or_default();
        assert_eq!(KeyBinding::from_union(&value), None);
        assert_eq!(KeyBinding::from_union(&UnionValue::from("<leader>x")), None);
    }

    #[test]
    fn test_dependency_shapes() {
        assert_eq!(
            Dependency::from_union(&UnionValue::from("nvim-lua/plenary.nvim")),
            Some(Dependency::Reference("nvim-lua/plenary.nvim".to_string()))
        );

        let detailed = UnionValue::classify(&json!({"ref": "nvim-telescope/telescope-fzf-native.nvim", "build": "make"}))
            .unwrap_or_default();
        let dep = Dependency::from_union(&detailed);
        assert!(dep.as_ref().is_some_and(|d| d.reference() == "nvim-telescope/telescope-fzf-native.nvim"));
        assert_eq!(
            dep.map(|d| d.to_json()),
            Some(json!({"ref": "nvim-telescope/telescope-fzf-native.nvim", "build": "make"}))
        );
    }

    #[test]
    fn test_attribute_emptiness() {
        assert!(AttributeValue::Strings(Vec::new()).is_empty());
        assert!(AttributeValue::Code("  \n ".to_string()).is_empty());
        assert!(!AttributeValue::Flag(false).is_empty());
        assert!(!AttributeValue::Integer(0).is_empty());
    }

    #[test]
    fn test_record_builder() {
        let record = ResourceRecord::new(ResourceKind::NvimPlugin, "telescope")
            .with_source("nvim-telescope/telescope.nvim")
            .with_attribute("lazy", "true");
        assert!(record.enabled);
        assert_eq!(record.attribute("lazy"), Some("true"));
        assert_eq!(record.attribute("cmd"), None);
    }
}
