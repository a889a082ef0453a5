use std::io;
use thiserror::Error;

/// Errors that can occur while parsing or validating a manifest document
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Failed to encode manifest as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported apiVersion '{found}' (expected '{expected}')")]
    UnsupportedApiVersion {
        found: String,
        expected: &'static str,
    },

    #[error("Unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Document {index}: {source}")]
    Document {
        index: usize,
        #[source]
        source: Box<ManifestError>,
    },
}

/// Errors raised when a stored attribute blob does not decode into its field shape.
///
/// Only surfaced in strict decode mode; lenient readers drop the field instead.
#[derive(Error, Debug)]
pub enum AttributeError {
    #[error("Malformed stored attribute '{field}': {source}")]
    Malformed {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Attribute '{field}' does not match its shape (expected {expected})")]
    ShapeMismatch {
        field: String,
        expected: &'static str,
    },
}

impl AttributeError {
    pub fn field(&self) -> &str {
        match self {
            AttributeError::Malformed { field, .. } | AttributeError::ShapeMismatch { field, .. } => {
                field
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::*;

    #[test]
    fn test_manifest_error_display() {
        let err = ManifestError::MissingField("metadata.name".to_string());
        assert_eq!(err.to_string(), "Missing required field: metadata.name");
    }

    #[test]
    fn test_document_error_wraps_source() {
        let err = ManifestError::Document {
            index: 2,
            source: Box::new(ManifestError::UnknownKind("Widget".to_string())),
        };
        assert_eq!(err.to_string(), "Document 2: Unknown resource kind: Widget");
    }

    #[test]
    fn test_attribute_error_field() {
        let err = AttributeError::ShapeMismatch {
            field: "cmd".to_string(),
            expected: "a string or a list of strings",
        };
        assert_eq!(err.field(), "cmd");
    }
}
