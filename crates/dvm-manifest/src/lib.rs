//! DVM Resource Manifests
//!
//! This crate handles the resource types shared by the store, the code
//! generator and the CLI. It provides the storage-shaped `ResourceRecord`,
//! the portable `Manifest` document, per-kind schema descriptors, and the
//! codec that converts between the two.
//!
//! Optional complex record fields are stored as JSON text. Reading them goes
//! through `attributes`, which decodes each blob into its native shape.

pub mod attributes;
pub mod codec;
pub mod errors;
pub mod manifest_writer;
pub mod schema;
pub mod types;
pub mod union;

pub use attributes::{decode_record, Attributes, DecodeMode, DecodedRecord};
pub use codec::{from_manifest, parse_manifests, parse_records, to_manifest, to_manifest_with};
pub use errors::{AttributeError, ManifestError};
pub use schema::{schema, FieldShape, FieldSpec, KindSchema, SourceRule};
pub use types::{
    AttributeValue, Dependency, KeyBinding, Manifest, Metadata, ResourceKind, ResourceRecord,
    API_VERSION,
};
pub use union::UnionValue;

// Re-export manifest file helpers
pub use manifest_writer::{read_from_path, render_yaml, write_to_path};
