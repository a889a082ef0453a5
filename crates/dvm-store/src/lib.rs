//! Resource persistence for dvm
//!
//! Records are keyed by `(kind, name)`. Cross-references between records are
//! weak (by name) and are never cascaded by a backend: deleting a record leaves
//! references to it dangling until they are resolved at read time.

use chrono::Utc;
use dvm_manifest::{ResourceKind, ResourceRecord};
use thiserror::Error;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },
    #[error("invalid persisted value for '{field}': {value}")]
    InvalidPersistedValue { field: &'static str, value: String },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Chrono(#[from] chrono::ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_found(kind: ResourceKind, name: &str) -> Self {
        StoreError::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Name-keyed record persistence.
pub trait ResourceStore: Send + Sync {
    /// Fetch one record
    fn get(&self, kind: ResourceKind, name: &str) -> StoreResult<ResourceRecord>;

    /// Every record of a kind, sorted by name
    fn list(&self, kind: ResourceKind) -> StoreResult<Vec<ResourceRecord>>;

    /// Insert or replace a record and return it as stored.
    ///
    /// `updated_at` is set to now; `created_at` is kept from the previous
    /// version when one exists.
    fn upsert(&self, record: ResourceRecord) -> StoreResult<ResourceRecord>;

    fn exists(&self, kind: ResourceKind, name: &str) -> StoreResult<bool>;

    fn delete(&self, kind: ResourceKind, name: &str) -> StoreResult<()>;

    /// Fetch several records, failing on the first missing name
    fn get_many(&self, kind: ResourceKind, names: &[String]) -> StoreResult<Vec<ResourceRecord>> {
        names.iter().map(|name| self.get(kind, name)).collect()
    }
}

/// Stamp timestamps on a record about to be written
pub(crate) fn stamp(mut record: ResourceRecord, previous: Option<&ResourceRecord>) -> ResourceRecord {
    let now = Utc::now();
    record.created_at = previous.and_then(|prev| prev.created_at).or(Some(now));
    record.updated_at = Some(now);
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found(ResourceKind::NvimPlugin, "telescope");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "NvimPlugin 'telescope' not found");
    }

    #[test]
    fn test_stamp_preserves_created_at() {
        let first = stamp(ResourceRecord::new(ResourceKind::NvimPlugin, "a"), None);
        let second = stamp(ResourceRecord::new(ResourceKind::NvimPlugin, "a"), Some(&first));
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
    }
}
