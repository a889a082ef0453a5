//! In-memory `ResourceStore`, used by tests and as a scratch backend.

use crate::{stamp, ResourceStore, StoreError, StoreResult};
use dvm_manifest::{ResourceKind, ResourceRecord};
use parking_lot::RwLock;
use std::collections::BTreeMap;

type Key = (ResourceKind, String);

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<Key, ResourceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with records, stamping each as it is inserted
    pub fn with_records(records: impl IntoIterator<Item = ResourceRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.write();
            for record in records {
                let key = (record.kind, record.name.clone());
                let stamped = stamp(record, map.get(&key));
                map.insert(key, stamped);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl ResourceStore for MemoryStore {
    fn get(&self, kind: ResourceKind, name: &str) -> StoreResult<ResourceRecord> {
        self.records
            .read()
            .get(&(kind, name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(kind, name))
    }

    fn list(&self, kind: ResourceKind) -> StoreResult<Vec<ResourceRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|((record_kind, _), _)| *record_kind == kind)
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn upsert(&self, record: ResourceRecord) -> StoreResult<ResourceRecord> {
        let mut map = self.records.write();
        let key = (record.kind, record.name.clone());
        let stamped = stamp(record, map.get(&key));
        map.insert(key, stamped.clone());
        Ok(stamped)
    }

    fn exists(&self, kind: ResourceKind, name: &str) -> StoreResult<bool> {
        Ok(self.records.read().contains_key(&(kind, name.to_string())))
    }

    fn delete(&self, kind: ResourceKind, name: &str) -> StoreResult<()> {
        self.records
            .write()
            .remove(&(kind, name.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(kind, name))
    }
}
