//! SQLite-backed `ResourceStore` with durable persistence.
//!
//! Optional record values live in nullable columns (tags, labels,
//! annotations) or in `resource_attributes` rows. A field that is absent has
//! no row; there is never a row holding an empty placeholder.

use crate::{stamp, ResourceStore, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use dvm_manifest::{ResourceKind, ResourceRecord};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const RESOURCE_COLUMNS: &str = "id, kind, name, description, category, source_ref, builtin_ref, \
     tags, labels, annotations, enabled, created_at, updated_at";

/// Persistent SQLite store backend.
#[derive(Debug)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Creates a SQLite-backed store at `path`, creating schema if needed.
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { db_path };
        let connection = store.open_connection()?;
        initialize_schema(&connection)?;
        debug!("Opened resource store at {:?}", store.db_path);
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open_connection(&self) -> StoreResult<Connection> {
        let connection = Connection::open(&self.db_path)?;
        connection.busy_timeout(Duration::from_secs(5))?;
        connection.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            "#,
        )?;
        Ok(connection)
    }
}

fn initialize_schema(connection: &Connection) -> StoreResult<()> {
    connection.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NULL,
            category TEXT NULL,
            source_ref TEXT NULL,
            builtin_ref TEXT NULL,
            tags TEXT NULL,
            labels TEXT NULL,
            annotations TEXT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (kind, name)
        );

        CREATE TABLE IF NOT EXISTS resource_attributes (
            resource_id INTEGER NOT NULL,
            field TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (resource_id, field),
            FOREIGN KEY(resource_id) REFERENCES resources(id) ON DELETE CASCADE
        );
        "#,
    )?;
    Ok(())
}

/// Resource row before its attributes are attached
struct ResourceRow {
    id: i64,
    record: ResourceRecord,
}

fn read_resource_row(row: &Row<'_>) -> rusqlite::Result<(i64, String, ResourceRecordColumns)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        ResourceRecordColumns {
            name: row.get(2)?,
            description: row.get(3)?,
            category: row.get(4)?,
            source_ref: row.get(5)?,
            builtin_ref: row.get(6)?,
            tags: row.get(7)?,
            labels: row.get(8)?,
            annotations: row.get(9)?,
            enabled: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        },
    ))
}

struct ResourceRecordColumns {
    name: String,
    description: Option<String>,
    category: Option<String>,
    source_ref: Option<String>,
    builtin_ref: Option<String>,
    tags: Option<String>,
    labels: Option<String>,
    annotations: Option<String>,
    enabled: bool,
    created_at: String,
    updated_at: String,
}

fn into_resource_row(raw: (i64, String, ResourceRecordColumns)) -> StoreResult<ResourceRow> {
    let (id, kind, columns) = raw;
    let mut record = ResourceRecord::new(kind_from_db(&kind)?, columns.name);
    record.description = columns.description;
    record.category = columns.category;
    record.source_ref = columns.source_ref;
    record.builtin_ref = columns.builtin_ref;
    record.tags = columns.tags;
    record.labels = columns.labels;
    record.annotations = columns.annotations;
    record.enabled = columns.enabled;
    record.created_at = Some(timestamp_from_db(&columns.created_at)?);
    record.updated_at = Some(timestamp_from_db(&columns.updated_at)?);
    Ok(ResourceRow { id, record })
}

fn load_attributes(connection: &Connection, resource_id: i64) -> StoreResult<BTreeMap<String, String>> {
    let mut statement =
        connection.prepare("SELECT field, value FROM resource_attributes WHERE resource_id = ?1")?;
    let rows = statement.query_map(params![resource_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut attributes = BTreeMap::new();
    for row in rows {
        let (field, value): (String, String) = row?;
        attributes.insert(field, value);
    }
    Ok(attributes)
}

fn find_resource(
    connection: &Connection,
    kind: ResourceKind,
    name: &str,
) -> StoreResult<Option<ResourceRecord>> {
    let raw = connection
        .query_row(
            &format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE kind = ?1 AND name = ?2"),
            params![kind_to_db(kind), name],
            read_resource_row,
        )
        .optional()?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    let ResourceRow { id, mut record } = into_resource_row(raw)?;
    record.attributes = load_attributes(connection, id)?;
    Ok(Some(record))
}

fn write_attributes(transaction: &Transaction<'_>, resource_id: i64, record: &ResourceRecord) -> StoreResult<()> {
    transaction.execute(
        "DELETE FROM resource_attributes WHERE resource_id = ?1",
        params![resource_id],
    )?;
    for (field, value) in &record.attributes {
        transaction.execute(
            "INSERT INTO resource_attributes (resource_id, field, value) VALUES (?1, ?2, ?3)",
            params![resource_id, field, value],
        )?;
    }
    Ok(())
}

impl ResourceStore for SqliteStore {
    fn get(&self, kind: ResourceKind, name: &str) -> StoreResult<ResourceRecord> {
        let connection = self.open_connection()?;
        find_resource(&connection, kind, name)?.ok_or_else(|| StoreError::not_found(kind, name))
    }

    fn list(&self, kind: ResourceKind) -> StoreResult<Vec<ResourceRecord>> {
        let connection = self.open_connection()?;
        let mut statement = connection.prepare(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE kind = ?1 ORDER BY name"
        ))?;
        let rows = statement
            .query_map(params![kind_to_db(kind)], read_resource_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for raw in rows {
            let ResourceRow { id, mut record } = into_resource_row(raw)?;
            record.attributes = load_attributes(&connection, id)?;
            records.push(record);
        }
        Ok(records)
    }

    fn upsert(&self, record: ResourceRecord) -> StoreResult<ResourceRecord> {
        let mut connection = self.open_connection()?;
        let transaction = connection.transaction()?;

        let previous = find_resource(&transaction, record.kind, &record.name)?;
        let record = stamp(record, previous.as_ref());
        let created_at = option_timestamp_to_db(record.created_at);
        let updated_at = option_timestamp_to_db(record.updated_at);

        transaction.execute(
            r#"
            INSERT INTO resources (
                kind, name, description, category, source_ref, builtin_ref,
                tags, labels, annotations, enabled, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT (kind, name) DO UPDATE SET
                description = excluded.description,
                category = excluded.category,
                source_ref = excluded.source_ref,
                builtin_ref = excluded.builtin_ref,
                tags = excluded.tags,
                labels = excluded.labels,
                annotations = excluded.annotations,
                enabled = excluded.enabled,
                updated_at = excluded.updated_at
            "#,
            params![
                kind_to_db(record.kind),
                record.name,
                record.description,
                record.category,
                record.source_ref,
                record.builtin_ref,
                record.tags,
                record.labels,
                record.annotations,
                record.enabled,
                created_at,
                updated_at,
            ],
        )?;

        let resource_id: i64 = transaction.query_row(
            "SELECT id FROM resources WHERE kind = ?1 AND name = ?2",
            params![kind_to_db(record.kind), record.name],
            |row| row.get(0),
        )?;
        write_attributes(&transaction, resource_id, &record)?;
        transaction.commit()?;

        debug!("Upserted {} '{}'", record.kind, record.name);
        Ok(record)
    }

    fn exists(&self, kind: ResourceKind, name: &str) -> StoreResult<bool> {
        let connection = self.open_connection()?;
        let found = connection
            .query_row(
                "SELECT 1 FROM resources WHERE kind = ?1 AND name = ?2",
                params![kind_to_db(kind), name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn delete(&self, kind: ResourceKind, name: &str) -> StoreResult<()> {
        let connection = self.open_connection()?;
        let removed = connection.execute(
            "DELETE FROM resources WHERE kind = ?1 AND name = ?2",
            params![kind_to_db(kind), name],
        )?;
        if removed == 0 {
            return Err(StoreError::not_found(kind, name));
        }
        debug!("Deleted {} '{}'", kind, name);
        Ok(())
    }
}

fn kind_to_db(kind: ResourceKind) -> &'static str {
    kind.cli_name()
}

fn kind_from_db(value: &str) -> StoreResult<ResourceKind> {
    value.parse().map_err(|_| StoreError::InvalidPersistedValue {
        field: "kind",
        value: value.to_string(),
    })
}

fn timestamp_to_db(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

fn option_timestamp_to_db(value: Option<DateTime<Utc>>) -> String {
    timestamp_to_db(value.unwrap_or_else(Utc::now))
}

fn timestamp_from_db(value: &str) -> StoreResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use crate::ResourceStore;
    use dvm_manifest::{ResourceKind, ResourceRecord};
    use tempfile::tempdir;

    fn telescope() -> ResourceRecord {
        let mut record = ResourceRecord::new(ResourceKind::NvimPlugin, "telescope")
            .with_source("nvim-telescope/telescope.nvim")
            .with_attribute("lazy", "true")
            .with_attribute("cmd", "[\"Telescope\"]");
        record.description = Some("Fuzzy finder".to_string());
        record.tags = Some("[\"search\"]".to_string());
        record
    }

    #[test]
    fn persists_records_across_reopen() {
        let temp = tempdir().expect("create tempdir");
        let db_path = temp.path().join("nested").join("dvm.db");

        {
            let store = SqliteStore::new(&db_path).expect("create sqlite store");
            store.upsert(telescope()).expect("upsert telescope");
            store
                .upsert(ResourceRecord::new(ResourceKind::TerminalPlugin, "git").with_builtin("git"))
                .expect("upsert git");
        }

        let reopened = SqliteStore::new(&db_path).expect("reopen sqlite store");
        let record = reopened
            .get(ResourceKind::NvimPlugin, "telescope")
            .expect("load telescope");
        assert_eq!(record.source_ref.as_deref(), Some("nvim-telescope/telescope.nvim"));
        assert_eq!(record.description.as_deref(), Some("Fuzzy finder"));
        assert_eq!(record.tags.as_deref(), Some("[\"search\"]"));
        assert_eq!(record.attribute("cmd"), Some("[\"Telescope\"]"));
        assert!(record.labels.is_none());
        assert!(record.created_at.is_some());

        let git = reopened
            .get(ResourceKind::TerminalPlugin, "git")
            .expect("load git");
        assert_eq!(git.builtin_ref.as_deref(), Some("git"));
        assert!(git.source_ref.is_none());
    }

    #[test]
    fn stored_record_matches_returned_record() {
        let temp = tempdir().expect("create tempdir");
        let store = SqliteStore::new(temp.path().join("dvm.db")).expect("create sqlite store");
        let stored = store.upsert(telescope()).expect("upsert");
        let loaded = store.get(ResourceKind::NvimPlugin, "telescope").expect("get");
        assert_eq!(stored, loaded);
    }

    #[test]
    fn upsert_replaces_attributes_and_keeps_created_at() {
        let temp = tempdir().expect("create tempdir");
        let store = SqliteStore::new(temp.path().join("dvm.db")).expect("create sqlite store");

        let first = store.upsert(telescope()).expect("first upsert");
        let mut replacement = ResourceRecord::new(ResourceKind::NvimPlugin, "telescope")
            .with_source("nvim-telescope/telescope.nvim")
            .with_attribute("event", "\"VeryLazy\"");
        replacement.enabled = false;
        let second = store.upsert(replacement).expect("second upsert");

        assert_eq!(first.created_at, second.created_at);
        let loaded = store.get(ResourceKind::NvimPlugin, "telescope").expect("get");
        assert!(!loaded.enabled);
        assert!(loaded.attribute("lazy").is_none());
        assert_eq!(loaded.attribute("event"), Some("\"VeryLazy\""));
        assert!(loaded.tags.is_none());
    }

    #[test]
    fn list_is_sorted_by_name() {
        let temp = tempdir().expect("create tempdir");
        let store = SqliteStore::new(temp.path().join("dvm.db")).expect("create sqlite store");
        for name in ["zen-mode", "alpha", "mini"] {
            store
                .upsert(ResourceRecord::new(ResourceKind::NvimPlugin, name).with_source(format!("x/{name}")))
                .expect("upsert");
        }
        store
            .upsert(ResourceRecord::new(ResourceKind::NvimTheme, "tokyonight").with_source("folke/tokyonight.nvim"))
            .expect("upsert theme");

        let names: Vec<String> = store
            .list(ResourceKind::NvimPlugin)
            .expect("list")
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mini", "zen-mode"]);
    }

    #[test]
    fn delete_removes_record_and_attributes() {
        let temp = tempdir().expect("create tempdir");
        let store = SqliteStore::new(temp.path().join("dvm.db")).expect("create sqlite store");
        store.upsert(telescope()).expect("upsert");

        store.delete(ResourceKind::NvimPlugin, "telescope").expect("delete");
        assert!(!store.exists(ResourceKind::NvimPlugin, "telescope").expect("exists"));
        assert!(store
            .delete(ResourceKind::NvimPlugin, "telescope")
            .is_err_and(|e| e.is_not_found()));

        store.upsert(ResourceRecord::new(ResourceKind::NvimPlugin, "telescope").with_source("a/b"))
            .expect("re-insert");
        let loaded = store.get(ResourceKind::NvimPlugin, "telescope").expect("get");
        assert!(loaded.attributes.is_empty());
    }
}
