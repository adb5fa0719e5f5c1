//! SQLite object store
//!
//! Keeps every batch as a BLOB row keyed by `(container, key)`. A put commits
//! before it returns, so a successful put is durable.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{validate_key, ObjectStore, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("sqlite connection lock poisoned".to_string()))
    }
}

impl ObjectStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn put(&self, container: &str, key: &str, body: &[u8]) -> StorageResult<()> {
        validate_key(container)?;
        validate_key(key)?;

        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO objects (container, key, body, size, written_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(container, key) DO UPDATE SET
                body = excluded.body,
                size = excluded.size,
                written_at = excluded.written_at",
            params![container, key, body, body.len() as i64, now],
        )?;
        Ok(())
    }

    fn get(&self, container: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let conn = self.lock()?;
        let body = conn
            .query_row(
                "SELECT body FROM objects WHERE container = ?1 AND key = ?2",
                params![container, key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(body)
    }

    fn list(&self, container: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT key FROM objects
             WHERE container = ?1 AND substr(key, 1, length(?2)) = ?2
             ORDER BY key",
        )?;

        let keys = stmt
            .query_map(params![container, prefix], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}
