//! Database schema for the SQLite object store

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per stored object
CREATE TABLE IF NOT EXISTS objects (
    container TEXT NOT NULL,
    key TEXT NOT NULL,
    body BLOB NOT NULL,
    size INTEGER NOT NULL,
    written_at TEXT NOT NULL,
    PRIMARY KEY (container, key)
);

CREATE INDEX IF NOT EXISTS idx_objects_written_at ON objects(written_at);
"#;

/// Creates the schema if it does not exist yet
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_objects_table_exists_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='objects'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
