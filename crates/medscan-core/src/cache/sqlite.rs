//! SQLite cache store.

use std::path::Path;

use rusqlite::{params, Connection};

use super::{CacheResult, CacheStore};
use crate::models::MedicationRecord;

/// Schema for the SQLite cache store.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS medications (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,   -- insertion order
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    record TEXT NOT NULL,                    -- JSON MedicationRecord
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_medications_name ON medications(name);
"#;

/// Cache persisted in a single SQLite table.
pub struct SqliteStore {
    conn: Connection,
    label: String,
}

impl SqliteStore {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let label = path.as_ref().display().to_string();
        let conn = Connection::open(path)?;
        Self::initialize(conn, label)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> CacheResult<Self> {
        Self::initialize(Connection::open_in_memory()?, ":memory:".into())
    }

    fn initialize(conn: Connection, label: String) -> CacheResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, label })
    }
}

impl CacheStore for SqliteStore {
    fn load(&self) -> CacheResult<Vec<MedicationRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT record FROM medications ORDER BY seq")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row?)?);
        }
        Ok(records)
    }

    fn save(&self, records: &[MedicationRecord]) -> CacheResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM medications", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO medications (code, name, record) VALUES (?1, ?2, ?3)")?;
            for record in records {
                let json = serde_json::to_string(record)?;
                stmt.execute(params![record.code, record.name, json])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.label)
    }
}
