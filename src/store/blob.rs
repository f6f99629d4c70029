//! Opaque key-value blob store.
//!
//! The engine only requires that each logical key round-trips a JSON
//! document. The durable implementation is a single-table SQLite
//! database; the in-memory implementation backs tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::StoreError;

/// Logical key for the notes collection
pub const KEY_NOTES: &str = "notes";

/// Logical key for the custom-sections collection
pub const KEY_SECTIONS: &str = "sections";

/// Logical key for user settings
pub const KEY_SETTINGS: &str = "settings";

/// Logical key for the note-id → reminder-handle map
pub const KEY_REMINDERS: &str = "reminders";

/// One JSON document per logical key.
pub trait BlobStore: Send + Sync {
    /// Read the document stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the document stored under `key`.
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove the document stored under `key` (no-op if absent).
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// SQLite-backed blob store: a single `kv` table in one database file.
pub struct SqliteBlobStore {
    conn: Mutex<Connection>,
}

impl SqliteBlobStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Persistence("blob store lock poisoned".to_string()))
    }
}

impl BlobStore for SqliteBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// In-memory blob store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Persistence("blob store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Persistence("blob store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Persistence("blob store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(store: &dyn BlobStore) {
        assert_eq!(store.get("missing").unwrap(), None);

        store.put("notes", r#"[{"id":1}]"#).unwrap();
        assert_eq!(store.get("notes").unwrap().unwrap(), r#"[{"id":1}]"#);

        store.put("notes", "[]").unwrap();
        assert_eq!(store.get("notes").unwrap().unwrap(), "[]");

        store.delete("notes").unwrap();
        assert_eq!(store.get("notes").unwrap(), None);

        // Deleting an absent key is a no-op
        store.delete("notes").unwrap();
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryBlobStore::new());
    }

    #[test]
    fn test_sqlite_store() {
        exercise(&SqliteBlobStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("voxnote.db");

        {
            let store = SqliteBlobStore::open(&db_path).unwrap();
            store.put("settings", r#"{"todayHour":20}"#).unwrap();
        }

        let store = SqliteBlobStore::open(&db_path).unwrap();
        assert_eq!(
            store.get("settings").unwrap().unwrap(),
            r#"{"todayHour":20}"#
        );
    }
}
