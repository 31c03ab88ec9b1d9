use crate::infrastructure::error::TimesheetError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);";

pub fn initialize_database(path: &Path) -> Result<(), TimesheetError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Small persistent string store for client-side state such as the selected task.
pub trait KeyValueStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, TimesheetError>;
    fn save(&self, key: &str, value: &str) -> Result<(), TimesheetError>;
    fn clear(&self, key: &str) -> Result<(), TimesheetError>;
}

fn normalized_key(key: &str) -> Option<&str> {
    let normalized = key.trim();
    if normalized.is_empty() {
        return None;
    }
    Some(normalized)
}

fn required_key(key: &str) -> Result<&str, TimesheetError> {
    normalized_key(key)
        .ok_or_else(|| TimesheetError::Validation("key-value store key must not be empty".to_string()))
}

#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db_path: PathBuf,
}

impl SqliteKeyValueStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, TimesheetError> {
        Connection::open(&self.db_path).map_err(TimesheetError::from)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>, TimesheetError> {
        let Some(key) = normalized_key(key) else {
            return Ok(None);
        };
        let connection = self.connect()?;
        let value: Option<String> = connection
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), TimesheetError> {
        let key = required_key(key)?;
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), TimesheetError> {
        let Some(key) = normalized_key(key) else {
            return Ok(());
        };
        let connection = self.connect()?;
        connection.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>, TimesheetError> {
        let Some(key) = normalized_key(key) else {
            return Ok(None);
        };
        let values = self
            .values
            .lock()
            .map_err(|error| TimesheetError::poisoned("key-value store", error))?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), TimesheetError> {
        let key = required_key(key)?;
        let mut values = self
            .values
            .lock()
            .map_err(|error| TimesheetError::poisoned("key-value store", error))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), TimesheetError> {
        let Some(key) = normalized_key(key) else {
            return Ok(());
        };
        let mut values = self
            .values
            .lock()
            .map_err(|error| TimesheetError::poisoned("key-value store", error))?;
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_ID: AtomicUsize = AtomicUsize::new(0);

    struct TempDatabase {
        dir: PathBuf,
    }

    impl TempDatabase {
        fn new() -> Self {
            let sequence = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
            let dir = std::env::temp_dir().join(format!(
                "timesheet-kv-{}-{}-{}",
                std::process::id(),
                Utc::now().timestamp_nanos_opt().unwrap_or(0),
                sequence
            ));
            fs::create_dir_all(&dir).expect("create temp directory");
            initialize_database(&dir.join("state.sqlite")).expect("initialize database");
            Self { dir }
        }

        fn path(&self) -> PathBuf {
            self.dir.join("state.sqlite")
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.load("theme").expect("load missing"), None);

        store.save("theme", "dark").expect("save");
        assert_eq!(store.load(" theme ").expect("load trimmed"), Some("dark".to_string()));

        store.save("theme", "light").expect("overwrite");
        assert_eq!(store.load("theme").expect("load overwritten"), Some("light".to_string()));

        store.clear("theme").expect("clear");
        assert_eq!(store.load("theme").expect("load cleared"), None);

        assert!(matches!(store.save("  ", "x"), Err(TimesheetError::Validation(_))));
        assert_eq!(store.load("").expect("empty key"), None);
        store.clear("").expect("clearing empty key is a no-op");
    }

    #[test]
    fn in_memory_store_load_save_clear() {
        exercise(&InMemoryKeyValueStore::default());
    }

    #[test]
    fn sqlite_store_load_save_clear() {
        let temp = TempDatabase::new();
        exercise(&SqliteKeyValueStore::new(temp.path()));
    }

    #[test]
    fn sqlite_store_persists_across_instances() {
        let temp = TempDatabase::new();
        SqliteKeyValueStore::new(temp.path())
            .save("selected_task", "{\"id\":4}")
            .expect("save");
        let reopened = SqliteKeyValueStore::new(temp.path());
        assert_eq!(
            reopened.load("selected_task").expect("load"),
            Some("{\"id\":4}".to_string())
        );
    }
}
