use crate::errors::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Durable key-value namespace shared by the Persistence Gateway (client
/// state) and the Remote Service Facade (backend-simulation state) under
/// disjoint keys.
#[derive(Debug)]
pub struct KvStore {
    conn: Mutex<Connection>,
}

impl KvStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Storage(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn get(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn put(&self, key: &str, value: &str) -> AppResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("storage mutex poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::KvStore;

    #[test]
    fn put_get_delete_round_trip() {
        let store = KvStore::open_in_memory().expect("open");
        assert_eq!(store.get("missing").expect("get"), None);

        store.put("console-state", "{\"version\":1}").expect("put");
        assert_eq!(
            store.get("console-state").expect("get"),
            Some("{\"version\":1}".to_string())
        );

        store.put("console-state", "{\"version\":2}").expect("overwrite");
        assert_eq!(
            store.get("console-state").expect("get"),
            Some("{\"version\":2}".to_string())
        );

        store.delete("console-state").expect("delete");
        assert_eq!(store.get("console-state").expect("get"), None);
    }

    #[test]
    fn disjoint_keys_do_not_collide() {
        let store = KvStore::open_in_memory().expect("open");
        store.put("api-leads-data", "[]").expect("put");
        store.put("console-state", "{}").expect("put");
        assert_eq!(store.get("api-leads-data").expect("get"), Some("[]".to_string()));
        assert_eq!(store.get("console-state").expect("get"), Some("{}".to_string()));
    }

    #[test]
    fn opens_on_disk_creating_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("console.db");
        let store = KvStore::open(&path).expect("open");
        store.put("k", "v").expect("put");
        drop(store);

        let reopened = KvStore::open(&path).expect("reopen");
        assert_eq!(reopened.get("k").expect("get"), Some("v".to_string()));
    }
}
