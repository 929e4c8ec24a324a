use std::path::Path;
use std::sync::Mutex;

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache connection poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Time-bounded payload cache on SQLite
///
/// Entries are plain JSON blobs keyed by name. Nothing here knows what a
/// notification is; freshness is decided by the caller's `max_age`.
pub struct CacheManager {
    conn: Mutex<Connection>,
}

impl CacheManager {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Throwaway cache, handy for tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS payloads (
                key TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                cached_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Fetch an entry no older than `max_age`
    pub fn get<T: DeserializeOwned>(&self, key: &str, max_age: Duration) -> Result<Option<T>> {
        let conn = self.lock()?;
        let oldest = (Utc::now() - max_age).timestamp_millis();

        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM payloads WHERE key = ?1 AND cached_at >= ?2",
                params![key, oldest],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(data) => {
                debug!("Cache hit for {}", key);
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => {
                debug!("Cache miss for {}", key);
                Ok(None)
            }
        }
    }

    /// Store (or replace) an entry, stamped with the current time
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let data = serde_json::to_string(value)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO payloads (key, data, cached_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET data = excluded.data, cached_at = excluded.cached_at",
            params![key, data, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    pub fn invalidate(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM payloads WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    /// Drop every entry older than `max_age`, returning how many went
    pub fn purge_expired(&self, max_age: Duration) -> Result<usize> {
        let conn = self.lock()?;
        let oldest = (Utc::now() - max_age).timestamp_millis();
        let removed = conn.execute("DELETE FROM payloads WHERE cached_at < ?1", params![oldest])?;
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        Ok(removed)
    }

    #[cfg(test)]
    fn backdate(&self, key: &str, by: Duration) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE payloads SET cached_at = cached_at - ?2 WHERE key = ?1",
            params![key, by.num_milliseconds()],
        )?;
        Ok(())
    }
}
