//! SQLite implementation of the Adapter trait.
//!
//! The persistent backend for single-node deployments. It uses rusqlite
//! with bundled SQLite, wrapped in async via `tokio::task::spawn_blocking`.
//! A batch runs inside one SQLite transaction.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::{AdapterError, Result};
use crate::migration;
use crate::traits::{decode, encode, next_counter, Adapter, Batch, BatchOp};

/// SQLite-based adapter.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteAdapter {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAdapter {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| AdapterError::Poisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| AdapterError::Task(e.to_string()))?
    }
}

fn read(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?)
}

fn write(conn: &Connection, key: &str, text: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, text],
    )?;
    Ok(())
}

fn remove(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
    Ok(())
}

fn increment(conn: &Connection, key: &str) -> Result<i64> {
    let next = next_counter(key, read(conn, key)?.as_deref())?;
    write(conn, key, &next.to_string())?;
    Ok(next)
}

#[async_trait]
impl Adapter for SqliteAdapter {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();
        self.blocking(move |conn| read(conn, &key)?.map(|text| decode(&text)).transpose())
            .await
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Value>>> {
        let keys = keys.to_vec();
        self.blocking(move |conn| {
            keys.iter()
                .map(|key| read(conn, key)?.map(|text| decode(&text)).transpose())
                .collect()
        })
        .await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let key = key.to_string();
        let text = encode(&value)?;
        self.blocking(move |conn| write(conn, &key, &text)).await
    }

    async fn del(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.blocking(move |conn| remove(conn, &key)).await
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let key = key.to_string();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let next = increment(&tx, &key)?;
            tx.commit()?;
            Ok(next)
        })
        .await
    }

    async fn reset(&self) -> Result<()> {
        self.blocking(|conn| {
            conn.execute("DELETE FROM kv", [])?;
            Ok(())
        })
        .await
    }

    async fn exec(&self, ops: Vec<BatchOp>) -> Result<()> {
        self.blocking(move |conn| {
            // Dropping the transaction without commit rolls it back.
            let tx = conn.transaction()?;
            for op in &ops {
                match op {
                    BatchOp::Set { key, value } => write(&tx, key, &encode(value)?)?,
                    BatchOp::Del { key } => remove(&tx, key)?,
                    BatchOp::Incr { key } => {
                        increment(&tx, key)?;
                    }
                }
            }
            tx.commit()?;
            tracing::debug!(ops = ops.len(), "sqlite batch committed");
            Ok(())
        })
        .await
    }

    fn multi(&self) -> Batch<'_> {
        Batch::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sqlite_adapter_basic() {
        let adapter = SqliteAdapter::open_memory().unwrap();
        assert_eq!(adapter.get("k").await.unwrap(), None);

        adapter.set("k", json!({ "id": 1 })).await.unwrap();
        adapter.set("k", json!({ "id": 2 })).await.unwrap();
        assert_eq!(adapter.get("k").await.unwrap(), Some(json!({ "id": 2 })));

        let keys = vec!["missing".to_string(), "k".to_string()];
        assert_eq!(
            adapter.mget(&keys).await.unwrap(),
            vec![None, Some(json!({ "id": 2 }))]
        );

        adapter.del("k").await.unwrap();
        assert_eq!(adapter.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sqlite_incr() {
        let adapter = SqliteAdapter::open_memory().unwrap();
        assert_eq!(adapter.incr("units:id").await.unwrap(), 1);
        assert_eq!(adapter.incr("units:id").await.unwrap(), 2);
        assert_eq!(adapter.get("units:id").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_sqlite_batch_rolls_back() {
        let adapter = SqliteAdapter::open_memory().unwrap();
        adapter.set("text", json!("abc")).await.unwrap();

        let mut batch = adapter.multi();
        batch.set("a", json!(1)).incr("text");
        assert!(batch.exec().await.is_err());
        assert_eq!(adapter.get("a").await.unwrap(), None);

        let mut batch = adapter.multi();
        batch.set("a", json!(1)).set("a", json!(2)).del("text").incr("n");
        batch.exec().await.unwrap();
        assert_eq!(adapter.get("a").await.unwrap(), Some(json!(2)));
        assert_eq!(adapter.get("text").await.unwrap(), None);
        assert_eq!(adapter.get("n").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("highlight.db");

        {
            let adapter = SqliteAdapter::open(&path).unwrap();
            adapter.set("unit:1", json!({ "id": 1 })).await.unwrap();
        }

        let adapter = SqliteAdapter::open(&path).unwrap();
        assert_eq!(adapter.get("unit:1").await.unwrap(), Some(json!({ "id": 1 })));

        adapter.reset().await.unwrap();
        assert_eq!(adapter.get("unit:1").await.unwrap(), None);
    }
}
