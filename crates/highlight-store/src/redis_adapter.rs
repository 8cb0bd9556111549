//! Redis implementation of the Adapter trait.
//!
//! Batches are sent as one `MULTI`/`EXEC` pipeline. An optional background
//! task writes a liveness timestamp to [`HEARTBEAT_KEY`] outside of any
//! ledger batch.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::traits::{decode, encode, Adapter, Batch, BatchOp};

/// Key refreshed by the heartbeat task with the current unix millis.
pub const HEARTBEAT_KEY: &str = "heartbeat";

/// Redis-backed adapter.
///
/// The connection manager reconnects transparently; it is cloned per call.
pub struct RedisAdapter {
    conn: ConnectionManager,
    heartbeat: Option<JoinHandle<()>>,
}

impl RedisAdapter {
    /// Connect to the Redis server at `url` (e.g. `redis://127.0.0.1/`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        tracing::info!(url, "connected to redis");
        Ok(Self {
            conn,
            heartbeat: None,
        })
    }

    /// Start refreshing [`HEARTBEAT_KEY`] every `interval`.
    ///
    /// Must be called from within a tokio runtime. Heartbeat failures are
    /// logged and never reach ledger callers.
    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        if let Some(previous) = self.heartbeat.take() {
            previous.abort();
        }
        let mut conn = self.conn.clone();
        self.heartbeat = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as i64)
                    .unwrap_or_default();
                let result: redis::RedisResult<()> = conn.set(HEARTBEAT_KEY, now).await;
                if let Err(error) = result {
                    tracing::warn!(%error, "redis heartbeat failed");
                }
            }
        }));
        self
    }
}

impl Drop for RedisAdapter {
    fn drop(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
    }
}

#[async_trait]
impl Adapter for RedisAdapter {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        raw.map(|text| decode(&text)).transpose()
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Value>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let raw: Vec<Option<String>> = conn.mget(keys).await?;
        raw.into_iter()
            .map(|slot| slot.map(|text| decode(&text)).transpose())
            .collect()
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, encode(&value)?).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let next: i64 = conn.incr(key, 1).await?;
        Ok(next)
    }

    async fn reset(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }

    async fn exec(&self, ops: Vec<BatchOp>) -> Result<()> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in &ops {
            match op {
                BatchOp::Set { key, value } => {
                    pipe.set(key, encode(value)?).ignore();
                }
                BatchOp::Del { key } => {
                    pipe.del(key).ignore();
                }
                BatchOp::Incr { key } => {
                    pipe.incr(key, 1).ignore();
                }
            }
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        tracing::debug!(ops = ops.len(), "redis pipeline committed");
        Ok(())
    }

    fn multi(&self) -> Batch<'_> {
        Batch::new(self)
    }
}
