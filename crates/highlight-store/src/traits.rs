//! Adapter trait: the abstract interface for ledger persistence.
//!
//! This trait keeps the ledger storage-agnostic. Implementations include
//! an in-process map, SQLite and Redis.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AdapterError, Result};

/// One queued batch operation.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Store `value` at `key`.
    Set { key: String, value: Value },
    /// Remove `key`.
    Del { key: String },
    /// Increment the integer at `key`, creating it at 0 first.
    Incr { key: String },
}

impl BatchOp {
    /// The key this operation touches.
    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } | Self::Del { key } | Self::Incr { key } => key,
        }
    }
}

/// The Adapter trait: async key/value storage with atomic batches.
///
/// # Design Notes
///
/// - **Order preserving**: `mget` returns one slot per requested key.
/// - **Atomic batches**: `exec` applies every op or none of them.
/// - **Errors propagate**: no retries happen inside an adapter.
#[async_trait]
pub trait Adapter: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Single-key Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the value stored at `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Get several values at once, in the order of `keys`.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Value>>>;

    /// Store `value` at `key`.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn del(&self, key: &str) -> Result<()>;

    /// Increment the integer at `key` and return the new value.
    ///
    /// A missing key is created at 0 first, so the first call returns 1.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Wipe everything. Test and bootstrap use only.
    async fn reset(&self) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Batch Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply `ops` in order, all or nothing.
    async fn exec(&self, ops: Vec<BatchOp>) -> Result<()>;

    /// Open a batch bound to this adapter.
    fn multi(&self) -> Batch<'_>;
}

/// A queue of operations committed by a single [`Batch::exec`] call.
pub struct Batch<'a> {
    adapter: &'a dyn Adapter,
    ops: Vec<BatchOp>,
}

impl<'a> Batch<'a> {
    /// Create an empty batch for `adapter`.
    pub fn new(adapter: &'a dyn Adapter) -> Self {
        Self {
            adapter,
            ops: Vec::new(),
        }
    }

    /// Queue a `set`.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.ops.push(BatchOp::Set {
            key: key.into(),
            value,
        });
        self
    }

    /// Queue a `del`.
    pub fn del(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(BatchOp::Del { key: key.into() });
        self
    }

    /// Queue an `incr`.
    pub fn incr(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(BatchOp::Incr { key: key.into() });
        self
    }

    /// The queued operations.
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply every queued operation atomically and flush the queue.
    pub async fn exec(&mut self) -> Result<()> {
        let ops = std::mem::take(&mut self.ops);
        if ops.is_empty() {
            return Ok(());
        }
        tracing::debug!(ops = ops.len(), "executing batch");
        self.adapter.exec(ops).await
    }
}

/// Serialize a value to the text form adapters persist.
pub(crate) fn encode(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Parse persisted text back into a value.
pub(crate) fn decode(text: &str) -> Result<Value> {
    Ok(serde_json::from_str(text)?)
}

/// The value following `current` for an `incr` on `key`.
pub(crate) fn next_counter(key: &str, current: Option<&str>) -> Result<i64> {
    let current = match current {
        None => 0,
        Some(text) => decode(text)?
            .as_i64()
            .ok_or_else(|| AdapterError::NotAnInteger(key.to_string()))?,
    };
    current
        .checked_add(1)
        .ok_or_else(|| AdapterError::NotAnInteger(key.to_string()))
}
