//! In-memory implementation of the Adapter trait.
//!
//! Keeps everything in one process with no persistence. Values are held in
//! their serialized form so reads behave exactly like the other backends.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AdapterError, Result};
use crate::traits::{decode, encode, next_counter, Adapter, Batch, BatchOp};

/// In-memory adapter. Thread-safe via RwLock.
pub struct MemoryAdapter {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryAdapter {
    /// Create a new empty adapter.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(|_| AdapterError::Poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().map_err(|_| AdapterError::Poisoned)?;
        entries.get(key).map(|text| decode(text)).transpose()
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Value>>> {
        let entries = self.entries.read().map_err(|_| AdapterError::Poisoned)?;
        keys.iter()
            .map(|key| entries.get(key).map(|text| decode(text)).transpose())
            .collect()
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let text = encode(&value)?;
        let mut entries = self.entries.write().map_err(|_| AdapterError::Poisoned)?;
        entries.insert(key.to_string(), text);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| AdapterError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut entries = self.entries.write().map_err(|_| AdapterError::Poisoned)?;
        let next = next_counter(key, entries.get(key).map(String::as_str))?;
        entries.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn reset(&self) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| AdapterError::Poisoned)?;
        entries.clear();
        Ok(())
    }

    async fn exec(&self, ops: Vec<BatchOp>) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| AdapterError::Poisoned)?;

        // Resolve the whole batch against an overlay first so a failing op
        // leaves the map untouched.
        let mut overlay: BTreeMap<String, Option<String>> = BTreeMap::new();
        for op in ops {
            match op {
                BatchOp::Set { key, value } => {
                    overlay.insert(key, Some(encode(&value)?));
                }
                BatchOp::Del { key } => {
                    overlay.insert(key, None);
                }
                BatchOp::Incr { key } => {
                    let current = match overlay.get(&key) {
                        Some(staged) => staged.clone(),
                        None => entries.get(&key).cloned(),
                    };
                    let next = next_counter(&key, current.as_deref())?;
                    overlay.insert(key, Some(next.to_string()));
                }
            }
        }

        for (key, value) in overlay {
            match value {
                Some(text) => {
                    entries.insert(key, text);
                }
                None => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn multi(&self) -> Batch<'_> {
        Batch::new(self)
    }
}
