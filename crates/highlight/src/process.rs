//! Per-message staging area.
//!
//! A [`Process`] collects the writes, deletes and events of one message
//! execution and meters how much work the handler did. Nothing reaches the
//! adapter until the process is committed.

use std::collections::HashMap;
use std::sync::Arc;

use highlight_core::keys::state_key;
use highlight_core::{Event, StorageEntry};
use highlight_store::{Adapter, Batch};
use serde_json::Value;

use crate::error::Result;

/// Staged effects of one message execution.
pub struct Process {
    adapter: Arc<dyn Adapter>,
    writes: Vec<StorageEntry>,
    events: Vec<Event>,
    /// Namespaced key -> staged value; `None` is a staged delete.
    cache: HashMap<String, Option<Value>>,
    steps: u64,
}

impl Process {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            adapter,
            writes: Vec::new(),
            events: Vec::new(),
            cache: HashMap::new(),
            steps: 0,
        }
    }

    /// Read `key` in `agent`'s namespace.
    ///
    /// Keys staged during this execution are served locally for free;
    /// anything else costs one step and an adapter read.
    pub async fn get(&mut self, agent: &str, key: &str) -> Result<Option<Value>> {
        let namespaced = state_key(agent, key);
        if let Some(staged) = self.cache.get(&namespaced) {
            return Ok(staged.clone());
        }
        self.steps += 1;
        Ok(self.adapter.get(&namespaced).await?)
    }

    /// Whether `key` holds a non-null value. Always costs one step, on top
    /// of whatever the underlying [`get`](Self::get) charges.
    pub async fn has(&mut self, agent: &str, key: &str) -> Result<bool> {
        self.steps += 1;
        Ok(self
            .get(agent, key)
            .await?
            .is_some_and(|value| !value.is_null()))
    }

    /// Stage a write.
    pub fn write(&mut self, agent: &str, key: &str, value: Value) {
        self.stage_entry(StorageEntry::write(agent, key, value));
    }

    /// Stage a delete.
    pub fn delete(&mut self, agent: &str, key: &str) {
        self.stage_entry(StorageEntry::delete(agent, key));
    }

    fn stage_entry(&mut self, entry: StorageEntry) {
        self.cache.insert(entry.storage_key(), entry.value.clone());
        self.writes.push(entry);
    }

    /// Record an event. Costs one step.
    pub fn emit(&mut self, event: Event) {
        self.steps += 1;
        self.events.push(event);
    }

    pub fn writes(&self) -> &[StorageEntry] {
        &self.writes
    }

    /// Events in emission order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Queue the staged writes, in staging order, onto `batch`.
    pub fn stage(&self, batch: &mut Batch<'_>) {
        for entry in &self.writes {
            match &entry.value {
                Some(value) => batch.set(entry.storage_key(), value.clone()),
                None => batch.del(entry.storage_key()),
            };
        }
    }

    /// Commit the staged writes in one batch and return the events.
    ///
    /// A process that only emitted events never touches storage.
    pub async fn execute(self) -> Result<Vec<Event>> {
        if !self.writes.is_empty() {
            let mut batch = self.adapter.multi();
            self.stage(&mut batch);
            batch.exec().await?;
        }
        Ok(self.events)
    }
}
