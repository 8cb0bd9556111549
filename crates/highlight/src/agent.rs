//! Agents: address-bound business logic.
//!
//! An [`Agent`] accepts a fixed set of typed-data entrypoints. Each
//! entrypoint's schema is the same one the client signs, keyed by its
//! primary type, and is dispatched to a [`Handler`] registered under the
//! lower-camel-case form of that type (`SetAlias` -> `setAlias`).
//!
//! Agents hold no state between messages. Everything durable goes through
//! the [`Context`], which writes only to the agent's own namespace.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use highlight_core::{primary_type, Domain, Envelope, Event, Types};
use serde_json::{Map, Value};

use crate::error::{HighlightError, Result};
use crate::process::Process;

/// Who sent a message and under which domain.
#[derive(Clone, Copy, Debug)]
pub struct Call<'a> {
    pub domain: &'a Domain,
    pub signer: &'a str,
}

/// Business logic for one entrypoint.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        ctx: &mut Context<'_>,
        message: &Map<String, Value>,
        call: &Call<'_>,
    ) -> Result<()>;
}

/// The view of a [`Process`] handed to a handler.
pub struct Context<'a> {
    agent_id: &'a str,
    process: &'a mut Process,
}

impl<'a> Context<'a> {
    pub fn new(agent_id: &'a str, process: &'a mut Process) -> Self {
        Self { agent_id, process }
    }

    pub fn agent_id(&self) -> &str {
        self.agent_id
    }

    /// Abort the message with `reason` unless `condition` holds.
    pub fn assert(&self, condition: bool, reason: &str) -> Result<()> {
        if condition {
            Ok(())
        } else {
            Err(HighlightError::Assertion(reason.to_string()))
        }
    }

    pub async fn has(&mut self, key: &str) -> Result<bool> {
        self.process.has(self.agent_id, key).await
    }

    /// Read-only lookup in another agent's namespace.
    pub async fn has_in(&mut self, agent: &str, key: &str) -> Result<bool> {
        self.process.has(agent, key).await
    }

    pub async fn get(&mut self, key: &str) -> Result<Option<Value>> {
        self.process.get(self.agent_id, key).await
    }

    /// Read-only lookup in another agent's namespace.
    pub async fn get_from(&mut self, agent: &str, key: &str) -> Result<Option<Value>> {
        self.process.get(agent, key).await
    }

    pub fn write(&mut self, key: &str, value: Value) {
        self.process.write(self.agent_id, key, value);
    }

    pub fn delete(&mut self, key: &str) {
        self.process.delete(self.agent_id, key);
    }

    pub fn emit(&mut self, key: &str, data: Vec<Value>) {
        self.process.emit(Event {
            agent: self.agent_id.to_string(),
            key: key.to_string(),
            data,
        });
    }
}

/// Handler name for a primary type: first character lower-cased.
pub fn handler_name(primary_type: &str) -> String {
    let mut chars = primary_type.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A set of entrypoints and the handlers that serve them.
pub struct Agent {
    id: String,
    entrypoints: BTreeMap<String, Types>,
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl Agent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entrypoints: BTreeMap::new(),
            handlers: HashMap::new(),
        }
    }

    /// The namespace this agent writes to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Accept messages signed with `types`. Returns the primary type.
    pub fn add_entrypoint(&mut self, types: Types) -> Result<String> {
        let primary = primary_type(&types)?;
        self.entrypoints.insert(primary.clone(), types);
        Ok(primary)
    }

    /// Bind `handler` under `name`.
    pub fn add_handler(&mut self, name: impl Into<String>, handler: impl Handler + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Register an entrypoint and its handler in one step.
    pub fn with_entrypoint(mut self, types: Types, handler: impl Handler + 'static) -> Result<Self> {
        let primary = self.add_entrypoint(types)?;
        self.add_handler(handler_name(&primary), handler);
        Ok(self)
    }

    /// The schema registered for `primary_type`.
    pub fn entrypoint(&self, primary_type: &str) -> Option<&Types> {
        self.entrypoints.get(primary_type)
    }

    pub fn entrypoints(&self) -> impl Iterator<Item = &str> {
        self.entrypoints.keys().map(String::as_str)
    }

    /// Run the handler for `envelope` against `process`.
    pub async fn invoke(&self, process: &mut Process, envelope: &Envelope) -> Result<()> {
        let primary = &envelope.primary_type;
        if !self.entrypoints.contains_key(primary) {
            return Err(HighlightError::EntrypointNotFound(primary.clone()));
        }
        let name = handler_name(primary);
        let handler = self
            .handlers
            .get(&name)
            .ok_or(HighlightError::HandlerNotFound(name))?;

        let call = Call {
            domain: &envelope.domain,
            signer: &envelope.signer,
        };
        let mut ctx = Context::new(&self.id, process);
        handler.handle(&mut ctx, &envelope.message, &call).await
    }
}
