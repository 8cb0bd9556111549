//! Ledger data model: envelopes, units, events and storage entries.
//!
//! Field names serialize in camelCase so that a unit read back from storage
//! is byte-identical to the envelope the client signed and submitted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Version tag carried by every committed unit.
pub const UNIT_VERSION: &str = "0x1";

/// A JSON scalar that clients send either as a number or as a string.
///
/// Chain ids are numeric on EVM chains and shortstrings (`SN_MAIN`) on
/// Starknet. The original representation is preserved on round trips.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(u64),
    String(String),
}

impl NumberOrString {
    /// Convert to a JSON value for typed-data encoding.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::from(*n),
            Self::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for NumberOrString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<u64> for NumberOrString {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for NumberOrString {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// The typed-data domain of an envelope.
///
/// `salt` is a single-use nonce, `verifying_contract` selects the agent,
/// and the presence of `revision` marks Starknet (SNIP-12) typed data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<NumberOrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<NumberOrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<NumberOrString>,
}

impl Domain {
    /// Whether this domain describes Starknet typed data.
    pub fn is_starknet(&self) -> bool {
        self.revision.is_some()
    }
}

/// A message signature.
///
/// EVM signatures are a single 65-byte hex string; Starknet account
/// signatures are arrays of felts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signature {
    Hex(String),
    Felts(Vec<String>),
}

/// A signed typed-data message submitted to the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub domain: Domain,
    pub message: Map<String, Value>,
    pub primary_type: String,
    pub signer: String,
    pub signature: Signature,
}

impl Envelope {
    /// The target agent address, if any.
    pub fn verifying_contract(&self) -> Option<&str> {
        self.domain.verifying_contract.as_deref()
    }
}

/// One committed, immutable ledger entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: u64,
    pub version: String,
    /// Unix seconds at commit time.
    pub timestamp: u64,
    pub message: Envelope,
}

impl Unit {
    /// Build a unit with the current version tag.
    pub fn new(id: u64, timestamp: u64, message: Envelope) -> Self {
        Self {
            id,
            version: UNIT_VERSION.to_string(),
            timestamp,
            message,
        }
    }
}

/// An event emitted by an agent, attached to exactly one unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub agent: String,
    pub key: String,
    pub data: Vec<Value>,
}

/// A staged mutation of agent world state. `value: None` is a delete.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub agent: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl StorageEntry {
    pub fn write(agent: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            agent: agent.into(),
            key: key.into(),
            value: Some(value),
        }
    }

    pub fn delete(agent: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            key: key.into(),
            value: None,
        }
    }

    /// The namespaced `state:{agent}:{key}` key.
    pub fn storage_key(&self) -> String {
        crate::keys::state_key(&self.agent, &self.key)
    }
}

/// A committed unit together with its events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitReceipt {
    pub unit: Unit,
    pub events: Vec<Event>,
}
