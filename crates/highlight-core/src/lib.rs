//! # Highlight Core
//!
//! Pure primitives for the Highlight ledger: signed envelopes, committed
//! units, events, storage entries and EIP-712 typed data.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Envelope`] - A signed typed-data message submitted for execution
//! - [`Unit`] - One committed, immutable ledger entry
//! - [`Event`] - An event emitted by an agent while executing a message
//! - [`StorageEntry`] - A staged write or delete in an agent's namespace
//! - [`Types`] - An EIP-712 style `{typeName -> fields}` schema
//!
//! ## Keyspace
//!
//! Everything the ledger persists lives under a handful of key families,
//! see [`keys`].

pub mod eip712;
pub mod error;
pub mod keys;
pub mod typed_data;
pub mod types;

pub use error::{Result, TypedDataError};
pub use typed_data::{base_type, primary_type, struct_dependencies, TypedDataField, Types};
pub use types::{
    Domain, Envelope, Event, NumberOrString, Signature, StorageEntry, Unit, UnitReceipt,
    UNIT_VERSION,
};
