//! # Highlight
//!
//! A signature-authenticated, append-only message ledger.
//!
//! ## Overview
//!
//! Clients submit signed typed-data envelopes. Each envelope targets an
//! [`Agent`] by its `verifyingContract` address and names one of the
//! agent's entrypoints by `primaryType`. The ledger:
//!
//! 1. Verifies the signature (ECDSA, EIP-1271 or SNIP-6)
//! 2. Takes the global lock and consumes the envelope's salt
//! 3. Runs the agent's handler against a fresh [`Process`]
//! 4. Commits state, events and a numbered [`Unit`](core::Unit) atomically
//!
//! Units are immutable. Their receipts are served back unchanged for as
//! long as the store lives, so indexers can replay them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use highlight::{AgentRegistry, Highlight, HighlightConfig};
//!
//! async fn example() -> highlight::Result<()> {
//!     let config = HighlightConfig::load("highlight.toml")?;
//!     let registry = AgentRegistry::new();
//!     // registry.register("0x…", || build_agent());
//!
//!     let ledger = Highlight::new(config.open_adapter().await?, registry, config.build_verifier()?);
//!     println!("mci = {}", ledger.get_mci().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `highlight::core` - envelopes, units, typed data
//! - `highlight::store` - the [`Adapter`](store::Adapter) SPI and backends
//! - `highlight::verify` - signature verification

pub mod agent;
pub mod config;
pub mod error;
pub mod highlight;
pub mod process;
pub mod registry;
pub mod rpc;
pub mod telemetry;

pub use highlight_core as core;
pub use highlight_store as store;
pub use highlight_verify as verify;

pub use agent::{handler_name, Agent, Call, Context, Handler};
pub use config::{HighlightConfig, StorageConfig};
pub use error::{HighlightError, Result};
pub use highlight::{Highlight, Joint, PostMessageResponse};
pub use process::Process;
pub use registry::{AgentFactory, AgentRegistry};
pub use rpc::{RpcErrorObject, RpcRequest, RpcResponse};
pub use telemetry::init_tracing;
