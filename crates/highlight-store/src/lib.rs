//! # Highlight Store
//!
//! Storage abstraction for the Highlight ledger. Every byte the ledger
//! persists goes through the [`Adapter`] trait, so backends are swappable.
//!
//! ## Key Types
//!
//! - [`Adapter`] - The async key/value trait with atomic batches
//! - [`Batch`] - Queued `set`/`del`/`incr` operations applied by one `exec`
//! - [`MemoryAdapter`] - In-process map, for tests and single-process use
//! - [`SqliteAdapter`] - SQLite-backed persistent storage
//! - [`RedisAdapter`] - Redis-backed storage with pipelined batches
//!
//! ## Usage
//!
//! ```rust,no_run
//! use highlight_store::{Adapter, MemoryAdapter};
//! use serde_json::json;
//!
//! async fn example() {
//!     let adapter = MemoryAdapter::new();
//!
//!     let mut batch = adapter.multi();
//!     batch.set("state:aliases:0xdef", json!("0xabc"));
//!     batch.incr("units:id");
//!     batch.exec().await.unwrap();
//!
//!     assert_eq!(adapter.get("units:id").await.unwrap(), Some(json!(1)));
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Opaque values**: values are JSON; adapters store the serialized text
//!   and parse it back on read.
//! - **All-or-nothing batches**: `exec` applies every queued op or none.
//! - **No retries**: I/O failures surface as [`AdapterError`].

pub mod error;
pub mod memory;
pub mod migration;
pub mod redis_adapter;
pub mod sqlite;
pub mod traits;

pub use error::{AdapterError, Result};
pub use memory::MemoryAdapter;
pub use redis_adapter::RedisAdapter;
pub use sqlite::SqliteAdapter;
pub use traits::{Adapter, Batch, BatchOp};
