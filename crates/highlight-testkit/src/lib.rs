//! # Highlight Testkit
//!
//! Testing utilities for the Highlight ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: EVM test wallets, envelope signing, a ready-made ledger
//! - **Fakes**: in-process EVM and Starknet callers for contract wallets
//! - **Agents**: the Aliases and Townhall example agents
//! - **Generators**: proptest strategies for salts, addresses and schemas
//! - **Golden vectors**: EIP-712 digests every implementation must match
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use highlight_testkit::{TestFixture, TestWallet};
//!
//! # async fn example() {
//! let fixture = TestFixture::new();
//! let alice = TestWallet::from_seed(b"alice");
//! let envelope = fixture.set_alias(&alice, &alice.address(), "0x00000000000000000000000000000000000000bb", &highlight_testkit::random_salt());
//! let response = fixture.highlight.post_message(envelope).await.unwrap();
//! assert_eq!(response.unit_id, 1);
//! # }
//! ```
//!
//! ## Golden Vectors
//!
//! ```rust
//! use highlight_testkit::vectors::verify_all_vectors;
//!
//! verify_all_vectors();
//! ```

pub mod agents;
pub mod fakes;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fakes::{stark_sign, FakeEvmWallets, FakeStarknetAccounts, StarknetAccount};
pub use fixtures::{random_salt, sign_envelope, TestFixture, TestWallet};
pub use vectors::{all_vectors, verify_all_vectors, TypedDataVector};
