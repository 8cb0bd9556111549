//! # Highlight Verify
//!
//! Signature verification for envelopes submitted to the Highlight ledger.
//!
//! ## Overview
//!
//! Three interchangeable strategies authenticate a message against its
//! claimed signer:
//!
//! - **ECDSA**: recover the signer of an EIP-712 digest. Pure and local.
//! - **EIP-1271**: ask a smart-contract wallet whether it accepts the
//!   signature, via an EVM JSON-RPC provider selected by `chainId`.
//! - **SNIP-6**: ask a Starknet account contract to validate the SNIP-12
//!   message hash, via a Starknet JSON-RPC provider.
//!
//! [`SignatureVerifier`] picks the Starknet path when the domain carries a
//! `revision`, otherwise tries ECDSA and falls back to EIP-1271. Anything
//! that does not validate fails closed with
//! [`VerifyError::InvalidSignature`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use highlight_verify::{EvmRpcCaller, Providers, SignatureVerifier};
//!
//! let mut providers = Providers::new();
//! providers.add_evm(1, EvmRpcCaller::new("https://rpc.example.org"));
//! let verifier = SignatureVerifier::new(providers);
//!
//! // verifier.verify(&envelope, &types).await?;
//! ```

pub mod ecdsa;
pub mod eip1271;
pub mod error;
pub mod provider;
pub mod rpc;
pub mod snip12;
pub mod snip6;
pub mod verifier;

pub use error::{Rejection, Result, RpcError, VerifyError};
pub use provider::{CallOutcome, EvmCaller, Providers, StarknetCallOutcome, StarknetCaller};
pub use rpc::{EvmRpcCaller, JsonRpcClient, RpcReply, StarknetRpcCaller};
pub use starknet_types_core::felt::Felt;
pub use verifier::{canonical_salt, SignatureVerifier};
