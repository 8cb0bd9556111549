//! EIP-1271 contract-wallet signature validation.
//!
//! The modern `isValidSignature(bytes32,bytes)` is tried first. Wallets
//! that predate it implement `isValidSignature(bytes,bytes)`, which takes
//! the digest as a dynamic `bytes` argument and answers with its own magic
//! value.

use tracing::debug;

use crate::error::{Rejection, Result};
use crate::provider::{CallOutcome, EvmCaller};

/// Selector and magic value of `isValidSignature(bytes32,bytes)`.
pub const MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// Selector and magic value of `isValidSignature(bytes,bytes)`.
pub const LEGACY_MAGIC_VALUE: [u8; 4] = [0x20, 0xc1, 0x3b, 0x0b];

/// Calldata for `isValidSignature(bytes32 hash, bytes signature)`.
pub fn encode_is_valid_signature(hash: &[u8; 32], signature: &[u8]) -> Vec<u8> {
    let mut data = MAGIC_VALUE.to_vec();
    data.extend_from_slice(hash);
    data.extend_from_slice(&word(64));
    append_bytes(&mut data, signature);
    data
}

/// Calldata for `isValidSignature(bytes data, bytes signature)`.
pub fn encode_legacy_is_valid_signature(payload: &[u8], signature: &[u8]) -> Vec<u8> {
    let mut data = LEGACY_MAGIC_VALUE.to_vec();
    data.extend_from_slice(&word(64));
    data.extend_from_slice(&word(64 + 32 + padded_len(payload)));
    append_bytes(&mut data, payload);
    append_bytes(&mut data, signature);
    data
}

/// Ask the contract at `signer` whether it accepts `signature` for `digest`.
pub async fn verify(
    caller: &dyn EvmCaller,
    signer: &str,
    digest: &[u8; 32],
    signature: &[u8],
) -> Result<()> {
    let modern = encode_is_valid_signature(digest, signature);
    if returns_magic(caller.call(signer, &modern).await?, &MAGIC_VALUE) {
        return Ok(());
    }

    let legacy = encode_legacy_is_valid_signature(digest, signature);
    if returns_magic(caller.call(signer, &legacy).await?, &LEGACY_MAGIC_VALUE) {
        return Ok(());
    }

    debug!(signer, "contract wallet rejected signature");
    Err(Rejection::Eip1271Rejected.into())
}

fn returns_magic(outcome: CallOutcome, magic: &[u8; 4]) -> bool {
    match outcome {
        CallOutcome::Returned(output) => output.len() >= 4 && output[..4] == magic[..],
        CallOutcome::Reverted(reason) => {
            debug!(%reason, "isValidSignature reverted");
            false
        }
    }
}

fn word(value: usize) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&(value as u64).to_be_bytes());
    out
}

fn padded_len(bytes: &[u8]) -> usize {
    bytes.len().div_ceil(32) * 32
}

fn append_bytes(data: &mut Vec<u8>, bytes: &[u8]) {
    data.extend_from_slice(&word(bytes.len()));
    data.extend_from_slice(bytes);
    data.resize(data.len() + padded_len(bytes) - bytes.len(), 0);
}
