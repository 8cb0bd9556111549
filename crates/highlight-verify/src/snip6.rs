//! SNIP-6 account signature validation.

use starknet_types_core::felt::Felt;
use tracing::debug;

use crate::error::{Rejection, Result};
use crate::provider::{StarknetCallOutcome, StarknetCaller};
use crate::snip12::starknet_keccak;

/// The shortstring `'VALID'` returned by accepting accounts.
pub const VALID: u64 = 0x56414c4944;

/// Entrypoint name of the account validation method.
pub const IS_VALID_SIGNATURE: &str = "is_valid_signature";

/// Calldata for `is_valid_signature(hash, signature)`.
pub fn calldata(hash: Felt, signature: &[Felt]) -> Vec<Felt> {
    let mut data = Vec::with_capacity(signature.len() + 2);
    data.push(hash);
    data.push(Felt::from(signature.len() as u64));
    data.extend_from_slice(signature);
    data
}

/// Ask `account` whether it accepts `signature` for `hash`.
///
/// Only a first return value of `'VALID'` is accepted. Undeployed
/// accounts and reverting calls are rejections; transport failures
/// propagate.
pub async fn verify(
    caller: &dyn StarknetCaller,
    account: Felt,
    hash: Felt,
    signature: &[Felt],
) -> Result<()> {
    let selector = starknet_keccak(IS_VALID_SIGNATURE.as_bytes());
    let valid = Felt::from(VALID);
    match caller.call(account, selector, calldata(hash, signature)).await? {
        StarknetCallOutcome::Returned(values) if values.first() == Some(&valid) => Ok(()),
        StarknetCallOutcome::Returned(_) => Err(Rejection::Snip6Rejected.into()),
        StarknetCallOutcome::Reverted(reason) => {
            debug!(%reason, "is_valid_signature reverted");
            Err(Rejection::Snip6Rejected.into())
        }
        StarknetCallOutcome::NotDeployed => Err(Rejection::ContractNotDeployed.into()),
    }
}
