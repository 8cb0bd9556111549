//! Chain call abstractions used by the contract-wallet strategies.
//!
//! Both traits are object-safe so that the verifier can hold one provider
//! per chain and tests can substitute in-process fakes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use highlight_core::NumberOrString;
use starknet_types_core::felt::Felt;

use crate::error::RpcError;
use crate::snip12;

/// Result of a read-only EVM call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// The call returned this ABI-encoded data.
    Returned(Vec<u8>),
    /// The call reverted.
    Reverted(String),
}

/// Performs `eth_call` against one EVM chain.
#[async_trait]
pub trait EvmCaller: Send + Sync {
    async fn call(&self, to: &str, data: &[u8]) -> Result<CallOutcome, RpcError>;
}

/// Result of a read-only Starknet call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StarknetCallOutcome {
    Returned(Vec<Felt>),
    Reverted(String),
    /// No contract is deployed at the target address.
    NotDeployed,
}

/// Performs `starknet_call` against one Starknet chain.
#[async_trait]
pub trait StarknetCaller: Send + Sync {
    async fn call(
        &self,
        contract: Felt,
        selector: Felt,
        calldata: Vec<Felt>,
    ) -> Result<StarknetCallOutcome, RpcError>;
}

#[async_trait]
impl<T: EvmCaller + ?Sized> EvmCaller for Arc<T> {
    async fn call(&self, to: &str, data: &[u8]) -> Result<CallOutcome, RpcError> {
        (**self).call(to, data).await
    }
}

#[async_trait]
impl<T: StarknetCaller + ?Sized> StarknetCaller for Arc<T> {
    async fn call(
        &self,
        contract: Felt,
        selector: Felt,
        calldata: Vec<Felt>,
    ) -> Result<StarknetCallOutcome, RpcError> {
        (**self).call(contract, selector, calldata).await
    }
}

/// Chain providers, keyed by chain id.
///
/// EVM chains are keyed by numeric id. Starknet chains are keyed by the
/// felt value of their id, so `SN_MAIN` and `0x534e5f4d41494e` select the
/// same provider.
#[derive(Clone, Default)]
pub struct Providers {
    evm: HashMap<u64, Arc<dyn EvmCaller>>,
    starknet: HashMap<Felt, Arc<dyn StarknetCaller>>,
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the provider for EVM chain `chain_id`.
    pub fn add_evm(&mut self, chain_id: u64, caller: impl EvmCaller + 'static) -> &mut Self {
        self.evm.insert(chain_id, Arc::new(caller));
        self
    }

    /// Register the provider for the Starknet chain named `chain_id`.
    ///
    /// Returns `None` if `chain_id` is neither a felt nor a shortstring.
    pub fn add_starknet(
        &mut self,
        chain_id: &str,
        caller: impl StarknetCaller + 'static,
    ) -> Option<&mut Self> {
        let key = snip12::felt_from_str(chain_id).ok()?;
        self.starknet.insert(key, Arc::new(caller));
        Some(self)
    }

    /// The provider for an envelope's EVM `chainId`.
    pub fn evm(&self, chain_id: &NumberOrString) -> Option<&dyn EvmCaller> {
        let id = match chain_id {
            NumberOrString::Number(n) => *n,
            NumberOrString::String(s) => parse_chain_number(s)?,
        };
        self.evm.get(&id).map(|caller| caller.as_ref())
    }

    /// The provider for an envelope's Starknet `chainId`.
    pub fn starknet(&self, chain_id: &NumberOrString) -> Option<&dyn StarknetCaller> {
        let key = match chain_id {
            NumberOrString::Number(n) => Felt::from(*n),
            NumberOrString::String(s) => snip12::felt_from_str(s).ok()?,
        };
        self.starknet.get(&key).map(|caller| caller.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.evm.is_empty() && self.starknet.is_empty()
    }
}

fn parse_chain_number(text: &str) -> Option<u64> {
    match text.strip_prefix("0x") {
        Some(digits) => u64::from_str_radix(digits, 16).ok(),
        None => text.parse().ok(),
    }
}
