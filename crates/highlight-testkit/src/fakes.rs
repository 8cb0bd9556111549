//! In-process chain callers.
//!
//! Stand-ins for EVM and Starknet nodes so contract-wallet verification
//! can be exercised without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use highlight_verify::eip1271::{LEGACY_MAGIC_VALUE, MAGIC_VALUE};
use highlight_verify::{
    CallOutcome, EvmCaller, Felt, RpcError, StarknetCallOutcome, StarknetCaller,
};

fn magic(value: [u8; 4]) -> CallOutcome {
    let mut output = value.to_vec();
    output.resize(32, 0);
    CallOutcome::Returned(output)
}

/// How a fake contract wallet answers `isValidSignature`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalletBehavior {
    /// Accepts through `isValidSignature(bytes32,bytes)`.
    Modern,
    /// Only implements `isValidSignature(bytes,bytes)`.
    Legacy,
    /// Returns a non-magic value.
    Reject,
}

/// Fake EVM node hosting contract wallets.
///
/// Unknown addresses revert, like a call to an account with no code.
#[derive(Default)]
pub struct FakeEvmWallets {
    wallets: Mutex<HashMap<String, WalletBehavior>>,
    delay: Option<Duration>,
    down: bool,
    calls: AtomicUsize,
}

impl FakeEvmWallets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a wallet at `address`.
    pub fn with_wallet(self, address: &str, behavior: WalletBehavior) -> Self {
        if let Ok(mut wallets) = self.wallets.lock() {
            wallets.insert(address.to_lowercase(), behavior);
        }
        self
    }

    /// Sleep before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with a transport error.
    pub fn unreachable() -> Self {
        Self {
            down: true,
            ..Self::default()
        }
    }

    /// Number of `eth_call`s served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvmCaller for FakeEvmWallets {
    async fn call(&self, to: &str, data: &[u8]) -> Result<CallOutcome, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.down {
            return Err(RpcError::Malformed("node unreachable".into()));
        }

        let behavior = self
            .wallets
            .lock()
            .map_err(|_| RpcError::Malformed("poisoned".into()))?
            .get(&to.to_lowercase())
            .copied();
        let selector = data.get(..4).unwrap_or_default();
        Ok(match behavior {
            None => CallOutcome::Reverted("no code at address".into()),
            Some(WalletBehavior::Reject) => magic([0xde, 0xad, 0xbe, 0xef]),
            Some(WalletBehavior::Modern) if selector == MAGIC_VALUE => magic(MAGIC_VALUE),
            Some(WalletBehavior::Legacy) if selector == LEGACY_MAGIC_VALUE => {
                magic(LEGACY_MAGIC_VALUE)
            }
            Some(_) => CallOutcome::Reverted("function selector not recognized".into()),
        })
    }
}

/// How a fake Starknet account answers `is_valid_signature`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StarknetAccount {
    /// Accepts exactly this signature.
    Expects(Vec<Felt>),
    /// Accepts a Stark ECDSA `[r, s]` over the hash by this public key.
    Key(Felt),
    /// Rejects everything.
    Reject,
}

/// Sign `hash` the way a single-key account does, as `[r, s]`.
pub fn stark_sign(private_key: &Felt, hash: &Felt) -> Vec<Felt> {
    let k = starknet_crypto::rfc6979_generate_k(hash, private_key, None);
    match starknet_crypto::sign(private_key, hash, &k) {
        Ok(signature) => vec![signature.r, signature.s],
        Err(_) => Vec::new(),
    }
}

/// Fake Starknet node hosting account contracts.
#[derive(Default)]
pub struct FakeStarknetAccounts {
    accounts: HashMap<Felt, StarknetAccount>,
    /// The last `(hash, signature)` received.
    last: Mutex<Option<(Felt, Vec<Felt>)>>,
}

impl FakeStarknetAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, address: Felt, account: StarknetAccount) -> Self {
        self.accounts.insert(address, account);
        self
    }

    /// The message hash of the last validation request.
    pub fn last_hash(&self) -> Option<Felt> {
        self.last.lock().ok()?.as_ref().map(|(hash, _)| *hash)
    }
}

#[async_trait]
impl StarknetCaller for FakeStarknetAccounts {
    async fn call(
        &self,
        contract: Felt,
        _selector: Felt,
        calldata: Vec<Felt>,
    ) -> Result<StarknetCallOutcome, RpcError> {
        let Some(account) = self.accounts.get(&contract) else {
            return Ok(StarknetCallOutcome::NotDeployed);
        };
        let (hash, signature) = match calldata.split_first() {
            Some((hash, rest)) if !rest.is_empty() => (*hash, rest[1..].to_vec()),
            _ => return Ok(StarknetCallOutcome::Reverted("bad calldata".into())),
        };
        if let Ok(mut last) = self.last.lock() {
            *last = Some((hash, signature.clone()));
        }

        Ok(match account {
            StarknetAccount::Expects(expected) if *expected == signature => {
                StarknetCallOutcome::Returned(vec![Felt::from(highlight_verify::snip6::VALID)])
            }
            StarknetAccount::Key(public_key)
                if matches!(signature.as_slice(), [r, s]
                    if starknet_crypto::verify(public_key, &hash, r, s).unwrap_or(false)) =>
            {
                StarknetCallOutcome::Returned(vec![Felt::from(highlight_verify::snip6::VALID)])
            }
            _ => StarknetCallOutcome::Returned(vec![Felt::ZERO]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use highlight_verify::eip1271;

    const WALLET: &str = "0x00000000000000000000000000000000000000AA";

    #[tokio::test]
    async fn test_fake_wallet_selectors() {
        let node = FakeEvmWallets::new().with_wallet(WALLET, WalletBehavior::Legacy);
        let modern = eip1271::encode_is_valid_signature(&[0u8; 32], &[1u8; 65]);
        let legacy = eip1271::encode_legacy_is_valid_signature(&[0u8; 32], &[1u8; 65]);

        assert!(matches!(
            node.call(&WALLET.to_lowercase(), &modern).await.unwrap(),
            CallOutcome::Reverted(_)
        ));
        assert_eq!(node.call(WALLET, &legacy).await.unwrap(), magic(LEGACY_MAGIC_VALUE));
        assert_eq!(node.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_contract_reverts() {
        let node = FakeEvmWallets::new();
        assert!(matches!(
            node.call(WALLET, &[0u8; 4]).await.unwrap(),
            CallOutcome::Reverted(_)
        ));
        assert!(FakeEvmWallets::unreachable().call(WALLET, &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_fake_account() {
        let address = Felt::from(0x123u64);
        let node = FakeStarknetAccounts::new()
            .with_account(address, StarknetAccount::Expects(vec![Felt::ONE, Felt::TWO]));

        let ok = node
            .call(address, Felt::ZERO, vec![Felt::THREE, Felt::TWO, Felt::ONE, Felt::TWO])
            .await
            .unwrap();
        assert_eq!(
            ok,
            StarknetCallOutcome::Returned(vec![Felt::from(highlight_verify::snip6::VALID)])
        );
        assert_eq!(node.last_hash(), Some(Felt::THREE));

        let missing = node.call(Felt::ONE, Felt::ZERO, vec![]).await.unwrap();
        assert_eq!(missing, StarknetCallOutcome::NotDeployed);
    }

    #[tokio::test]
    async fn test_key_account_checks_the_hash() {
        let private_key = Felt::from(0xc0ffeeu64);
        let address = Felt::from(0x456u64);
        let node = FakeStarknetAccounts::new().with_account(
            address,
            StarknetAccount::Key(starknet_crypto::get_public_key(&private_key)),
        );
        let hash = Felt::from(0x77u64);
        let signature = stark_sign(&private_key, &hash);

        let mut calldata = vec![hash, Felt::TWO];
        calldata.extend(signature.iter().copied());
        let ok = node.call(address, Felt::ZERO, calldata).await.unwrap();
        assert_eq!(
            ok,
            StarknetCallOutcome::Returned(vec![Felt::from(highlight_verify::snip6::VALID)])
        );

        let mut calldata = vec![Felt::from(0x78u64), Felt::TWO];
        calldata.extend(signature);
        let other = node.call(address, Felt::ZERO, calldata).await.unwrap();
        assert_eq!(other, StarknetCallOutcome::Returned(vec![Felt::ZERO]));
    }
}
