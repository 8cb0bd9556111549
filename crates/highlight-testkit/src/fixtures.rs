//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use highlight::{AgentRegistry, Highlight};
use highlight_core::eip712::{keccak256, signing_hash};
use highlight_core::{Domain, Envelope, NumberOrString, Signature, Types};
use highlight_store::{Adapter, MemoryAdapter};
use highlight_verify::{ecdsa, SignatureVerifier};
use k256::ecdsa::SigningKey;
use rand::RngCore;
use serde_json::{json, Map, Value};

use crate::agents;

/// Chain id used by fixture envelopes.
pub const CHAIN_ID: u64 = 1;

/// An externally owned EVM account.
#[derive(Clone, Debug)]
pub struct TestWallet {
    key: SigningKey,
}

impl TestWallet {
    /// A deterministic wallet whose private key is `keccak256(seed)`.
    pub fn from_seed(seed: &[u8]) -> Self {
        let key = SigningKey::from_slice(&keccak256(seed))
            .expect("keccak output is a valid secp256k1 scalar");
        Self { key }
    }

    /// A wallet with a random key.
    pub fn random() -> Self {
        Self {
            key: SigningKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// Lowercase `0x` address.
    pub fn address(&self) -> String {
        ecdsa::format_address(&ecdsa::address_of(self.key.verifying_key()))
    }

    /// 65-byte `r || s || v` signature over an EIP-712 digest.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Vec<u8> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .expect("signing a 32-byte digest");
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(27 + recovery_id.to_byte());
        bytes
    }
}

/// A fresh 32-byte hex salt.
pub fn random_salt() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("0x{}", hex::encode(bytes))
}

/// The domain fixture envelopes are signed under.
pub fn domain(agent: &str, salt: &str) -> Domain {
    Domain {
        name: Some("highlight".into()),
        version: Some("0.1.0".into()),
        chain_id: Some(NumberOrString::Number(CHAIN_ID)),
        salt: Some(salt.into()),
        verifying_contract: Some(agent.into()),
        revision: None,
    }
}

/// Build an envelope for `agent` and sign it with `wallet`.
///
/// The signer is the wallet's address; the primary type is taken from
/// `types`.
pub fn sign_envelope(
    wallet: &TestWallet,
    agent: &str,
    types: &Types,
    message: Value,
    salt: &str,
) -> Envelope {
    let primary = highlight_core::primary_type(types).expect("fixture schema has a primary type");
    let message: Map<String, Value> = match message {
        Value::Object(map) => map,
        other => panic!("message must be an object, got {other}"),
    };
    let mut envelope = Envelope {
        domain: domain(agent, salt),
        message,
        primary_type: primary,
        signer: wallet.address(),
        signature: Signature::Hex(String::new()),
    };
    resign(&mut envelope, wallet, types);
    envelope
}

/// Replace the envelope's signature with `wallet`'s, keeping the signer.
pub fn resign(envelope: &mut Envelope, wallet: &TestWallet, types: &Types) {
    let digest = signing_hash(
        &envelope.domain,
        types,
        &envelope.primary_type,
        &envelope.message,
    )
    .expect("fixture message matches its schema");
    envelope.signature = Signature::Hex(format!("0x{}", hex::encode(wallet.sign_digest(&digest))));
}

/// A ledger with the example agents registered.
pub struct TestFixture {
    pub highlight: Highlight,
    pub adapter: Arc<dyn Adapter>,
}

impl TestFixture {
    /// In-memory ledger, ECDSA only.
    pub fn new() -> Self {
        Self::with_adapter(Arc::new(MemoryAdapter::new()))
    }

    pub fn with_adapter(adapter: Arc<dyn Adapter>) -> Self {
        Self::build(adapter, agents::registry(), SignatureVerifier::offline())
    }

    pub fn with_verifier(verifier: SignatureVerifier) -> Self {
        Self::build(Arc::new(MemoryAdapter::new()), agents::registry(), verifier)
    }

    pub fn build(
        adapter: Arc<dyn Adapter>,
        registry: AgentRegistry,
        verifier: SignatureVerifier,
    ) -> Self {
        Self {
            highlight: Highlight::new(adapter.clone(), registry, verifier),
            adapter,
        }
    }

    /// A signed `SetAlias` envelope.
    pub fn set_alias(&self, wallet: &TestWallet, from: &str, alias: &str, salt: &str) -> Envelope {
        sign_envelope(
            wallet,
            agents::ALIASES_ADDRESS,
            &agents::set_alias_types(),
            json!({ "from": from, "alias": alias }),
            salt,
        )
    }

    /// A signed `CreateDiscussion` envelope.
    pub fn create_discussion(
        &self,
        wallet: &TestWallet,
        author: &str,
        title: &str,
        salt: &str,
    ) -> Envelope {
        sign_envelope(
            wallet,
            agents::TOWNHALL_ADDRESS,
            &agents::create_discussion_types(),
            json!({ "author": author, "title": title, "body": "" }),
            salt,
        )
    }

    /// A signed `Vote` envelope.
    pub fn vote(
        &self,
        wallet: &TestWallet,
        voter: &str,
        discussion: u64,
        choice: u64,
        salt: &str,
    ) -> Envelope {
        sign_envelope(
            wallet,
            agents::TOWNHALL_ADDRESS,
            &agents::vote_types(),
            json!({ "voter": voter, "discussion": discussion, "choice": choice }),
            salt,
        )
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
