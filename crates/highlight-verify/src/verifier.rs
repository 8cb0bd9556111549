//! Strategy dispatch for envelope signatures.

use highlight_core::{eip712, Domain, Envelope, NumberOrString, Signature, Types};
use starknet_types_core::felt::Felt;
use tracing::{debug, warn};

use crate::error::{Rejection, Result};
use crate::provider::Providers;
use crate::{ecdsa, eip1271, snip12, snip6};

/// Authenticates envelopes against their claimed signer.
///
/// Verification fails closed: a strategy that cannot run (no provider for
/// the chain, malformed input) counts as a rejection.
#[derive(Clone, Default)]
pub struct SignatureVerifier {
    providers: Providers,
}

impl SignatureVerifier {
    pub fn new(providers: Providers) -> Self {
        Self { providers }
    }

    /// A verifier with no chain access. Only plain ECDSA signatures pass.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// Verify `envelope` under the entrypoint schema `types`.
    pub async fn verify(&self, envelope: &Envelope, types: &Types) -> Result<()> {
        if envelope.domain.is_starknet() {
            self.verify_starknet(envelope, types).await
        } else {
            self.verify_evm(envelope, types).await
        }
    }

    async fn verify_evm(&self, envelope: &Envelope, types: &Types) -> Result<()> {
        let digest = eip712::signing_hash(
            &envelope.domain,
            types,
            &envelope.primary_type,
            &envelope.message,
        )
        .map_err(|e| Rejection::InvalidTypedData(e.to_string()))?;

        let Signature::Hex(text) = &envelope.signature else {
            return Err(Rejection::MalformedSignature("expected a hex string".into()).into());
        };
        let signature = hex::decode(text.strip_prefix("0x").unwrap_or(text))
            .map_err(|e| Rejection::MalformedSignature(e.to_string()))?;

        if ecdsa::verify(&digest, &signature, &envelope.signer) {
            return Ok(());
        }
        debug!(signer = %envelope.signer, "ecdsa mismatch, trying eip-1271");

        if ecdsa::parse_address(&envelope.signer).is_none() {
            return Err(Rejection::InvalidSigner(envelope.signer.clone()).into());
        }
        let chain_id = envelope
            .domain
            .chain_id
            .clone()
            .unwrap_or(NumberOrString::Number(1));
        let Some(caller) = self.providers.evm(&chain_id) else {
            warn!(%chain_id, "no evm provider, cannot check contract wallet");
            return Err(Rejection::NoProvider(chain_id.to_string()).into());
        };
        eip1271::verify(caller, &envelope.signer, &digest, &signature).await
    }

    async fn verify_starknet(&self, envelope: &Envelope, types: &Types) -> Result<()> {
        let account = snip12::felt_from_str(&envelope.signer)
            .map_err(|_| Rejection::InvalidSigner(envelope.signer.clone()))?;
        let hash = snip12::message_hash(
            &envelope.domain,
            types,
            &envelope.primary_type,
            &envelope.message,
            account,
        )
        .map_err(|e| Rejection::InvalidTypedData(e.to_string()))?;

        let Signature::Felts(parts) = &envelope.signature else {
            return Err(Rejection::MalformedSignature("expected an array of felts".into()).into());
        };
        let signature = parts
            .iter()
            .map(|part| snip12::felt_from_str(part))
            .collect::<std::result::Result<Vec<Felt>, _>>()
            .map_err(|e| Rejection::MalformedSignature(e.to_string()))?;

        let Some(chain_id) = envelope.domain.chain_id.as_ref() else {
            return Err(Rejection::InvalidTypedData("starknet domain needs a chainId".into()).into());
        };
        let Some(caller) = self.providers.starknet(chain_id) else {
            warn!(%chain_id, "no starknet provider, cannot check account");
            return Err(Rejection::NoProvider(chain_id.to_string()).into());
        };
        snip6::verify(caller, account, hash, &signature).await
    }
}

/// The identity under which a domain's salt is consumed.
///
/// This is the value the signature commits to, rendered as lowercase `0x`
/// hex: the `bytes32` word on EVM, the felt on Starknet. Spellings that
/// sign identically share one identity. `None` when the domain has no salt.
pub fn canonical_salt(domain: &Domain) -> Result<Option<String>> {
    let Some(salt) = &domain.salt else {
        return Ok(None);
    };
    let word = if domain.is_starknet() {
        snip12::felt_from_value("felt", &salt.to_value()).map(|felt| felt.to_bytes_be())
    } else {
        eip712::salt_word(salt)
    }
    .map_err(|e| Rejection::InvalidTypedData(format!("salt: {e}")))?;
    Ok(Some(format!("0x{}", hex::encode(word))))
}
