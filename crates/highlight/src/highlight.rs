//! The Highlight orchestrator.
//!
//! Authenticates envelopes, runs them through their agent under one global
//! lock and commits the result as a numbered unit. Unit ids, salt
//! consumption and the commit batch are all decided inside the lock, so
//! commits never interleave.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use highlight_core::keys::{salt_key, unit_events_key, unit_key, MCI_KEY};
use highlight_core::{Envelope, Event, Unit, UnitReceipt};
use highlight_store::{Adapter, AdapterError};
use highlight_verify::SignatureVerifier;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{HighlightError, Result};
use crate::process::Process;
use crate::registry::AgentRegistry;

/// The committed unit, as returned to the submitter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub unit: Unit,
}

/// Outcome of a successful [`Highlight::post_message`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostMessageResponse {
    pub joint: Joint,
    pub events: Vec<Event>,
    pub unit_id: u64,
    pub steps: u64,
}

/// The ledger.
pub struct Highlight {
    adapter: Arc<dyn Adapter>,
    registry: AgentRegistry,
    verifier: SignatureVerifier,
    /// Serializes the salt check, execution and commit of every message.
    post_message: Mutex<()>,
}

impl Highlight {
    pub fn new(
        adapter: Arc<dyn Adapter>,
        registry: AgentRegistry,
        verifier: SignatureVerifier,
    ) -> Self {
        Self {
            adapter,
            registry,
            verifier,
            post_message: Mutex::new(()),
        }
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Write Path
    // ─────────────────────────────────────────────────────────────────────────

    /// Authenticate, execute and commit one signed message.
    ///
    /// Signature verification may call out to a chain and runs before the
    /// lock is taken. The salt is checked again once the lock is held.
    pub async fn post_message(&self, envelope: Envelope) -> Result<PostMessageResponse> {
        let address = envelope
            .verifying_contract()
            .ok_or_else(|| HighlightError::InvalidMessage("missing verifyingContract".into()))?;
        let agent = self.registry.resolve(address)?;
        let types = agent
            .entrypoint(&envelope.primary_type)
            .ok_or_else(|| HighlightError::EntrypointNotFound(envelope.primary_type.clone()))?;
        // Consumed under the value the signature covers, not its spelling.
        let salt = highlight_verify::canonical_salt(&envelope.domain)?
            .ok_or_else(|| HighlightError::InvalidMessage("missing salt".into()))?;

        // Cheap early exit before a possibly slow verification.
        if self.salt_used(&salt).await? {
            return Err(HighlightError::SaltAlreadyUsed);
        }
        if let Err(error) = self.verifier.verify(&envelope, types).await {
            warn!(agent = agent.id(), signer = %envelope.signer, %error, "signature rejected");
            return Err(error.into());
        }

        let _guard = self.post_message.lock().await;

        if self.salt_used(&salt).await? {
            warn!(%salt, "salt consumed while verifying");
            return Err(HighlightError::SaltAlreadyUsed);
        }

        let mut process = Process::new(self.adapter.clone());
        if let Err(error) = agent.invoke(&mut process, &envelope).await {
            debug!(agent = agent.id(), %error, "message rejected by agent");
            return Err(error);
        }

        let id = self.get_mci().await? + 1;
        let unit = Unit::new(id, now_secs(), envelope);
        let events = process.events().to_vec();

        let mut batch = self.adapter.multi();
        process.stage(&mut batch);
        batch
            .set(unit_key(id), serde_json::to_value(&unit)?)
            .set(unit_events_key(id), serde_json::to_value(&events)?)
            .set(MCI_KEY, json!(id))
            .set(salt_key(&salt), json!(true));
        batch.exec().await?;

        info!(
            unit_id = id,
            agent = agent.id(),
            steps = process.steps(),
            events = events.len(),
            "unit committed"
        );
        Ok(PostMessageResponse {
            joint: Joint { unit },
            events,
            unit_id: id,
            steps: process.steps(),
        })
    }

    async fn salt_used(&self, salt: &str) -> Result<bool> {
        Ok(self.adapter.get(&salt_key(salt)).await?.is_some())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read Path
    // ─────────────────────────────────────────────────────────────────────────

    /// A committed unit and its events.
    pub async fn get_unit_receipt(&self, id: u64) -> Result<UnitReceipt> {
        let keys = [unit_key(id), unit_events_key(id)];
        let mut slots = self.adapter.mget(&keys).await?.into_iter();
        let unit = slots
            .next()
            .flatten()
            .ok_or(HighlightError::UnitNotFound(id))?;
        let events = match slots.next().flatten() {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter(|item| !item.is_null())
                .map(serde_json::from_value)
                .collect::<std::result::Result<Vec<Event>, _>>()?,
            _ => Vec::new(),
        };

        Ok(UnitReceipt {
            unit: serde_json::from_value(unit)?,
            events,
        })
    }

    /// Id of the latest committed unit, 0 before the first commit.
    pub async fn get_mci(&self) -> Result<u64> {
        match self.adapter.get(MCI_KEY).await? {
            None => Ok(0),
            Some(value) => value
                .as_u64()
                .ok_or_else(|| AdapterError::NotAnInteger(MCI_KEY.to_string()).into()),
        }
    }

    /// Wipe all ledger state.
    pub async fn reset(&self) -> Result<()> {
        warn!("resetting ledger state");
        Ok(self.adapter.reset().await?)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, Call, Context, Handler};
    use async_trait::async_trait;
    use highlight_core::eip712;
    use highlight_core::{Domain, NumberOrString, Signature, TypedDataField, Types};
    use highlight_store::MemoryAdapter;
    use k256::ecdsa::SigningKey;
    use serde_json::Map;

    const AGENT: &str = "0x0000000000000000000000000000000000000007";

    struct Ping;

    #[async_trait]
    impl Handler for Ping {
        async fn handle(
            &self,
            ctx: &mut Context<'_>,
            message: &Map<String, Value>,
            _call: &Call<'_>,
        ) -> Result<()> {
            let note = message.get("note").cloned().unwrap_or(Value::Null);
            ctx.assert(note != json!("forbidden"), "Forbidden note")?;
            ctx.emit("ping", vec![note]);
            Ok(())
        }
    }

    fn ping_types() -> Types {
        let mut types = Types::new();
        types.insert("Ping".into(), vec![TypedDataField::new("note", "string")]);
        types
    }

    fn ledger() -> Highlight {
        let mut registry = AgentRegistry::new();
        registry.register(AGENT, || Agent::new("pinger").with_entrypoint(ping_types(), Ping));
        Highlight::new(
            Arc::new(MemoryAdapter::new()),
            registry,
            SignatureVerifier::offline(),
        )
    }

    fn signed(note: &str, salt: u8) -> Envelope {
        let key = SigningKey::from_slice(&eip712::keccak256(b"pinger")).unwrap();
        let signer = highlight_verify::ecdsa::format_address(&highlight_verify::ecdsa::address_of(
            key.verifying_key(),
        ));
        let domain = Domain {
            name: Some("highlight".into()),
            version: Some("0.1.0".into()),
            chain_id: Some(NumberOrString::Number(1)),
            salt: Some(format!("0x{salt:064x}").as_str().into()),
            verifying_contract: Some(AGENT.into()),
            revision: None,
        };
        let message = json!({ "note": note }).as_object().unwrap().clone();
        let digest = eip712::signing_hash(&domain, &ping_types(), "Ping", &message).unwrap();
        let (sig, recid) = key.sign_prehash_recoverable(&digest).unwrap();
        let mut bytes = sig.to_bytes().to_vec();
        bytes.push(27 + recid.to_byte());

        Envelope {
            domain,
            message,
            primary_type: "Ping".into(),
            signer,
            signature: Signature::Hex(format!("0x{}", hex::encode(bytes))),
        }
    }

    #[tokio::test]
    async fn test_genesis_and_first_commit() {
        let highlight = ledger();
        assert_eq!(highlight.get_mci().await.unwrap(), 0);

        let response = highlight.post_message(signed("hi", 1)).await.unwrap();
        assert_eq!(response.unit_id, 1);
        assert_eq!(response.joint.unit.id, 1);
        assert_eq!(response.joint.unit.version, "0x1");
        assert_eq!(response.steps, 1);
        assert_eq!(highlight.get_mci().await.unwrap(), 1);

        let receipt = highlight.get_unit_receipt(1).await.unwrap();
        assert_eq!(receipt.unit, response.joint.unit);
        assert_eq!(receipt.events, response.events);
    }

    #[tokio::test]
    async fn test_salt_reuse() {
        let highlight = ledger();
        highlight.post_message(signed("a", 1)).await.unwrap();
        let result = highlight.post_message(signed("b", 1)).await;
        assert!(matches!(result, Err(HighlightError::SaltAlreadyUsed)));
        assert_eq!(highlight.get_mci().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_assertion_leaves_no_trace() {
        let highlight = ledger();
        let result = highlight.post_message(signed("forbidden", 2)).await;
        assert_eq!(result.unwrap_err().to_string(), "Forbidden note");
        assert_eq!(highlight.get_mci().await.unwrap(), 0);
        assert!(highlight.adapter().get(&format!("salts:0x{:064x}", 2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tampered_envelope_is_rejected() {
        let highlight = ledger();
        let mut envelope = signed("hi", 3);
        envelope.message.insert("note".into(), json!("changed"));
        let result = highlight.post_message(envelope).await;
        assert!(matches!(result, Err(HighlightError::InvalidSignature { .. })));
    }

    #[tokio::test]
    async fn test_missing_salt_and_unknown_targets() {
        let highlight = ledger();

        let mut no_salt = signed("hi", 4);
        no_salt.domain.salt = None;
        assert!(matches!(
            highlight.post_message(no_salt).await,
            Err(HighlightError::InvalidMessage(_))
        ));

        let mut elsewhere = signed("hi", 5);
        elsewhere.domain.verifying_contract = Some("0x00000000000000000000000000000000000000ff".into());
        assert!(matches!(
            highlight.post_message(elsewhere).await,
            Err(HighlightError::AgentNotFound(_))
        ));

        let mut unknown = signed("hi", 6);
        unknown.primary_type = "Pong".into();
        assert!(matches!(
            highlight.post_message(unknown).await,
            Err(HighlightError::EntrypointNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_salt_is_consumed_by_value() {
        let highlight = ledger();
        let envelope = signed("hi", 0xab);
        highlight.post_message(envelope.clone()).await.unwrap();

        let mut upper = envelope.clone();
        upper.domain.salt = Some(format!("0x{:064X}", 0xab).as_str().into());
        assert!(matches!(
            highlight.post_message(upper).await,
            Err(HighlightError::SaltAlreadyUsed)
        ));

        let mut integer = envelope;
        integer.domain.salt = Some(NumberOrString::Number(0xab));
        assert!(matches!(
            highlight.post_message(integer).await,
            Err(HighlightError::SaltAlreadyUsed)
        ));

        let mut short = signed("hi", 9);
        short.domain.salt = Some("0x09".into());
        assert!(matches!(
            highlight.post_message(short).await,
            Err(HighlightError::InvalidSignature { .. })
        ));
        assert_eq!(highlight.get_mci().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unit_not_found() {
        let highlight = ledger();
        assert!(matches!(
            highlight.get_unit_receipt(9).await,
            Err(HighlightError::UnitNotFound(9))
        ));
    }

    #[tokio::test]
    async fn test_receipt_drops_null_events() {
        let highlight = ledger();
        highlight.post_message(signed("hi", 7)).await.unwrap();
        let stored = json!([null, { "agent": "pinger", "key": "ping", "data": ["hi"] }, null]);
        highlight.adapter().set("unit_events:1", stored).await.unwrap();

        let receipt = highlight.get_unit_receipt(1).await.unwrap();
        assert_eq!(receipt.events.len(), 1);
        assert_eq!(receipt.events[0].key, "ping");
    }

    #[tokio::test]
    async fn test_reset() {
        let highlight = ledger();
        highlight.post_message(signed("hi", 8)).await.unwrap();
        highlight.reset().await.unwrap();
        assert_eq!(highlight.get_mci().await.unwrap(), 0);
    }
}
