//! JSON-RPC over HTTP for EVM and Starknet nodes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use starknet_types_core::felt::Felt;

use crate::error::RpcError;
use crate::provider::{CallOutcome, EvmCaller, StarknetCallOutcome, StarknetCaller};

/// Starknet RPC error code for a missing contract.
pub const CONTRACT_NOT_FOUND: i64 = 20;

/// A JSON-RPC reply: either a result or an error object.
#[derive(Clone, Debug, PartialEq)]
pub enum RpcReply {
    Result(Value),
    Error { code: i64, message: String },
}

impl RpcReply {
    /// Interpret a raw JSON-RPC response body.
    pub fn from_body(body: Value) -> Result<Self, RpcError> {
        if let Some(error) = body.get("error") {
            return Ok(Self::Error {
                code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        body.get("result")
            .cloned()
            .map(Self::Result)
            .ok_or_else(|| RpcError::Malformed("missing result".into()))
    }
}

/// A minimal JSON-RPC 2.0 client.
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// A client whose requests give up after `timeout`.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request and wait for its reply.
    pub async fn request(&self, method: &str, params: Value) -> Result<RpcReply, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(url = %self.url, method, id, "json-rpc request");
        let response: Value = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        RpcReply::from_body(response)
    }
}

/// [`EvmCaller`] backed by `eth_call`.
pub struct EvmRpcCaller {
    client: JsonRpcClient,
}

impl EvmRpcCaller {
    pub fn new(url: impl Into<String>) -> Self {
        Self::from_client(JsonRpcClient::new(url))
    }

    pub fn from_client(client: JsonRpcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EvmCaller for EvmRpcCaller {
    async fn call(&self, to: &str, data: &[u8]) -> Result<CallOutcome, RpcError> {
        let params = json!([
            { "to": to, "data": format!("0x{}", hex::encode(data)) },
            "latest"
        ]);
        match self.client.request("eth_call", params).await? {
            RpcReply::Result(Value::String(text)) => {
                let digits = text.strip_prefix("0x").unwrap_or(&text);
                let output = hex::decode(digits)
                    .map_err(|e| RpcError::Malformed(format!("eth_call result: {e}")))?;
                Ok(CallOutcome::Returned(output))
            }
            RpcReply::Result(other) => Err(RpcError::Malformed(format!(
                "eth_call result is not a string: {other}"
            ))),
            RpcReply::Error { message, .. } => Ok(CallOutcome::Reverted(message)),
        }
    }
}

/// [`StarknetCaller`] backed by `starknet_call`.
pub struct StarknetRpcCaller {
    client: JsonRpcClient,
}

impl StarknetRpcCaller {
    pub fn new(url: impl Into<String>) -> Self {
        Self::from_client(JsonRpcClient::new(url))
    }

    pub fn from_client(client: JsonRpcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StarknetCaller for StarknetRpcCaller {
    async fn call(
        &self,
        contract: Felt,
        selector: Felt,
        calldata: Vec<Felt>,
    ) -> Result<StarknetCallOutcome, RpcError> {
        let params = json!({
            "request": {
                "contract_address": format!("{contract:#x}"),
                "entry_point_selector": format!("{selector:#x}"),
                "calldata": calldata.iter().map(|felt| format!("{felt:#x}")).collect::<Vec<_>>(),
            },
            "block_id": "latest",
        });
        match self.client.request("starknet_call", params).await? {
            RpcReply::Result(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .and_then(|text| Felt::from_hex(text).ok())
                        .ok_or_else(|| RpcError::Malformed(format!("not a felt: {item}")))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(StarknetCallOutcome::Returned),
            RpcReply::Result(other) => Err(RpcError::Malformed(format!(
                "starknet_call result is not an array: {other}"
            ))),
            RpcReply::Error { code, .. } if code == CONTRACT_NOT_FOUND => {
                Ok(StarknetCallOutcome::NotDeployed)
            }
            RpcReply::Error { message, .. } => Ok(StarknetCallOutcome::Reverted(message)),
        }
    }
}
