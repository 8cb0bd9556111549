//! JSON-RPC dispatch for the `hl_*` methods.
//!
//! Transport-agnostic: callers hand in a parsed request (or raw text) and
//! get back a response to serialize however they serve it.

use highlight_core::Envelope;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::HighlightError;
use crate::highlight::Highlight;

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
/// Any ledger error; `data` carries [`HighlightError::kind`].
pub const SERVER_ERROR: i64 = -32000;

/// A JSON-RPC 2.0 request.
#[derive(Clone, Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// The `error` member of a response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(RpcErrorObject {
                code,
                message: message.into(),
                data,
            }),
        }
    }

    fn ledger_error(id: Value, error: HighlightError) -> Self {
        Self::failure(id, SERVER_ERROR, error.to_string(), Some(json!(error.kind())))
    }
}

#[derive(Deserialize)]
struct UnitParams {
    id: Value,
}

/// Dispatch one request against `highlight`.
pub async fn handle(highlight: &Highlight, request: RpcRequest) -> RpcResponse {
    let RpcRequest { id, method, params } = request;
    tracing::debug!(%method, "rpc request");

    match method.as_str() {
        "hl_getMci" => match highlight.get_mci().await {
            Ok(mci) => RpcResponse::success(id, json!(mci)),
            Err(error) => RpcResponse::ledger_error(id, error),
        },
        "hl_getUnitReceipt" => {
            let unit_id = match first_param(params)
                .and_then(|p| serde_json::from_value::<UnitParams>(p).ok())
                .and_then(|p| parse_unit_id(&p.id))
            {
                Some(unit_id) => unit_id,
                None => return RpcResponse::failure(id, INVALID_PARAMS, "expected {id}", None),
            };
            match highlight.get_unit_receipt(unit_id).await {
                Ok(receipt) => to_result(id, &receipt),
                Err(error) => RpcResponse::ledger_error(id, error),
            }
        }
        "hl_postMessage" => {
            let envelope = match first_param(params).map(serde_json::from_value::<Envelope>) {
                Some(Ok(envelope)) => envelope,
                Some(Err(error)) => {
                    return RpcResponse::failure(id, INVALID_PARAMS, error.to_string(), None)
                }
                None => return RpcResponse::failure(id, INVALID_PARAMS, "expected a message", None),
            };
            match highlight.post_message(envelope).await {
                Ok(response) => to_result(id, &response),
                Err(error) => RpcResponse::ledger_error(id, error),
            }
        }
        other => RpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}"), None),
    }
}

/// Parse `text` as a request and dispatch it.
pub async fn handle_text(highlight: &Highlight, text: &str) -> RpcResponse {
    match serde_json::from_str::<RpcRequest>(text) {
        Ok(request) => handle(highlight, request).await,
        Err(error) => RpcResponse::failure(Value::Null, PARSE_ERROR, error.to_string(), None),
    }
}

fn to_result<T: Serialize>(id: Value, value: &T) -> RpcResponse {
    match serde_json::to_value(value) {
        Ok(result) => RpcResponse::success(id, result),
        Err(error) => RpcResponse::ledger_error(id, error.into()),
    }
}

/// Params may be the object itself or a one-element array around it.
fn first_param(params: Value) -> Option<Value> {
    match params {
        Value::Array(items) => items.into_iter().next(),
        Value::Null => None,
        other => Some(other),
    }
}

fn parse_unit_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AgentRegistry;
    use highlight_store::MemoryAdapter;
    use highlight_verify::SignatureVerifier;
    use std::sync::Arc;

    fn empty_ledger() -> Highlight {
        Highlight::new(
            Arc::new(MemoryAdapter::new()),
            AgentRegistry::new(),
            SignatureVerifier::offline(),
        )
    }

    fn request(method: &str, params: Value) -> RpcRequest {
        RpcRequest {
            id: json!(7),
            method: method.into(),
            params,
        }
    }

    #[test]
    fn test_first_param() {
        assert_eq!(first_param(json!([{ "id": 1 }])), Some(json!({ "id": 1 })));
        assert_eq!(first_param(json!({ "id": 1 })), Some(json!({ "id": 1 })));
        assert_eq!(first_param(json!([])), None);
        assert_eq!(first_param(Value::Null), None);
    }

    #[tokio::test]
    async fn test_get_mci() {
        let response = handle(&empty_ledger(), request("hl_getMci", Value::Null)).await;
        assert_eq!(response.id, json!(7));
        assert_eq!(response.result, Some(json!(0)));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = handle(&empty_ledger(), request("hl_nope", Value::Null)).await;
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unit_receipt_errors() {
        let ledger = empty_ledger();

        let missing = handle(&ledger, request("hl_getUnitReceipt", json!([{ "id": 3 }]))).await;
        let error = missing.error.unwrap();
        assert_eq!(error.code, SERVER_ERROR);
        assert_eq!(error.data, Some(json!("UnitNotFound")));

        let malformed = handle(&ledger, request("hl_getUnitReceipt", json!({ "unit": 3 }))).await;
        assert_eq!(malformed.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_post_message_bad_params() {
        let response = handle(&empty_ledger(), request("hl_postMessage", json!([{ "x": 1 }]))).await;
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_handle_text() {
        let ledger = empty_ledger();
        let ok = handle_text(&ledger, r#"{"jsonrpc":"2.0","id":"a","method":"hl_getMci"}"#).await;
        assert_eq!(ok.id, json!("a"));
        assert_eq!(ok.result, Some(json!(0)));

        let bad = handle_text(&ledger, "{not json").await;
        assert_eq!(bad.error.unwrap().code, PARSE_ERROR);
    }

    #[test]
    fn test_response_shape() {
        let response = RpcResponse::failure(json!(1), SERVER_ERROR, "Salt already used", Some(json!("SaltAlreadyUsed")));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32000, "message": "Salt already used", "data": "SaltAlreadyUsed" }
            })
        );
    }
}
