//! JSON-RPC request/response value objects and the 2.0 wire envelope

use crate::error::RpcError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generic JSON-RPC "internal error" code, used for malformed responses
pub const INTERNAL_ERROR: i64 = -32603;

/// A JSON-RPC call: method name plus positional parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Request without parameters
    pub fn method(method: impl Into<String>) -> Self {
        Self::new(method, Vec::new())
    }
}

/// Successful JSON-RPC result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub result: Value,
}

impl RpcResponse {
    pub fn new(result: Value) -> Self {
        Self { result }
    }

    /// Interpret the result as a hex quantity (`"0x1b4"`)
    pub fn as_quantity(&self) -> Option<u64> {
        let hex = self.result.as_str()?.strip_prefix("0x")?;
        u64::from_str_radix(hex, 16).ok()
    }
}

/// Outgoing JSON-RPC 2.0 envelope
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a [Value],
}

impl<'a> Envelope<'a> {
    pub(crate) fn new(id: u64, request: &'a RpcRequest) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: &request.method,
            params: &request.params,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
}

/// Decode a JSON-RPC 2.0 response body received from `url`.
///
/// A present `"result": null` is a valid result (e.g. an unknown receipt).
pub(crate) fn parse_response(url: &str, body: &[u8]) -> Result<RpcResponse, RpcError> {
    let malformed = |message: String| RpcError::Protocol {
        url: url.to_string(),
        code: INTERNAL_ERROR,
        message,
    };

    let mut envelope: serde_json::Map<String, Value> = serde_json::from_slice(body)
        .map_err(|e| malformed(format!("malformed response: {}", e)))?;

    if let Some(error) = envelope.remove("error").filter(|e| !e.is_null()) {
        let error: ErrorObject = serde_json::from_value(error)
            .map_err(|e| malformed(format!("malformed error object: {}", e)))?;
        return Err(RpcError::Protocol {
            url: url.to_string(),
            code: error.code,
            message: error.message,
        });
    }

    envelope
        .remove("result")
        .map(RpcResponse::new)
        .ok_or_else(|| malformed("response carries neither result nor error".to_string()))
}
