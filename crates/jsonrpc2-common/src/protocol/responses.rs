//! jsonrpc2 Response Types
//!
//! This module defines the response envelope and its classification into a
//! success value or a remote failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{Result, RpcError};
use super::jsonrpc::{JsonRpcError, JSONRPC_VERSION};

/// Legacy `error` value that is *not* treated as a failure.
///
/// Some servers answer `{"error": "not found"}` for calls that should resolve
/// with an absent result. This is kept for compatibility with those servers
/// and is a known oddity: an unknown-method reply in this shape resolves
/// successfully.
pub const NOT_FOUND_SENTINEL: &str = "not found";

/// A response envelope as received from the server.
///
/// Parsing is lenient: a body that is not an object (or is missing entirely)
/// is treated as an empty mapping, so it carries neither `result` nor `error`.
///
/// # Classification
///
/// 1. `error` is an object → remote failure built from `message`, `code`, `data`
/// 2. `error` is the string `"not found"` → success
/// 3. `error` is any other truthy value → remote failure carrying its text
/// 4. otherwise → success with `result` (which may be absent)
///
/// # Example
///
/// ```
/// use jsonrpc2_common::protocol::responses::JsonRpcResponse;
/// use serde_json::json;
///
/// let response = JsonRpcResponse::from_value(json!({"jsonrpc": "2.0", "id": "a", "result": 42}));
/// assert_eq!(response.into_result().unwrap(), Some(json!(42)));
///
/// let response = JsonRpcResponse::from_value(json!({"error": "not found"}));
/// assert_eq!(response.into_result().unwrap(), None);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl JsonRpcResponse {
    /// Creates a successful response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.into()),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response carrying a standard error object.
    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.into()),
            id,
            result: None,
            error: serde_json::to_value(error).ok(),
        }
    }

    pub fn from_value(raw: Value) -> Self {
        match raw {
            Value::Object(mut map) => Self {
                jsonrpc: map
                    .remove("jsonrpc")
                    .and_then(|v| v.as_str().map(str::to_owned)),
                id: map.remove("id").unwrap_or(Value::Null),
                result: map.remove("result"),
                error: map.remove("error"),
            },
            _ => Self::default(),
        }
    }

    pub fn into_result(self) -> Result<Option<Value>> {
        match self.error {
            Some(Value::Object(object)) => Err(RpcError::Remote(JsonRpcError::from_object(object))),
            Some(Value::String(text)) if text == NOT_FOUND_SENTINEL => Ok(self.result),
            Some(error) if is_truthy(&error) => {
                let message = match error {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                Err(RpcError::Remote(JsonRpcError::message_only(message)))
            }
            _ => Ok(self.result),
        }
    }
}

// `null`, `false`, `0` and `""` in the error slot all mean "no error".
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
