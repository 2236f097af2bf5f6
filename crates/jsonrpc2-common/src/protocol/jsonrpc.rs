//! JSON-RPC 2.0 Protocol Types
//!
//! Outgoing request envelope and the error object carried by failed responses.
//!
//! # Wire Format
//!
//! - Request format: `{"method": "...", "params": [...], "id": "..." | null, "jsonrpc": "2.0"}`
//! - Error format: `{"code": ..., "message": "...", "data": ...}`
//!
//! The request `id` is a correlation token used for diagnostics only. A `null`
//! id tells the server that no response correlation is expected.
//!
//! # Error Codes
//!
//! Codes are passed through exactly as the server sent them. The standard
//! negative integers (`-32601` method not found, `-32603` internal error,
//! `-32000` to `-32099` server errors) are the common case, but strings and
//! other JSON values are kept as-is.
//!
//! # Example
//!
//! ```
//! use jsonrpc2_common::protocol::jsonrpc::{JsonRpcRequest, JsonRpcError};
//! use serde_json::json;
//!
//! let request = JsonRpcRequest::new("compute", json!([{"n": 100}]), Some("abc".into()));
//! assert_eq!(request.jsonrpc, "2.0");
//!
//! let error = JsonRpcError::method_not_found();
//! assert_eq!(error.code, Some(json!(-32601)));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::requests::RequestId;

/// Protocol version tag attached to every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request
///
/// Field order matches the wire layout: `method`, `params`, `id`, `jsonrpc`.
/// A `None` id is serialized as `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    /// Name of the method to invoke
    pub method: String,
    /// Parameter values (an array unless force-array was disabled)
    pub params: Value,
    /// Correlation id, or `null` for fire-and-forget calls
    pub id: Option<RequestId>,
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: Option<RequestId>) -> Self {
        Self {
            method: method.into(),
            params,
            id,
            jsonrpc: JSONRPC_VERSION.into(),
        }
    }
}

/// JSON-RPC 2.0 error
///
/// Servers in the wild are loose about this object, so every field is
/// optional on the way in: a missing `message` becomes an empty string and a
/// missing or `null` `code` becomes `None`. Any other `code` is kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    /// Error code as sent (standard codes are negative integers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
    /// Short description of the error
    #[serde(default)]
    pub message: String,
    /// Additional data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The method does not exist / is not available
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Internal JSON-RPC error
pub const INTERNAL_ERROR: i64 = -32603;

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(Value::from(code)),
            message: message.into(),
            data: None,
        }
    }

    /// An error with a message and nothing else, as produced by servers that
    /// report `"error": "<text>"` instead of an error object.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Builds an error from the `error` object of a response.
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        let message = match object.remove("message") {
            Some(Value::String(message)) => message,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let code = object.remove("code").filter(|code| !code.is_null());
        let data = object.remove("data").filter(|data| !data.is_null());

        Self { code, message, data }
    }

    /// Create a method not found error (-32601)
    pub fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "Method not found")
    }

    /// Create an internal error (-32603)
    pub fn internal_error(msg: &str) -> Self {
        Self::new(INTERNAL_ERROR, msg)
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
