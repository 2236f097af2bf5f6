use serde_json::Value;

use crate::protocol::error::Result;
use crate::protocol::{CallOptions, IdGenerator, JsonRpcRequest, JsonRpcResponse};

/// JSON envelope codec
///
/// Builds outgoing request envelopes and turns raw response bodies into a
/// result value or a remote failure.
///
/// # Example
///
/// ```
/// use jsonrpc2_common::transport::JsonCodec;
/// use jsonrpc2_common::{CallOptions, RandomIds};
/// use serde_json::json;
///
/// let options = CallOptions::default().asynchronous();
/// let request = JsonCodec::encode_request("echo", json!({"n": 42}), &options, &RandomIds);
/// assert_eq!(request.params, json!([{"n": 42}]));
/// assert_eq!(request.id, None);
///
/// let body = JsonCodec::to_bytes(&request).unwrap();
/// let raw = JsonCodec::decode_body(br#"{"jsonrpc":"2.0","id":null,"result":"ok"}"#);
/// assert_eq!(JsonCodec::classify(raw).unwrap(), Some(json!("ok")));
/// # let _ = body;
/// ```
pub struct JsonCodec;

impl JsonCodec {
    /// Wraps non-array params into a one-element array when `force_array` is set.
    pub fn normalize_params(params: Value, force_array: bool) -> Value {
        match params {
            Value::Array(_) => params,
            other if force_array => Value::Array(vec![other]),
            other => other,
        }
    }

    /// Builds the request envelope for one call.
    ///
    /// Applies force-array normalization, attaches the protocol version, and
    /// draws a correlation id from `ids` unless the call is asynchronous.
    pub fn encode_request(
        method: &str,
        params: Value,
        options: &CallOptions,
        ids: &dyn IdGenerator,
    ) -> JsonRpcRequest {
        let params = Self::normalize_params(params, options.force_array);
        Self::envelope(method, params, options, ids)
    }

    /// Builds the envelope from params that are already in their final shape.
    pub fn envelope(
        method: &str,
        params: Value,
        options: &CallOptions,
        ids: &dyn IdGenerator,
    ) -> JsonRpcRequest {
        let id = if options.is_async {
            None
        } else {
            Some(ids.next_id())
        };

        JsonRpcRequest::new(method, params, id)
    }

    /// Serializes a request envelope.
    pub fn to_bytes(request: &JsonRpcRequest) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(request)?)
    }

    /// Decodes a response body.
    ///
    /// An empty (or whitespace-only) body yields `None`. A body that is not
    /// valid JSON is kept as a JSON string, which classifies as an absent
    /// result rather than a failure.
    pub fn decode_body(body: &[u8]) -> Option<Value> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return None;
        }

        match serde_json::from_slice(body) {
            Ok(value) => Some(value),
            Err(_) => Some(Value::String(String::from_utf8_lossy(body).into_owned())),
        }
    }

    /// Classifies a raw response body into a result or a remote failure.
    ///
    /// A missing body is treated as an empty mapping.
    pub fn classify(raw: Option<Value>) -> Result<Option<Value>> {
        raw.map(JsonRpcResponse::from_value)
            .unwrap_or_default()
            .into_result()
    }
}
