use hyper::http::Extensions;
use jsonrpc2_common::transport::JsonCodec;
use jsonrpc2_common::CallOptions;
use serde_json::Value;

/// Mutable per-call state threaded through the middleware pipeline.
///
/// Built fresh by [`Client::call`](crate::Client::call) and dropped once the
/// call returns. Any stage may rewrite `method`, `params`, or `options` before
/// calling the next stage, and may set or replace `result` afterwards.
#[derive(Debug)]
pub struct CallContext {
    /// Remote procedure name; the network stage sends whatever is here when it runs
    pub method: String,
    /// Call parameters, already force-array normalized
    pub params: Value,
    pub options: CallOptions,
    /// Set by the network stage on success, or by a middleware directly
    pub result: Option<Value>,
    /// Typed per-call storage for middleware state
    pub extensions: Extensions,
}

impl CallContext {
    pub fn new(method: impl Into<String>, params: Value, options: CallOptions) -> Self {
        let params = JsonCodec::normalize_params(params, options.force_array);

        Self {
            method: method.into(),
            params,
            options,
            result: None,
            extensions: Extensions::new(),
        }
    }
}
