//! HTTP Transport
//!
//! One JSON-RPC exchange as a single HTTP POST.
//!
//! # Architecture
//!
//! - The request body is the serialized envelope, sent with
//!   `Content-Type: application/json`
//! - An optional `User-Agent` and any per-call headers are attached
//! - The response body is decoded with [`JsonCodec::decode_body`] regardless of
//!   the status code; classification happens later
//! - The whole exchange (connect, send, read body) is bounded by the timeout
//!
//! # Example
//!
//! ```no_run
//! use jsonrpc2_common::transport::{Exchange, HttpTransport};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(Some("jsonrpc2/0.1".into()));
//! let uri = "http://127.0.0.1:8080/rpc".parse()?;
//! let body = br#"{"method":"echo","params":[],"id":"1","jsonrpc":"2.0"}"#.to_vec();
//! let raw = transport.post(&uri, body, &Exchange::new(Duration::from_secs(5))).await?;
//! # let _ = raw;
//! # Ok(())
//! # }
//! ```

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;

use crate::protocol::error::{Result, RpcError};
use crate::transport::codec::JsonCodec;
use crate::transport::Exchange;

/// HTTP transport over a shared hyper client.
///
/// Idle connections are never kept, so every call opens its own connection.
/// Cloning is cheap; clones share the underlying client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    user_agent: Option<String>,
}

impl HttpTransport {
    pub fn new(user_agent: Option<String>) -> Self {
        Self {
            client: Client::builder(TokioExecutor::new())
                .pool_max_idle_per_host(0)
                .build_http(),
            user_agent,
        }
    }

    /// Sends one POST and returns the decoded response body.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Timeout`] if the exchange does not finish within `exchange.timeout`
    /// - [`RpcError::Connection`] if the server cannot be reached
    /// - [`RpcError::Transport`] for any other HTTP-level failure
    pub async fn post(&self, uri: &Uri, body: Vec<u8>, exchange: &Exchange) -> Result<Option<Value>> {
        let request = self.build_request(uri, body, exchange)?;
        let timeout_ms = exchange.timeout.as_millis() as u64;

        let exchange_future = async {
            let response = self.client.request(request).await.map_err(|e| {
                if e.is_connect() {
                    RpcError::Connection(format!("Failed to connect to {}: {}", uri, e))
                } else {
                    RpcError::Transport(format!("HTTP request failed: {}", e))
                }
            })?;

            tracing::debug!(status = %response.status(), "HTTP response received");

            let bytes = response
                .into_body()
                .collect()
                .await
                .map_err(|e| RpcError::Transport(format!("Failed to read response: {}", e)))?
                .to_bytes();

            Ok::<_, RpcError>(bytes)
        };

        let bytes = tokio::time::timeout(exchange.timeout, exchange_future)
            .await
            .map_err(|_| RpcError::Timeout(timeout_ms))??;

        Ok(JsonCodec::decode_body(&bytes))
    }

    fn build_request(
        &self,
        uri: &Uri,
        body: Vec<u8>,
        exchange: &Exchange,
    ) -> Result<Request<Full<Bytes>>> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");

        if let Some(user_agent) = &self.user_agent {
            builder = builder.header(USER_AGENT, user_agent.as_str());
        }

        for (name, value) in &exchange.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| RpcError::Transport(format!("Failed to build request: {}", e)))
    }
}
