//! jsonrpc2 Transport Layer
//!
//! This module performs the single network exchange behind each call.
//!
//! # Architecture
//!
//! - **Codec**: builds request envelopes and classifies response bodies
//! - **Mode**: `http://…` addresses use HTTP POST, `tcp://host:port` uses a raw socket
//! - **Exchange**: one request out, one response in, bounded by a timeout
//!
//! # Components
//!
//! - **[`JsonCodec`]**: envelope encoding, body decoding, response classification
//! - **[`TransportMode`]**: transport selected from the address scheme
//! - **[`HttpTransport`]**: one POST per call over a shared hyper client
//! - **[`TcpTransport`]**: one connection per call, newline-delimited JSON
//! - **[`NetworkTransport`]**: the default [`Transport`], dispatching on the mode
//!
//! # Timeouts
//!
//! Every adapter maps an elapsed deadline to [`RpcError::Timeout`] so callers
//! can tell "the call timed out" apart from other transport failures.
//!
//! [`RpcError::Timeout`]: crate::protocol::RpcError::Timeout

use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::protocol::error::Result;
use crate::protocol::JsonRpcRequest;

pub mod codec;
pub mod http;
pub mod mode;
pub mod network;
pub mod tcp;

pub use codec::JsonCodec;
pub use http::HttpTransport;
pub use mode::TransportMode;
pub use network::NetworkTransport;
pub use tcp::TcpTransport;


/// Per-exchange parameters derived from the call options.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    /// Effective deadline: the per-call override, or the client default
    pub timeout: Duration,
    /// Extra request headers (HTTP only)
    pub headers: BTreeMap<String, String>,
}

impl Exchange {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            headers: BTreeMap::new(),
        }
    }
}

/// Performs exactly one network exchange for an encoded request.
///
/// Returns the raw response body: `None` when the server sent nothing,
/// otherwise the decoded JSON value. Classification into success or remote
/// failure is left to [`JsonCodec::classify`].
pub trait Transport: Send + Sync {
    fn exchange<'a>(
        &'a self,
        request: &'a JsonRpcRequest,
        exchange: &'a Exchange,
    ) -> BoxFuture<'a, Result<Option<Value>>>;
}
