use std::fmt;

use hyper::Uri;

use crate::protocol::error::{Result, RpcError};

/// Transport selected from the address scheme.
///
/// Resolved once when the client is constructed: `tcp://host:port[/path]`
/// selects a raw socket and `http://` selects plain HTTP/1.1. There is no TLS,
/// so `https://` and every other scheme are rejected up front.
///
/// # Example
///
/// ```
/// use jsonrpc2_common::transport::TransportMode;
///
/// let mode = TransportMode::parse("tcp://localhost:4003/rpc").unwrap();
/// assert_eq!(mode, TransportMode::Tcp { host: "localhost".into(), port: 4003 });
///
/// let mode = TransportMode::parse("http://127.0.0.1:8080/rpc").unwrap();
/// assert!(matches!(mode, TransportMode::Http(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMode {
    Http(Uri),
    Tcp { host: String, port: u16 },
}

impl TransportMode {
    pub fn parse(addr: &str) -> Result<Self> {
        let uri: Uri = addr
            .parse()
            .map_err(|e| RpcError::InvalidAddress(format!("'{}': {}", addr, e)))?;

        let scheme = uri
            .scheme_str()
            .ok_or_else(|| RpcError::InvalidAddress(format!("'{}': missing scheme", addr)))?;

        if scheme.eq_ignore_ascii_case("tcp") {
            let host = uri
                .host()
                .map(|host| host.trim_start_matches('[').trim_end_matches(']').to_string())
                .filter(|host| !host.is_empty())
                .ok_or_else(|| RpcError::InvalidAddress(format!("'{}': missing host", addr)))?;
            let port = uri
                .port_u16()
                .ok_or_else(|| RpcError::InvalidAddress(format!("'{}': missing port", addr)))?;

            return Ok(TransportMode::Tcp { host, port });
        }

        if !scheme.eq_ignore_ascii_case("http") {
            return Err(RpcError::InvalidAddress(format!(
                "'{}': unsupported scheme '{}', expected http:// or tcp://",
                addr, scheme
            )));
        }

        if uri.authority().is_none() {
            return Err(RpcError::InvalidAddress(format!("'{}': missing host", addr)));
        }

        Ok(TransportMode::Http(uri))
    }

    pub fn is_tcp(&self) -> bool {
        matches!(self, TransportMode::Tcp { .. })
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Http(uri) => write!(f, "http({})", uri),
            TransportMode::Tcp { host, port } => write!(f, "tcp({}:{})", host, port),
        }
    }
}
