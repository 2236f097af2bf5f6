use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::protocol::error::Result;
use crate::protocol::JsonRpcRequest;
use crate::transport::codec::JsonCodec;
use crate::transport::http::HttpTransport;
use crate::transport::mode::TransportMode;
use crate::transport::tcp::TcpTransport;
use crate::transport::{Exchange, Transport};

/// The default [`Transport`]: serializes the envelope and sends it over
/// HTTP or raw TCP depending on the address.
#[derive(Clone)]
pub struct NetworkTransport {
    mode: TransportMode,
    http: HttpTransport,
    tcp: TcpTransport,
}

impl NetworkTransport {
    pub fn new(mode: TransportMode, user_agent: Option<String>) -> Self {
        Self {
            mode,
            http: HttpTransport::new(user_agent),
            tcp: TcpTransport::new(),
        }
    }
}

impl Transport for NetworkTransport {
    fn exchange<'a>(
        &'a self,
        request: &'a JsonRpcRequest,
        exchange: &'a Exchange,
    ) -> BoxFuture<'a, Result<Option<Value>>> {
        Box::pin(async move {
            let body = JsonCodec::to_bytes(request)?;

            tracing::debug!(
                method = %request.method,
                transport = %self.mode,
                bytes = body.len(),
                "Sending request"
            );

            match &self.mode {
                TransportMode::Http(uri) => self.http.post(uri, body, exchange).await,
                TransportMode::Tcp { host, port } => {
                    self.tcp.exchange(host, *port, &body, exchange.timeout).await
                }
            }
        })
    }
}
