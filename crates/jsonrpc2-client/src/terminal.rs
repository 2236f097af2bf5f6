use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use jsonrpc2_common::transport::{Exchange, JsonCodec, Transport};
use jsonrpc2_common::{IdGenerator, Result};

use crate::context::CallContext;
use crate::middleware::Terminal;

/// Terminal stage: encodes the envelope from the context, performs the
/// exchange, and stores the classified result.
pub struct NetworkCall {
    transport: Arc<dyn Transport>,
    default_timeout: Duration,
    ids: Arc<dyn IdGenerator>,
}

impl NetworkCall {
    pub fn new(
        transport: Arc<dyn Transport>,
        default_timeout: Duration,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            transport,
            default_timeout,
            ids,
        }
    }
}

impl Terminal for NetworkCall {
    fn dispatch<'a>(&'a self, ctx: &'a mut CallContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            // Params were normalized when the context was built
            let request = JsonCodec::envelope(
                &ctx.method,
                ctx.params.clone(),
                &ctx.options,
                self.ids.as_ref(),
            );

            let exchange = Exchange {
                timeout: ctx.options.timeout.unwrap_or(self.default_timeout),
                headers: ctx.options.headers.clone(),
            };

            tracing::debug!(
                method = %request.method,
                id = request.id.as_deref().unwrap_or("null"),
                timeout_ms = exchange.timeout.as_millis() as u64,
                "Dispatching request"
            );

            let raw = self.transport.exchange(&request, &exchange).await?;
            ctx.result = JsonCodec::classify(raw)?;

            Ok(())
        })
    }
}
