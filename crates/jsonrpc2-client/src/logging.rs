use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use jsonrpc2_common::{Result, RpcError};
use serde_json::Value;

use crate::context::CallContext;
use crate::middleware::{Middleware, Next};

/// Summary of one finished call, handed to the configured [`Logger`].
///
/// `result` is `None` whenever the call failed, and `error` is `None`
/// whenever it succeeded. `method` and `params` are read from the context
/// after the rest of the pipeline ran, so they include any rewrites.
#[derive(Debug, Clone, Copy)]
pub struct LogEntry<'a> {
    pub method: &'a str,
    pub params: &'a Value,
    /// Wall-clock time spent in every stage below the logging stage
    pub duration: Duration,
    pub result: Option<&'a Value>,
    pub error: Option<&'a RpcError>,
    /// The address the client was constructed with
    pub addr: &'a str,
}

/// Callback invoked exactly once per call.
pub type Logger = Arc<dyn Fn(&LogEntry<'_>) + Send + Sync>;

/// First stage of every pipeline: times the call, emits a `tracing` event,
/// and reports to the configured [`Logger`]. The outcome passes through
/// unchanged.
pub struct LoggingStage {
    addr: String,
    logger: Option<Logger>,
}

impl LoggingStage {
    pub fn new(addr: impl Into<String>, logger: Option<Logger>) -> Self {
        Self {
            addr: addr.into(),
            logger,
        }
    }
}

impl fmt::Debug for LoggingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingStage")
            .field("addr", &self.addr)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl Middleware for LoggingStage {
    fn handle<'a>(&'a self, ctx: &'a mut CallContext, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let started = Instant::now();
            let outcome = next.run(&mut *ctx).await;
            let duration = started.elapsed();

            let entry = LogEntry {
                method: &ctx.method,
                params: &ctx.params,
                duration,
                result: outcome.as_ref().ok().and(ctx.result.as_ref()),
                error: outcome.as_ref().err(),
                addr: &self.addr,
            };

            match entry.error {
                None => tracing::debug!(
                    method = entry.method,
                    addr = entry.addr,
                    duration_ms = duration.as_millis() as u64,
                    "Call succeeded"
                ),
                Some(err) => tracing::warn!(
                    method = entry.method,
                    addr = entry.addr,
                    duration_ms = duration.as_millis() as u64,
                    error = %err,
                    "Call failed"
                ),
            }

            if let Some(logger) = &self.logger {
                logger(&entry);
            }

            outcome
        })
    }
}
