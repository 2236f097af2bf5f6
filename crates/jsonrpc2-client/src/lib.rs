//! jsonrpc2 Client
//!
//! A JSON-RPC 2.0 client over HTTP or raw TCP whose calls run through a
//! composable middleware pipeline.
//!
//! # Pipeline
//!
//! Every call flows through, in order:
//!
//! 1. the logging stage (timing and the configured [`Logger`])
//! 2. the tracing stage, when a [`Tracer`] is configured
//! 3. user middleware, in registration order
//! 4. the network stage, which encodes the envelope and performs the exchange
//!
//! Middleware can observe or rewrite the [`CallContext`], short-circuit by not
//! calling [`Next::run`], and inspect or replace failures on the way out.
//!
//! # Example
//!
//! ```no_run
//! use jsonrpc2_client::{CallOptions, Client, ClientConfig};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> jsonrpc2_client::Result<()> {
//! let config = ClientConfig::default()
//!     .with_timeout_ms(5_000)
//!     .with_logger(|entry| println!("{} took {:?}", entry.method, entry.duration));
//! let client = Client::new("tcp://127.0.0.1:4003", config)?;
//!
//! let result = client.call("Foo.Bar", json!({"foo": "bar"}), CallOptions::default()).await?;
//! # let _ = result;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod context;
pub mod logging;
pub mod middleware;
pub mod terminal;
pub mod tracer;

pub use client::{Client, ClientConfig, DEFAULT_TIMEOUT};
pub use context::CallContext;
pub use logging::{LogEntry, Logger, LoggingStage};
pub use middleware::{from_fn, FnMiddleware, Middleware, Next, Pipeline, Terminal};
pub use terminal::NetworkCall;
pub use tracer::{Span, SpanContext, Tracer, TracingMiddleware, W3cTracer, TRACEPARENT};

pub use jsonrpc2_common::transport::{Exchange, Transport, TransportMode};
pub use jsonrpc2_common::{
    CallOptions, IdGenerator, JsonRpcError, JsonRpcRequest, RandomIds, Result, RpcError,
    SequentialIds,
};
