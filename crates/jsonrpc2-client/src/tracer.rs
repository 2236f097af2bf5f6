//! Distributed tracing adapter
//!
//! [`TracingMiddleware`] opens a span around each call and injects its
//! identity into the outgoing request headers so the server can continue the
//! trace. The tracer itself is pluggable through [`Tracer`]; [`W3cTracer`]
//! propagates a W3C `traceparent` header and records spans as `tracing`
//! spans.
//!
//! The parent of a new span is, in order of preference, a [`SpanContext`]
//! already present in the call's extensions, or one extracted from the
//! headers given in the call options.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::BoxFuture;
use jsonrpc2_common::{Result, RpcError};

use crate::context::CallContext;
use crate::middleware::{Middleware, Next};

/// W3C trace context header name
pub const TRACEPARENT: &str = "traceparent";

/// Span name used when a call has no method name.
pub const DEFAULT_SPAN_NAME: &str = "external_rpc";

/// Identity of a span, as propagated between processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanContext {
    /// 32 lowercase hex characters
    pub trace_id: String,
    /// 16 lowercase hex characters
    pub span_id: String,
}

/// An in-progress span.
pub trait Span: Send + Sync {
    fn context(&self) -> &SpanContext;

    /// Marks the span as failed. Called at most once, before `finish`.
    fn set_error(&mut self, _error: &RpcError) {}

    fn finish(self: Box<Self>);
}

/// Span factory and header propagation.
pub trait Tracer: Send + Sync + 'static {
    /// Reads a remote parent from request headers.
    fn extract(&self, carrier: &BTreeMap<String, String>) -> Option<SpanContext>;

    fn start_span(&self, name: &str, parent: Option<&SpanContext>) -> Box<dyn Span>;

    /// Writes the span identity into request headers.
    fn inject(&self, span: &dyn Span, carrier: &mut BTreeMap<String, String>);
}

/// Middleware that wraps each call in a span.
pub struct TracingMiddleware {
    tracer: Arc<dyn Tracer>,
}

impl TracingMiddleware {
    pub fn new(tracer: Arc<dyn Tracer>) -> Self {
        Self { tracer }
    }
}

impl Middleware for TracingMiddleware {
    fn handle<'a>(&'a self, ctx: &'a mut CallContext, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let name = if ctx.method.is_empty() {
                DEFAULT_SPAN_NAME
            } else {
                ctx.method.as_str()
            };

            let parent = ctx
                .extensions
                .get::<SpanContext>()
                .cloned()
                .or_else(|| self.tracer.extract(&ctx.options.headers));

            let mut span = self.tracer.start_span(name, parent.as_ref());
            self.tracer.inject(span.as_ref(), &mut ctx.options.headers);
            ctx.extensions.insert(span.context().clone());

            let outcome = next.run(&mut *ctx).await;

            if let Err(err) = &outcome {
                span.set_error(err);
            }
            span.finish();

            outcome
        })
    }
}

/// [`Tracer`] speaking the W3C `traceparent` format, backed by `tracing` spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct W3cTracer;

impl W3cTracer {
    pub fn new() -> Self {
        Self
    }

    fn parse_traceparent(value: &str) -> Option<SpanContext> {
        let mut parts = value.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let _flags = parts.next()?;

        let is_hex = |s: &str| s.bytes().all(|b| b.is_ascii_hexdigit());
        if version.len() != 2
            || trace_id.len() != 32
            || span_id.len() != 16
            || !is_hex(trace_id)
            || !is_hex(span_id)
            || trace_id.bytes().all(|b| b == b'0')
        {
            return None;
        }

        Some(SpanContext {
            trace_id: trace_id.to_ascii_lowercase(),
            span_id: span_id.to_ascii_lowercase(),
        })
    }
}

impl Tracer for W3cTracer {
    fn extract(&self, carrier: &BTreeMap<String, String>) -> Option<SpanContext> {
        carrier
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(TRACEPARENT))
            .and_then(|(_, value)| Self::parse_traceparent(value))
    }

    fn start_span(&self, name: &str, parent: Option<&SpanContext>) -> Box<dyn Span> {
        let trace_id = match parent {
            Some(parent) => parent.trace_id.clone(),
            None => uuid::Uuid::new_v4().simple().to_string(),
        };
        let mut span_id = uuid::Uuid::new_v4().simple().to_string();
        span_id.truncate(16);

        let inner = tracing::info_span!(
            "rpc",
            method = %name,
            trace_id = %trace_id,
            span_id = %span_id,
            parent_span_id = parent.map(|p| p.span_id.as_str()),
        );

        Box::new(W3cSpan {
            context: SpanContext { trace_id, span_id },
            inner,
            started: Instant::now(),
            error: None,
        })
    }

    fn inject(&self, span: &dyn Span, carrier: &mut BTreeMap<String, String>) {
        let context = span.context();
        carrier.retain(|name, _| !name.eq_ignore_ascii_case(TRACEPARENT));
        carrier.insert(
            TRACEPARENT.to_string(),
            format!("00-{}-{}-01", context.trace_id, context.span_id),
        );
    }
}

struct W3cSpan {
    context: SpanContext,
    inner: tracing::Span,
    started: Instant,
    error: Option<String>,
}

impl Span for W3cSpan {
    fn context(&self) -> &SpanContext {
        &self.context
    }

    fn set_error(&mut self, error: &RpcError) {
        self.error = Some(error.to_string());
    }

    fn finish(self: Box<Self>) {
        let _entered = self.inner.enter();
        let duration_ms = self.started.elapsed().as_millis() as u64;
        match &self.error {
            None => tracing::debug!(duration_ms, "Span finished"),
            Some(error) => tracing::debug!(duration_ms, error = %error, "Span finished with error"),
        }
    }
}
