//! Middleware Pipeline
//!
//! Calls run through an ordered list of stages ending in a terminal stage
//! that performs the network exchange. Each stage receives the mutable
//! [`CallContext`] and a [`Next`] handle for the rest of the chain:
//!
//! ```text
//! Logging -> [Tracing] -> user middleware... -> Terminal
//!    |           |               |                 |
//!    |<----------|<--------------|<----------------|  (unwinding)
//! ```
//!
//! Code before `next.run(ctx)` runs on the way in, code after it runs on the
//! way out in reverse order. A stage that never calls `next` short-circuits
//! the call and nothing downstream (including the network) runs.
//!
//! # Example
//!
//! ```
//! use jsonrpc2_client::{from_fn, Middleware};
//! use serde_json::json;
//!
//! let cached = from_fn(|ctx, next| {
//!     Box::pin(async move {
//!         if ctx.method == "ping" {
//!             ctx.result = Some(json!("pong"));
//!             return Ok(());
//!         }
//!         next.run(ctx).await
//!     })
//! });
//! # fn assert_middleware<M: Middleware>(_: &M) {}
//! # assert_middleware(&cached);
//! ```

use std::sync::Arc;

use futures_util::future::BoxFuture;
use jsonrpc2_common::Result;

use crate::context::CallContext;

/// One stage of the call pipeline.
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(&'a self, ctx: &'a mut CallContext, next: Next<'a>) -> BoxFuture<'a, Result<()>>;
}

/// The innermost stage; performs the actual call.
pub trait Terminal: Send + Sync {
    fn dispatch<'a>(&'a self, ctx: &'a mut CallContext) -> BoxFuture<'a, Result<()>>;
}

/// Handle to the remainder of the pipeline.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    /// Runs the remaining stages, ending with the terminal stage.
    pub fn run<'c>(self, ctx: &'c mut CallContext) -> BoxFuture<'c, Result<()>>
    where
        'a: 'c,
    {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.handle(
                ctx,
                Next {
                    stages: rest,
                    terminal: self.terminal,
                },
            ),
            None => self.terminal.dispatch(ctx),
        }
    }

    /// Number of stages left before the terminal stage.
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }
}

/// Middleware built from a closure. See [`from_fn`].
pub struct FnMiddleware<F> {
    f: F,
}

/// Adapts a closure into a [`Middleware`].
///
/// The closure must return a boxed future, usually `Box::pin(async move { .. })`.
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut CallContext, Next<'a>) -> BoxFuture<'a, Result<()>>
        + Send
        + Sync
        + 'static,
{
    FnMiddleware { f }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut CallContext, Next<'a>) -> BoxFuture<'a, Result<()>>
        + Send
        + Sync
        + 'static,
{
    fn handle<'a>(&'a self, ctx: &'a mut CallContext, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        (self.f)(ctx, next)
    }
}

/// An immutable, ordered list of stages.
///
/// Cloning shares the list. Registering middleware on a client builds a new
/// pipeline rather than mutating one that calls may be running through.
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Arc<dyn Middleware>]>,
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            stages: stages.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs `ctx` through every stage, then `terminal`.
    pub async fn execute(&self, ctx: &mut CallContext, terminal: &dyn Terminal) -> Result<()> {
        let next = Next {
            stages: &self.stages,
            terminal,
        };
        next.run(ctx).await
    }
}
