//! Middleware: handler-to-handler transforms applied around every request.
//!
//! A [`Middleware`] receives the [`Handler`] it should delegate to and returns
//! a new handler. A [`Chain`] holds middleware in registration order and
//! [`Chain::apply`] folds it in reverse, so for a chain `[m1, m2, m3]` the
//! effective handler is `m1(m2(m3(h)))`: the first-registered middleware runs
//! first on the way in and last on the way out.
//!
//! The chain is applied per request because the innermost handler is
//! whatever the router matched (or the not-found fallback).
//!
//! ## Writing middleware
//!
//! - Any `Fn(Handler) -> Handler` closure is a [`Middleware`].
//! - [`around`] adapts an async `Fn(Context, Handler)` for the common
//!   "do something, call next, do something" shape.
//! - [`Logger`] is the built-in request logger.

use std::{future::Future, sync::Arc};

use tokio::time::Instant;

use crate::{
    context::Context,
    handler::{Handler, HandlerFuture, HandlerResult},
};

/// A transform from one [`Handler`] to another.
///
/// Implementations must be `Send + Sync` because the same middleware value
/// wraps handlers for every concurrent request.
pub trait Middleware: Send + Sync + 'static {
    /// Wraps `next`, returning the handler that runs in its place.
    fn wrap(&self, next: Handler) -> Handler;
}

impl<F> Middleware for F
where
    F: Fn(Handler) -> Handler + Send + Sync + 'static,
{
    fn wrap(&self, next: Handler) -> Handler {
        (self)(next)
    }
}

/// An ordered list of middleware, outermost first.
///
/// # Examples
///
/// ```
/// use kami::middleware::{Chain, Logger};
///
/// let mut chain = Chain::new();
/// chain.push(Logger);
/// assert_eq!(chain.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct Chain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `middleware`; it will sit inside everything pushed before it.
    pub fn push(&mut self, middleware: impl Middleware) {
        self.layers.push(Arc::new(middleware));
    }

    /// Inserts `middleware` ahead of every existing layer, making it outermost.
    pub fn push_front(&mut self, middleware: impl Middleware) {
        self.layers.insert(0, Arc::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Wraps `handler` with every layer, last-registered innermost.
    pub fn apply(&self, handler: Handler) -> Handler {
        self.layers
            .iter()
            .rev()
            .fold(handler, |inner, layer| layer.wrap(inner))
    }
}

/// Builds middleware from an async function that receives the context and
/// the next handler.
///
/// # Examples
///
/// ```
/// use kami::{context::Context, handler::Handler, middleware::around};
///
/// let tag = around(|ctx: Context, next: Handler| async move {
///     let mut res = next(ctx).await?;
///     res.add_header("X-Served-By", "kami");
///     Ok(res)
/// });
/// # let _ = tag;
/// ```
pub fn around<F, Fut>(f: F) -> impl Middleware
where
    F: Fn(Context, Handler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let f = Arc::new(f);
    move |next: Handler| -> Handler {
        let f = Arc::clone(&f);
        Arc::new(move |ctx: Context| -> HandlerFuture { Box::pin(f(ctx, Arc::clone(&next))) })
    }
}

/// Built-in middleware that logs each request's method, path, status, and
/// duration.
///
/// Emits one `tracing::info!` event after the wrapped handler completes.
/// Handler errors are logged with the status they will be rendered as.
pub struct Logger;

impl Middleware for Logger {
    fn wrap(&self, next: Handler) -> Handler {
        Arc::new(move |ctx: Context| -> HandlerFuture {
            let next = Arc::clone(&next);
            Box::pin(async move {
                let start = Instant::now();
                let method = ctx.request().method().clone();
                let path = ctx.request().path().to_owned();

                let result = next(ctx).await;

                let status = match &result {
                    Ok(res) => res.status(),
                    Err(err) => err.status(),
                };
                tracing::info!(
                    %method,
                    %path,
                    status = status.as_u16(),
                    elapsed = ?start.elapsed(),
                    "request handled"
                );

                result
            })
        })
    }
}
