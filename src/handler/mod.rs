//! Handler types: the one calling convention shared by routes, middleware, and
//! the not-found fallback.
//!
//! Every handler takes a [`Context`] and resolves to a [`HandlerResult`].
//! Middleware wraps a [`Handler`] and returns another one, so the chain never
//! needs to know whether it is running a matched route or the fallback.

use std::{future::Future, pin::Pin, sync::Arc};

use serde::Serialize;
use thiserror::Error;

use crate::{Response, StatusCode, context::Context};

/// What a handler resolves to.
pub type HandlerResult = Result<Response, Error>;

/// Boxed future returned by a [`Handler`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Type-erased, reference-counted async handler.
///
/// Cloning is an `Arc` bump, so the router hands the same handler to many
/// concurrent requests. Build one from a closure or `async fn` with
/// [`into_handler`] or by registering it on a [`Router`](crate::Router).
pub type Handler = Arc<dyn Fn(Context) -> HandlerFuture + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = HandlerResult> + Send` that is also
/// `Send + Sync + 'static` implements this trait through the blanket impl below,
/// so registration methods can take `impl IntoHandler` without repeating the
/// two-parameter bound everywhere.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> HandlerFuture;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context) -> HandlerFuture {
        Box::pin((self)(ctx))
    }
}

/// Erases a concrete handler into a shareable [`Handler`].
///
/// # Examples
///
/// ```
/// use kami::{Context, Response, StatusCode};
/// use kami::handler::{Handler, into_handler};
///
/// let ping: Handler = into_handler(|_ctx: Context| async { Ok(Response::new(StatusCode::Ok)) });
/// ```
pub fn into_handler(handler: impl IntoHandler) -> Handler {
    Arc::new(move |ctx: Context| handler.call(ctx))
}

/// The handler used when no route matches: plain-text `404 Not Found`.
pub fn default_not_found() -> Handler {
    into_handler(|_ctx: Context| async {
        Ok(Response::new(StatusCode::NotFound).body(StatusCode::NotFound.canonical_reason()))
    })
}

/// A failure returned by a handler or middleware.
///
/// The dispatcher renders it with [`Error::into_response`] as an
/// `application/problem+json` body of the form `{"msg": "..."}`.
///
/// # Examples
///
/// ```
/// use kami::{StatusCode, handler::Error};
///
/// let err = Error::new(StatusCode::Conflict, "user already exists");
/// let res = err.into_response();
/// assert_eq!(res.status(), StatusCode::Conflict);
/// assert_eq!(res.body_text(), Some(r#"{"msg":"user already exists"}"#));
/// ```
#[derive(Debug, Clone, Error)]
#[error("{status}: {message}")]
pub struct Error {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct Problem<'a> {
    msg: &'a str,
}

impl Error {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::InternalServerError, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the error as a problem-details JSON response.
    pub fn into_response(self) -> Response {
        let body = serde_json::to_vec(&Problem { msg: &self.message })
            .unwrap_or_else(|_| br#"{"msg":"internal server error"}"#.to_vec());
        Response::new(self.status)
            .header("Content-Type", "application/problem+json")
            .body_bytes(body)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(format!("invalid JSON body: {err}"))
    }
}
