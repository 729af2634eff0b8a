//! Request routing: map method and path patterns to handlers and run them.
//!
//! Patterns are `/`-separated and support three kinds of segment:
//!
//! | Pattern                | Example match              | Captured params                 |
//! |------------------------|----------------------------|---------------------------------|
//! | `/users`               | `/users`                   | *(none)*                        |
//! | `/users/:id`           | `/users/42`                | `id → "42"`                     |
//! | `/files/*path`         | `/files/docs/readme.txt`   | `path → "docs/readme.txt"`      |
//!
//! Empty segments are ignored on both sides, so `/users/` and `//users` are
//! the same as `/users`. When more than one pattern could match a request,
//! static segments win over parameters and parameters win over wildcards,
//! whatever order the routes were registered in.
//!
//! Routes are registered up front on a `&mut Router`; once serving starts the
//! router is only read, so it can be shared behind an [`Arc`] without locks.

use std::{
    any::Any,
    panic::AssertUnwindSafe,
    path::PathBuf,
    sync::Arc,
};

use futures_util::FutureExt;
use tracing::{debug, error, trace, warn};

use crate::{
    Method, Request, Response, StatusCode,
    context::{Context, Params},
    fs::StaticDir,
    handler::{self, Handler, IntoHandler},
    middleware::{Chain, Logger, Middleware},
};

// Per-method registration helpers shared by `Router` and `Group`. Each expands
// to `fn $name(&mut self, path, handler)` delegating to `self.add`.
macro_rules! method_routes {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Registers a handler for `", stringify!($method), "` requests matching `path`.")]
            ///
            /// # Errors
            ///
            /// See [`Router::add`].
            pub fn $name(
                &mut self,
                path: &str,
                handler: impl IntoHandler,
            ) -> Result<(), RouteError> {
                self.add(Method::$method, path, handler)
            }
        )*
    };
}

mod error;
mod group;
mod path;
mod tree;

pub use error::RouteError;
pub use group::Group;
pub use tree::{Match, PathTree};

/// Body of the response sent when a handler or middleware panics.
const PANIC_BODY: &str = "Internal Server Error";

/// HTTP request router: a path tree of handlers, a not-found fallback, and a
/// middleware chain applied around whichever of the two runs.
///
/// # Examples
///
/// ```rust,no_run
/// use kami::{Router, Response, StatusCode, context::Context};
///
/// # fn main() -> Result<(), kami::RouteError> {
/// let mut router = Router::builder().logger().build();
///
/// router.get("/ping", |_ctx: Context| async { Ok(Response::new(StatusCode::Ok)) })?;
/// router.get("/users/:id", |ctx: Context| async move {
///     let id = ctx.param("id").unwrap_or_default().to_owned();
///     Ok(Response::new(StatusCode::Ok).body(id))
/// })?;
/// # Ok(())
/// # }
/// ```
pub struct Router {
    tree: PathTree<Handler>,
    not_found: Handler,
    chain: Chain,
}

/// Construction-time options for a [`Router`].
///
/// | Option          | Effect                                                     |
/// |-----------------|------------------------------------------------------------|
/// | `middleware(m)` | appends `m` to the chain                                   |
/// | `not_found(h)`  | replaces the default plain-text 404 handler                |
/// | `logger()`      | wraps the whole chain with the request-logging middleware  |
#[derive(Default)]
pub struct RouterBuilder {
    chain: Chain,
    not_found: Option<Handler>,
    logger: bool,
}

impl RouterBuilder {
    /// Appends `middleware` to the chain. The first one appended is outermost.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.chain.push(middleware);
        self
    }

    /// Replaces the handler used when no route matches.
    #[must_use]
    pub fn not_found(mut self, handler: impl IntoHandler) -> Self {
        self.not_found = Some(handler::into_handler(handler));
        self
    }

    /// Logs every request, including not-found ones, with its status and duration.
    #[must_use]
    pub fn logger(mut self) -> Self {
        self.logger = true;
        self
    }

    pub fn build(self) -> Router {
        let mut chain = self.chain;
        if self.logger {
            chain.push_front(Logger);
        }
        Router {
            tree: PathTree::new(),
            not_found: self.not_found.unwrap_or_else(handler::default_not_found),
            chain,
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates a router with no routes, no middleware, and the default 404 handler.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Registers `handler` for `method` requests matching `path`.
    ///
    /// Registering the same method and pattern twice replaces the earlier
    /// handler and logs a warning.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] if `path` is malformed or conflicts with an
    /// existing route. The route table is unchanged in that case.
    pub fn add(&mut self, method: Method, path: &str, handler: impl IntoHandler) -> Result<(), RouteError> {
        let handler = handler::into_handler(handler);
        if self.tree.insert(method.clone(), path, handler)?.is_some() {
            warn!(%method, path, "route registered twice, replacing earlier handler");
        } else {
            debug!(%method, path, "route registered");
        }
        Ok(())
    }

    method_routes! {
        get => Get,
        post => Post,
        put => Put,
        patch => Patch,
        delete => Delete,
        head => Head,
        options => Options,
        connect => Connect,
        trace => Trace,
    }

    /// Returns a registrar that prefixes every pattern with `prefix`.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPrefix`] if `prefix` is empty, does not start with
    /// `/`, or ends in a wildcard segment.
    ///
    /// # Examples
    ///
    /// ```
    /// use kami::{Context, Method, Router, Response, StatusCode};
    ///
    /// # fn main() -> Result<(), kami::RouteError> {
    /// let mut router = Router::new();
    /// let mut api = router.group("/api/v1/")?;
    /// api.get("/users", |_ctx: Context| async { Ok(Response::new(StatusCode::Ok)) })?;
    ///
    /// assert!(router.lookup(&Method::Get, "/api/v1/users").is_some());
    /// # Ok(())
    /// # }
    /// ```
    pub fn group(&mut self, prefix: &str) -> Result<Group<'_>, RouteError> {
        Group::new(self, prefix)
    }

    /// Serves files under `root` for `GET <prefix>` and `GET <prefix>/*filepath`.
    ///
    /// The bare prefix serves the root's `index.html`.
    ///
    /// # Errors
    ///
    /// Any [`RouteError`] from registering either route.
    pub fn serve_static(&mut self, prefix: &str, root: impl Into<PathBuf>) -> Result<(), RouteError> {
        let dir = Arc::new(StaticDir::new(root));
        let base = prefix.trim_end_matches('/');
        let files = move |ctx: Context| {
            let dir = Arc::clone(&dir);
            async move { dir.serve(ctx.param("filepath").unwrap_or_default()).await }
        };

        // The wildcard pattern validates every segment of the prefix, so once
        // it is in the bare prefix cannot fail.
        self.add(Method::Get, &format!("{base}/*filepath"), files.clone())?;
        let index = if base.is_empty() { "/" } else { base };
        self.add(Method::Get, index, files)
    }

    /// Number of registered `(method, pattern)` pairs.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Finds the handler for `method` and `path`, with the parameters it binds.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<(Handler, Params)> {
        self.tree
            .lookup(method, path)
            .map(|m| (Arc::clone(m.value), m.params))
    }

    /// Methods registered on the pattern `path` resolves to.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        self.tree.allowed_methods(path)
    }

    /// Runs `request` through lookup, the middleware chain, and the handler.
    ///
    /// A request that matches no route goes to the not-found handler, still
    /// wrapped by every middleware. A handler error is rendered with
    /// [`Error::into_response`](crate::handler::Error::into_response). A panic
    /// anywhere in the chain is logged and answered with a plain
    /// `500 Internal Server Error`; it never reaches the caller.
    pub async fn dispatch(&self, request: Request) -> Response {
        let method = request.method().clone();
        let path = request.path().to_owned();
        trace!(%method, %path, "request received");

        let (handler, params) = match self.lookup(&method, &path) {
            Some(found) => found,
            None => {
                debug!(%method, %path, "no route matched");
                (Arc::clone(&self.not_found), Params::new())
            }
        };
        trace!(params = params.len(), "lookup complete");

        let ctx = Context::with_params(request, params);
        let chain = &self.chain;
        let outcome = AssertUnwindSafe(async move {
            let wrapped = chain.apply(handler);
            trace!("middleware applied");
            wrapped(ctx).await
        })
        .catch_unwind()
        .await;

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                debug!(%method, %path, error = %err, "handler returned an error");
                err.into_response()
            }
            Err(panic) => {
                error!(%method, %path, panic = panic_message(&*panic), "handler panicked");
                Response::new(StatusCode::InternalServerError).body(PANIC_BODY)
            }
        };
        trace!(status = response.status().as_u16(), "response ready");
        response
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        handler::{Error, HandlerResult},
        middleware::around,
    };

    fn get(path: &str) -> Request {
        Request::new(Method::Get, path)
    }

    fn text(body: &'static str) -> impl IntoHandler {
        move |_ctx: Context| async move { Ok(Response::new(StatusCode::Ok).body(body)) }
    }

    async fn echo_params(ctx: Context) -> HandlerResult {
        let mut pairs: Vec<_> = ctx.params().iter().map(|(k, v)| format!("{k}={v}")).collect();
        pairs.sort();
        Ok(Response::new(StatusCode::Ok).body(pairs.join("&")))
    }

    async fn body_of(router: &Router, request: Request) -> (StatusCode, String) {
        let res = router.dispatch(request).await;
        (res.status(), res.body_text().unwrap_or_default().to_owned())
    }

    // ── registration ──────────────────────────────────────────────────────────

    #[test]
    fn starts_empty() {
        let router = Router::new();
        assert!(router.is_empty());
        assert_eq!(router.len(), 0);
    }

    #[test]
    fn every_method_helper_registers() {
        let mut router = Router::new();
        router.get("/r", text("")).unwrap();
        router.post("/r", text("")).unwrap();
        router.put("/r", text("")).unwrap();
        router.patch("/r", text("")).unwrap();
        router.delete("/r", text("")).unwrap();
        router.head("/r", text("")).unwrap();
        router.options("/r", text("")).unwrap();
        router.connect("/r", text("")).unwrap();
        router.trace("/r", text("")).unwrap();
        assert_eq!(router.len(), 9);
        assert_eq!(router.allowed_methods("/r").len(), 9);
    }

    #[test]
    fn custom_method_routes() {
        let mut router = Router::new();
        router.add(Method::Custom("PURGE".into()), "/cache", text("")).unwrap();
        assert!(router.lookup(&"PURGE".parse().unwrap(), "/cache").is_some());
        assert!(router.lookup(&Method::Get, "/cache").is_none());
    }

    #[test]
    fn registration_errors_surface() {
        let mut router = Router::new();
        assert!(matches!(
            router.get("no-slash", text("")),
            Err(RouteError::InvalidPath { .. })
        ));
        assert!(matches!(
            router.get("/a/:x/b/:x", text("")),
            Err(RouteError::DuplicateParamName { .. })
        ));
        assert!(router.is_empty());
    }

    #[tokio::test]
    async fn reregistration_overrides() {
        let mut router = Router::new();
        router.get("/a", text("first")).unwrap();
        router.get("/a", text("second")).unwrap();
        assert_eq!(router.len(), 1);
        assert_eq!(body_of(&router, get("/a")).await.1, "second");
    }

    #[tokio::test]
    async fn static_mount_serves_bare_prefix_and_decoded_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "home").unwrap();
        std::fs::write(dir.path().join("my file.txt"), "spaced").unwrap();

        let mut router = Router::new();
        router.serve_static("/assets/", dir.path()).unwrap();
        assert_eq!(router.allowed_methods("/assets"), [Method::Get]);
        assert_eq!(router.len(), 2);

        assert_eq!(body_of(&router, get("/assets")).await.1, "home");
        assert_eq!(body_of(&router, get("/assets/my%20file.txt")).await.1, "spaced");
        assert_eq!(
            body_of(&router, get("/assets/%2e%2e/etc/passwd")).await.0,
            StatusCode::NotFound
        );
    }

    #[test]
    fn static_mount_with_bad_prefix_registers_nothing() {
        let mut router = Router::new();
        assert!(router.serve_static("assets", "/srv").is_err());
        assert!(router.is_empty());
    }

    // ── dispatch ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn dispatches_to_matching_handler() {
        let mut router = Router::new();
        router.get("/hello", text("hi")).unwrap();
        assert_eq!(body_of(&router, get("/hello")).await, (StatusCode::Ok, "hi".into()));
    }

    #[tokio::test]
    async fn unmatched_uses_default_not_found() {
        let router = Router::new();
        let (status, body) = body_of(&router, get("/nothing")).await;
        assert_eq!(status, StatusCode::NotFound);
        assert_eq!(body, "Not Found");
    }

    #[tokio::test]
    async fn wrong_method_is_not_found() {
        let mut router = Router::new();
        router.get("/hello", text("hi")).unwrap();
        let res = router.dispatch(Request::new(Method::Post, "/hello")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn params_reach_handler() {
        let mut router = Router::new();
        router.get("/user/:uid/post/:pid", echo_params).unwrap();
        let (_, body) = body_of(&router, get("/user/alice/post/42")).await;
        assert_eq!(body, "pid=42&uid=alice");
    }

    #[tokio::test]
    async fn query_string_does_not_affect_matching() {
        let mut router = Router::new();
        router.get("/search", text("found")).unwrap();
        assert_eq!(body_of(&router, get("/search?q=rust")).await.1, "found");
    }

    #[tokio::test]
    async fn custom_not_found_sees_empty_params() {
        let mut router = Router::builder()
            .not_found(|ctx: Context| async move {
                assert!(ctx.params().is_empty());
                Ok(Response::new(StatusCode::NotFound).body("test not found"))
            })
            .build();
        router.get("/user/:id", echo_params).unwrap();

        assert_eq!(
            body_of(&router, get("/missing")).await,
            (StatusCode::NotFound, "test not found".into())
        );
    }

    #[tokio::test]
    async fn handler_error_becomes_problem_response() {
        let mut router = Router::new();
        router
            .get("/conflict", |_ctx: Context| async {
                Err(Error::new(StatusCode::Conflict, "taken"))
            })
            .unwrap();

        let res = router.dispatch(get("/conflict")).await;
        assert_eq!(res.status(), StatusCode::Conflict);
        assert_eq!(res.body_text(), Some(r#"{"msg":"taken"}"#));
    }

    // ── middleware ────────────────────────────────────────────────────────────

    fn append(tag: &'static str) -> impl Middleware {
        around(move |ctx: Context, next: Handler| async move {
            let res = next(ctx).await?;
            let body = format!("{}{tag}", res.body_text().unwrap_or_default());
            Ok(Response::new(res.status()).body(body))
        })
    }

    #[tokio::test]
    async fn middleware_runs_first_registered_outermost() {
        let mut router = Router::builder()
            .middleware(append("1"))
            .middleware(append("2"))
            .middleware(append("3"))
            .build();
        router.get("/", text("")).unwrap();

        // innermost appends first
        assert_eq!(body_of(&router, get("/")).await.1, "321");
    }

    #[tokio::test]
    async fn middleware_wraps_not_found() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let router = Router::builder()
            .middleware(around(move |ctx: Context, next: Handler| {
                log.lock().unwrap().push(ctx.request().path().to_owned());
                next(ctx)
            }))
            .logger()
            .build();

        let res = router.dispatch(get("/nowhere")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
        assert_eq!(*seen.lock().unwrap(), ["/nowhere"]);
    }

    // ── recovery ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn handler_panic_is_recovered() {
        async fn boom(_ctx: Context) -> HandlerResult {
            panic!("handler exploded")
        }

        let mut router = Router::new();
        router.get("/boom", boom).unwrap();
        router.get("/fine", text("ok")).unwrap();

        let (status, body) = body_of(&router, get("/boom")).await;
        assert_eq!(status, StatusCode::InternalServerError);
        assert_eq!(body, PANIC_BODY);

        // the router keeps serving afterwards
        assert_eq!(body_of(&router, get("/fine")).await.1, "ok");
    }

    #[tokio::test]
    async fn middleware_panic_is_recovered() {
        let mut router = Router::builder()
            .middleware(|_next: Handler| -> Handler { panic!("bad middleware") })
            .build();
        router.get("/", text("unreachable")).unwrap();

        let res = router.dispatch(get("/")).await;
        assert_eq!(res.status(), StatusCode::InternalServerError);
    }

    #[test]
    fn panic_message_reads_both_string_kinds() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*owned), "owned");
        assert_eq!(panic_message(&*borrowed), "borrowed");
        assert_eq!(panic_message(&*other), "non-string panic payload");
    }
}
