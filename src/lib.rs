//! # kami
//!
//! An HTTP request router for async Rust: a path tree with static, `:param`
//! and trailing `*wildcard` segments, composable middleware, scoped route
//! groups, and a small Tokio server to put in front of it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kami::{Router, Response, Server, StatusCode, context::Context};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::builder().logger().build();
//!
//!     router.get("/", |_ctx: Context| async {
//!         Ok(Response::new(StatusCode::Ok).body("Hello, World!"))
//!     })?;
//!
//!     let mut api = router.group("/api")?;
//!     api.get("/users/:id", |ctx: Context| async move {
//!         let id = ctx.param("id").unwrap_or_default().to_owned();
//!         Ok(Response::new(StatusCode::Ok).body(id))
//!     })?;
//!
//!     router.serve_static("/assets", "./public")?;
//!
//!     Server::bind("127.0.0.1:8080").await?.serve(router).await?;
//!     Ok(())
//! }
//! ```
//!
//! Routing can also be driven without a socket through
//! [`Router::dispatch`], which is how the tests exercise it.

pub mod context;
pub mod fs;
pub mod handler;
pub mod http;
pub mod middleware;
pub mod router;
pub mod server;

pub use context::{Context, Params};
pub use handler::{Error, Handler, HandlerResult, IntoHandler};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::{Group, RouteError, Router, RouterBuilder};
pub use server::{Server, ServerError};
