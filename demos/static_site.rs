//! Serves a directory over HTTP.
//!
//! ```text
//! cargo run --example static_site -- ./public
//! ```
//!
//! `/` and any directory serve their `index.html`; other files are sent with a
//! `Content-Type` guessed from their extension.

use kami::{Router, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let root = std::env::args().nth(1).unwrap_or_else(|| ".".to_owned());

    let mut router = Router::builder().logger().build();
    router.serve_static("/", &root)?;

    let server = Server::bind("127.0.0.1:8080").await?;
    tracing::info!(root, addr = %server.local_addr(), "serving directory");
    server.serve(router).await?;
    Ok(())
}
