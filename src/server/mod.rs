//! Tokio TCP front end that feeds HTTP/1.1 requests into a [`Router`].

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::{
    Router,
    http::{
        StatusCode,
        request::{Request, RequestError},
        response::Response,
    },
};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Maximum size of a complete HTTP request we will buffer before rejecting it (8 MiB).
const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// HTTP/1.1 front end for a [`Router`].
///
/// Each accepted connection runs on its own Tokio task and feeds parsed
/// requests to [`Router::dispatch`]. The router is shared behind an [`Arc`]
/// and never mutated once serving starts.
///
/// # Examples
///
/// ```rust,no_run
/// use kami::{Router, Response, Server, StatusCode, context::Context};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut router = Router::builder().logger().build();
///     router.get("/", |_ctx: Context| async {
///         Ok(Response::new(StatusCode::Ok).body("Hello!"))
///     })?;
///
///     Server::bind("127.0.0.1:8080").await?.serve(router).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until the process exits, dispatching every request
    /// through `router`.
    ///
    /// # Errors
    ///
    /// Currently never returns an error: failed accepts are logged and skipped.
    pub async fn serve(self, router: impl Into<Arc<Router>>) -> Result<(), ServerError> {
        let router = router.into();
        info!(address = %self.local_addr, routes = router.len(), "listening");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let router = Arc::clone(&router);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, router).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Handles a single TCP connection over its lifetime.
///
/// HTTP/1.1 connections are persistent by default: we loop, reading one
/// request per iteration, until the peer closes the connection or signals
/// `Connection: close`.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    router: Arc<Router>,
) -> Result<(), std::io::Error> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        let bytes_read = stream.read_buf(&mut buf).await?;

        if bytes_read == 0 {
            debug!(peer = %peer_addr, "connection closed by peer");
            break;
        }

        // Guard against excessively large requests.
        if buf.len() > MAX_REQUEST_SIZE {
            warn!(peer = %peer_addr, "request too large, sending 413");
            stream.write_all(&payload_too_large().into_bytes()).await?;
            break;
        }

        // Attempt to parse the buffered data as an HTTP request.
        let (request, body_offset) = match Request::parse(&buf) {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) => {
                // Headers not yet fully received.
                continue;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "malformed request, sending 400");
                let response = Response::new(StatusCode::BadRequest)
                    .body(format!("Bad Request: {e}"))
                    .keep_alive(false);
                stream.write_all(&response.into_bytes()).await?;
                break;
            }
        };

        // Wait for the full body to arrive if Content-Length is set.
        let content_length = request.content_length().unwrap_or(0);
        let Some(total_needed) = request_end(body_offset, content_length) else {
            warn!(peer = %peer_addr, content_length, "declared body too large, sending 413");
            stream.write_all(&payload_too_large().into_bytes()).await?;
            break;
        };
        if buf.len() < total_needed {
            continue;
        }

        // Only this request's bytes; anything after is the next pipelined request.
        let request = request.body(Bytes::copy_from_slice(&buf[body_offset..total_needed]));
        let keep_alive = request.is_keep_alive();

        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "dispatching request"
        );

        let mut response = router.dispatch(request).await;
        if !keep_alive {
            response = response.keep_alive(false);
        }
        stream.write_all(&response.into_bytes()).await?;
        stream.flush().await?;

        // Drop the consumed request bytes from the buffer.
        let _ = buf.split_to(total_needed);

        if !keep_alive {
            debug!(peer = %peer_addr, "connection: close requested");
            break;
        }
    }

    Ok(())
}

/// Offset one past the last byte of a request, or `None` when it would exceed
/// [`MAX_REQUEST_SIZE`].
fn request_end(body_offset: usize, content_length: usize) -> Option<usize> {
    body_offset
        .checked_add(content_length)
        .filter(|&end| end <= MAX_REQUEST_SIZE)
}

fn payload_too_large() -> Response {
    Response::new(StatusCode::PayloadTooLarge)
        .body("Request entity too large")
        .keep_alive(false)
}
