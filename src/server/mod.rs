//! The TCP front end: accepts connections and feeds their requests to a
//! [`Router`].
//!
//! Each connection runs on its own task and stays open across requests
//! (HTTP/1.1 keep-alive, pipelining included) until the client closes it or
//! goes idle. [`Server::serve`] stops accepting once its shutdown future
//! resolves.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::http::{
    StatusCode,
    request::{Request, RequestError},
    response::Response,
};
use crate::router::Router;

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

/// How long a connection may sit without sending anything before it is closed.
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// The HTTP server.
///
/// # Examples
///
/// ```rust,no_run
/// use holiday_lens::{Router, Response, Server, StatusCode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut router = Router::new();
///     router.get("/ping", |_ctx| async { Response::new(StatusCode::Ok).body("pong") });
///
///     let server = Server::bind("127.0.0.1:8080").await?;
///     server.serve(router, async {
///         let _ = tokio::signal::ctrl_c().await;
///     }).await?;
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
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
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

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections and dispatches their requests to `router` until
    /// `shutdown` completes.
    ///
    /// Connections already accepted keep running on their own tasks after the
    /// accept loop stops.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; accept errors are logged and skipped.
    pub async fn serve<S>(self, router: Router, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send,
    {
        let router = Arc::new(router);
        tokio::pin!(shutdown);
        info!(address = %self.local_addr, "holiday API listening");

        loop {
            let (stream, peer_addr) = tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!(address = %self.local_addr, "shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                        continue;
                    }
                },
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

/// Serves requests from one connection until the peer closes it, asks for
/// `Connection: close`, sends something unparseable, or goes quiet for
/// [`IDLE_TIMEOUT`].
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    router: Arc<Router>,
) -> Result<(), std::io::Error> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        let (request, body_offset) = match Request::parse(&buf) {
            Ok(parsed) => parsed,
            Err(RequestError::Incomplete) => {
                if buf.len() > MAX_REQUEST_SIZE {
                    warn!(peer = %peer_addr, "request head too large, sending 413");
                    return reject(&mut stream, StatusCode::PayloadTooLarge, "Request entity too large").await;
                }
                if !fill(&mut stream, &mut buf, peer_addr).await? {
                    return Ok(());
                }
                continue;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                return reject(&mut stream, StatusCode::BadRequest, format!("Bad Request: {e}")).await;
            }
        };

        let request_len = body_offset + request.content_length().unwrap_or(0);
        if request_len > MAX_REQUEST_SIZE {
            warn!(peer = %peer_addr, request_len, "request body too large, sending 413");
            return reject(&mut stream, StatusCode::PayloadTooLarge, "Request entity too large").await;
        }
        if buf.len() < request_len {
            if !fill(&mut stream, &mut buf, peer_addr).await? {
                return Ok(());
            }
            continue;
        }

        let keep_alive = request.is_keep_alive();
        let response = router.route(request).await.keep_alive(keep_alive);
        stream.write_all(&response.into_bytes()).await?;
        stream.flush().await?;

        // Anything past this request is the start of the next pipelined one.
        let _ = buf.split_to(request_len);

        if !keep_alive {
            debug!(peer = %peer_addr, "Connection: close, shutting down");
            return Ok(());
        }
    }
}

// Reads more bytes into `buf`. `Ok(false)` means the connection is done:
// the peer closed it or stayed idle too long.
async fn fill(stream: &mut TcpStream, buf: &mut BytesMut, peer_addr: SocketAddr) -> Result<bool, std::io::Error> {
    match tokio::time::timeout(IDLE_TIMEOUT, stream.read_buf(buf)).await {
        Ok(Ok(0)) => {
            debug!(peer = %peer_addr, "connection closed by peer");
            Ok(false)
        }
        Ok(Ok(_)) => Ok(true),
        Ok(Err(e)) => Err(e),
        Err(_) => {
            debug!(peer = %peer_addr, timeout = ?IDLE_TIMEOUT, "idle connection dropped");
            Ok(false)
        }
    }
}

async fn reject(stream: &mut TcpStream, status: StatusCode, message: impl Into<String>) -> Result<(), std::io::Error> {
    let response = Response::new(status).body(message).keep_alive(false);
    stream.write_all(&response.into_bytes()).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::oneshot;

    async fn spawn() -> (SocketAddr, oneshot::Sender<()>) {
        let mut router = Router::new();
        router.get("/api/holidays/health", |_ctx| async {
            Response::new(StatusCode::Ok).body("up")
        });

        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr();
        let (stop, stopped) = oneshot::channel::<()>();
        tokio::spawn(server.serve(router, async {
            let _ = stopped.await;
        }));
        (addr, stop)
    }

    #[tokio::test]
    async fn pipelined_requests_share_a_connection() {
        let (addr, _stop) = spawn().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                b"GET /api/holidays/health HTTP/1.1\r\nHost: a\r\n\r\n\
                  GET /api/holidays/health HTTP/1.1\r\nHost: a\r\nConnection: close\r\n\r\n",
            )
            .await
            .unwrap();

        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert_eq!(raw.matches("HTTP/1.1 200 OK\r\n").count(), 2);
        assert!(raw.contains("Connection: keep-alive\r\n"));
        assert!(raw.ends_with("Connection: close\r\nContent-Length: 2\r\n\r\nup"));
    }

    #[tokio::test]
    async fn garbage_gets_400_and_close() {
        let (addr, _stop) = spawn().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"NOT AN HTTP REQUEST\r\n\r\n").await.unwrap();

        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn bind_reports_the_address() {
        let taken = Server::bind("127.0.0.1:0").await.unwrap();
        let err = Server::bind(taken.local_addr().to_string()).await.err().unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
