//! HTTP transport.
//!
//! A hyper HTTP/1 server that buffers each request body (bounded by
//! [`ServerConfig::max_body_size`] and [`ServerConfig::request_timeout`]) and
//! runs the synchronous [`Pipeline`] on the blocking pool.
//!
//! # Example
//!
//! ```rust,no_run
//! use gantry_server::{Gantry, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = Gantry::new()
//!         .routes(|mapper| mapper.get("/ping").handle(|| "pong"))
//!         .build()?;
//!
//!     let config = ServerConfig::builder().http_addr("127.0.0.1:8080").build();
//!     Server::new(config, pipeline).run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use gantry_core::ResponseWriter;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::pipeline::Pipeline;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

type HttpResponse = Response<Full<Bytes>>;

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// I/O failure while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serves a [`Pipeline`] over HTTP/1.
pub struct Server {
    config: ServerConfig,
    pipeline: Pipeline,
}

impl Server {
    /// Creates a server.
    #[must_use]
    pub fn new(config: ServerConfig, pipeline: Pipeline) -> Self {
        Self { config, pipeline }
    }

    /// The transport configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The pipeline requests are fed into.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Runs until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and runs until `shutdown` triggers.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.config.socket_addr().map_err(|e| {
            ServerError::Bind(format!("invalid address '{}': {e}", self.config.http_addr()))
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("failed to bind to {addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// triggers, then waits up to the shutdown timeout for open
    /// connections to finish.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local = listener.local_addr()?;
        info!(addr = %local, "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, remote, shutdown).await {
                                    debug!(remote = %remote, error = %e, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => error!(error = %e, "failed to accept connection"),
                    }
                }
                () = shutdown.recv() => {
                    info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        let timeout = server.config.shutdown_timeout();
        info!(
            active = tracker.active_connections(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "waiting for open connections"
        );
        tokio::select! {
            () = tracker.wait_idle() => info!("all connections closed"),
            () = tokio::time::sleep(timeout) => warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            ),
        }

        info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);
        let service = service_fn(move |request: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(request).await) }
        });

        let connection = http1::Builder::new().serve_connection(io, service);
        let stopping = shutdown.recv();
        tokio::pin!(connection, stopping);

        let mut draining = false;
        loop {
            tokio::select! {
                result = connection.as_mut() => return result,
                () = &mut stopping, if !draining => {
                    debug!(remote = %remote, "finishing connection for shutdown");
                    draining = true;
                    connection.as_mut().graceful_shutdown();
                }
            }
        }
    }

    async fn handle_request(&self, request: Request<Incoming>) -> HttpResponse {
        let (parts, body) = request.into_parts();
        let limited = Limited::new(body, self.config.max_body_size());
        let collected = tokio::time::timeout(self.config.request_timeout(), limited.collect()).await;

        let body = match collected {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
                warn!(path = parts.uri.path(), limit = self.config.max_body_size(), "request body too large");
                return error_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "PAYLOAD_TOO_LARGE",
                    &format!("request body exceeds {} bytes", self.config.max_body_size()),
                );
            }
            Ok(Err(e)) => {
                warn!(path = parts.uri.path(), error = %e, "failed to read request body");
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "BODY_READ_ERROR",
                    &format!("failed to read request body: {e}"),
                );
            }
            Err(_) => {
                warn!(path = parts.uri.path(), "request body read timed out");
                return error_response(
                    StatusCode::REQUEST_TIMEOUT,
                    "REQUEST_TIMEOUT",
                    "request body read timed out",
                );
            }
        };

        let request = Request::from_parts(parts, body);
        let pipeline = self.pipeline.clone();
        match tokio::task::spawn_blocking(move || pipeline.handle(request)).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "request task failed");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "request processing failed",
                )
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> HttpResponse {
    let response = ResponseWriter::new();
    response.write_error(status, code, message);
    response.into_response()
}
