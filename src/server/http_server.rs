//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::signal;
use log::{debug, error, info, warn};

use crate::parser::{Method, content_length, decode_chunked, head_length, is_chunked, parse_request};
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::handler::Router;
use crate::server::response::{HttpResponse, StatusCode};

/// An HTTP server.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    /// The routing table, fixed for the lifetime of the server.
    pub router: Arc<Router>,
}

impl HttpServer {
    /// Create a new HTTP server serving the given routing table.
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
        }
    }

    /// Log the registered endpoints.
    fn display_server_info(&self) {
        if self.router.is_empty() {
            warn!("No endpoints registered, every request will be answered with 404");
            return;
        }

        info!("Registered endpoints:");
        for route in self.router.routes() {
            let methods = route.methods.iter()
                .map(|m| m.to_string())
                .collect::<Vec<String>>()
                .join(", ");
            info!("  {methods} {}", route.pattern);
        }
    }

    /// Set up the TCP listener.
    async fn setup_listener(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        let port = listener.local_addr()?.port();
        info!("Mock server running on http://localhost:{port}");
        Ok(listener)
    }

    /// Set up a Ctrl+C handler for graceful shutdown.
    fn setup_ctrl_c_handler(shutdown_tx: mpsc::Sender<()>, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    let _ = shutdown_tx.send(()).await;
                }
                Err(e) => {
                    error!("Error setting up Ctrl+C handler: {e}");
                }
            }
        });
    }

    /// Handle a new connection.
    async fn handle_new_connection(
        mut socket: TcpStream,
        addr: SocketAddr,
        semaphore: Arc<Semaphore>,
        router: Arc<Router>,
        config: ServerConfig,
        tasks: &mut JoinSet<()>,
    ) {
        // Try to acquire a permit from the semaphore
        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                let response = HttpResponse::new(StatusCode::ServiceUnavailable)
                    .with_content_type("text/plain")
                    .with_body_string("Server is at capacity, please try again later");
                // Written off the accept loop so a slow client cannot stall it
                tasks.spawn(async move {
                    let _ = socket.write_all(&response.to_bytes()).await;
                });
                return;
            }
        };

        tasks.spawn(async move {
            // The permit is dropped when the task completes, releasing the semaphore slot
            let _permit = permit;

            match Self::handle_connection(&mut socket, &router, &config).await {
                Ok(()) => {}
                Err(Error::IoError(e)) => warn!("I/O error on connection from {addr}: {e}"),
                Err(e) => debug!("Request from {addr} not served: {e}"),
            }
        });
    }

    /// Handle connection errors.
    async fn handle_connection_error(e: std::io::Error) {
        error!("Error accepting connection: {e}");
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }

    /// Perform graceful shutdown.
    async fn perform_shutdown(tasks: &mut JoinSet<()>) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let shutdown_timeout = tokio::time::Duration::from_secs(30);
        let _ = tokio::time::timeout(shutdown_timeout, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    if !e.is_cancelled() {
                        error!("Task failed during shutdown: {e}");
                    }
                }
            }
        }).await;

        info!("Server shutdown complete");
    }

    /// Bind the configured address and serve until Ctrl+C.
    pub async fn start(&self) -> Result<(), Error> {
        let listener = self.setup_listener().await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until Ctrl+C.
    ///
    /// Accept errors are logged and retried; nothing that happens while
    /// handling a single connection stops the loop.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Error> {
        self.display_server_info();

        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let mut tasks = JoinSet::new();

        Self::setup_ctrl_c_handler(shutdown_tx, &mut tasks);

        loop {
            tokio::select! {
                Some(()) = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            Self::handle_new_connection(
                                socket,
                                addr,
                                semaphore.clone(),
                                self.router.clone(),
                                self.config.clone(),
                                &mut tasks,
                            ).await;
                        },
                        Err(e) => Self::handle_connection_error(e).await,
                    }
                }
            }

            // Reap finished connection tasks so the set does not grow unbounded
            while tasks.try_join_next().is_some() {}
        }

        Self::perform_shutdown(&mut tasks).await;

        Ok(())
    }

    /// Read one complete request: the header block plus the body announced by
    /// `Content-Length` or chunked framing, or everything up to end of stream.
    async fn read_request(
        socket: &mut (impl AsyncRead + Unpin),
        config: &ServerConfig,
    ) -> Result<Vec<u8>, Error> {
        let mut data = Vec::new();
        let mut buf = vec![0; config.read_buffer_size.max(1)];

        loop {
            let n = socket.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);

            if data.len() > config.max_request_size {
                return Err(Error::RequestTooLarge(config.max_request_size));
            }

            if let Some(head_len) = head_length(&data) {
                let head = String::from_utf8_lossy(&data[..head_len]);
                if head_header(&head, "Transfer-Encoding").is_some_and(is_chunked) {
                    // Complete once the last chunk is in; malformed framing is reported by the parser
                    if !matches!(decode_chunked(&data[head_len..]), Ok(None)) {
                        break;
                    }
                    continue;
                }

                let total = head_len
                    + head_header(&head, "Content-Length")
                        .and_then(|value| content_length(value).ok())
                        .unwrap_or(0);
                if total > config.max_request_size {
                    return Err(Error::RequestTooLarge(config.max_request_size));
                }
                if data.len() >= total {
                    break;
                }
            }
        }

        Ok(data)
    }

    /// Write a response, adding cross-origin headers when enabled.
    ///
    /// Responses to `HEAD` carry the headers only.
    async fn send(
        socket: &mut (impl AsyncWrite + Unpin),
        response: HttpResponse,
        config: &ServerConfig,
        head_only: bool,
    ) -> Result<(), Error> {
        let response = if config.cors { response.with_cors() } else { response };
        let response = if head_only { response.without_body() } else { response };
        socket.write_all(&response.to_bytes()).await?;
        socket.flush().await?;
        Ok(())
    }

    /// Handle a single connection.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        router: &Router,
        config: &ServerConfig,
    ) -> Result<(), Error> {
        let data = match Self::read_request(socket, config).await {
            Ok(data) => data,
            Err(Error::RequestTooLarge(limit)) => {
                let response = HttpResponse::new(StatusCode::PayloadTooLarge)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Request exceeds {limit} bytes"));
                Self::send(socket, response, config, false).await?;
                return Err(Error::RequestTooLarge(limit));
            }
            Err(e) => return Err(e),
        };

        if data.is_empty() {
            return Ok(()); // Connection closed
        }

        let mut request = match parse_request(&data) {
            Ok(req) => req,
            Err(e) => {
                let response = HttpResponse::new(StatusCode::BadRequest)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Error parsing request: {e}"));
                Self::send(socket, response, config, false).await?;
                return Err(Error::ParseError(e));
            }
        };

        if config.cors && request.method == Method::OPTIONS {
            return Self::send(socket, HttpResponse::new(StatusCode::NoContent), config, false).await;
        }

        let method = request.method;
        let path = request.route_path().to_string();
        let head_only = method == Method::HEAD;

        let Some((route, params)) = router.find(method, &path) else {
            let response = HttpResponse::new(StatusCode::NotFound)
                .with_content_type("text/plain")
                .with_body_string(format!("Not found: {path}"));
            Self::send(socket, response, config, head_only).await?;
            return Err(Error::NotFound(method, path));
        };

        request.path_params = params;

        let response = match (route.handler)(request).await {
            Ok(resp) => resp,
            Err(e) => {
                let response = HttpResponse::new(StatusCode::InternalServerError)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Internal server error: {e}"));
                Self::send(socket, response, config, head_only).await?;
                return Err(e);
            }
        };

        debug!("{method} {path} -> {}", response.status.as_u16());
        Self::send(socket, response, config, head_only).await
    }
}

/// The first value of a header in a raw header block.
fn head_header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
}
