//! Server configuration.

use std::net::SocketAddr;

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 9000;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The read buffer size.
    pub read_buffer_size: usize,
    /// Upper bound on the size of one request, headers and body together.
    pub max_request_size: usize,
    /// Answer preflights and add permissive cross-origin headers to every response.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            max_connections: 1024,
            read_buffer_size: 8192,
            max_request_size: 1024 * 1024,
            cors: false,
        }
    }
}
