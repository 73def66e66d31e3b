//! HTTP server for routemock.
//!
//! A small tokio server: an immutable [`Router`] of `:param` path patterns,
//! one request per connection, a connection limit and graceful shutdown on
//! Ctrl+C.

mod response;
mod config;
mod error;
mod handler;
mod http_server;
mod path;

// Re-export public items
pub use response::{HttpResponse, StatusCode};
pub use config::{ServerConfig, DEFAULT_PORT};
pub use error::Error;
pub use handler::{HandlerFn, HandlerFuture, Route, Router};
pub use http_server::HttpServer;
pub use path::PathPattern;
