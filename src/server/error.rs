//! Error types for the HTTP server.

use thiserror::Error;

use crate::parser::{Error as ParserError, Method};

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// No route is registered for the method and path.
    #[error("No route for {0} {1}")]
    NotFound(Method, String),

    /// The request grew past the configured size limit.
    #[error("Request exceeds {0} bytes")]
    RequestTooLarge(usize),

    /// Internal server error.
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
