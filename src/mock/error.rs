//! Error types for route loading and request matching.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the route table.
///
/// None of these stop the server: a failed file load degrades to an empty
/// table and a bad declaration is skipped.
#[derive(Debug, Error)]
pub enum Error {
    /// The route file could not be read.
    #[error("Could not read route file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The route file is not valid JSON.
    #[error("Route file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The route file is valid JSON but not an object keyed by path pattern.
    #[error("Route file must contain a JSON object keyed by path pattern")]
    NotAnObject,

    /// A declaration names a method routes cannot be bound to.
    #[error("Unsupported method {method} for route {pattern}")]
    UnsupportedMethod { pattern: String, method: String },

    /// A declaration has the wrong shape.
    #[error("Invalid declaration for route {pattern}: {reason}")]
    InvalidDeclaration { pattern: String, reason: String },
}

/// Why a request failed a route's constraints.
///
/// The display text is the message sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// A path parameter differs from the declared value.
    #[error("Incorrect value for parameter {0}")]
    ParamMismatch(String),

    /// The JSON body is not shallow-equal to the declared body.
    #[error("Incorrect request body")]
    BodyMismatch,

    /// A header differs from the declared value.
    #[error("Incorrect value for header {0}")]
    HeaderMismatch(String),
}
