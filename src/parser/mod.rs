//! HTTP parser module.
//!
//! Turns the raw bytes of an HTTP/1.x request into an [`HttpRequest`]: request
//! line, headers and a body delimited by `Content-Length` or chunked
//! transfer coding.

mod request;
mod method;
mod version;
mod error;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;

// Re-export the parsing functions
pub use request::{decode_chunked, head_length, parse_request};
pub(crate) use request::{content_length, is_chunked};
