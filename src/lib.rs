//! A configuration-driven HTTP mock server.
//!
//! routemock reads a JSON route table and serves canned JSON responses. Each
//! route can demand exact path parameter values, header values and body
//! fields; requests that miss one of them get a `400` naming the offending
//! constraint instead of the canned response.
//!
//! # Route file
//!
//! ```json
//! {
//!   "/users/:id": {
//!     "method": "GET",
//!     "params": { "id": "42" },
//!     "headers": { "x-token": "abc" },
//!     "response": { "id": 42, "name": "alice" }
//!   },
//!   "/users": {
//!     "method": "POST",
//!     "body": { "name": "alice" },
//!     "response": { "created": true }
//!   }
//! }
//! ```
//!
//! `method` defaults to `GET` and `response` to `{}`; `params`, `headers`
//! and `body` default to no constraint.
//!
//! # Examples
//!
//! ```
//! use routemock::{evaluate, parse_routes, HttpRequest, HttpVersion, MatchError, Method};
//! use std::collections::HashMap;
//!
//! let routes = parse_routes(r#"{"/users/:id": {"params": {"id": "42"}, "response": {"ok": true}}}"#).unwrap();
//!
//! let mut headers = HashMap::new();
//! headers.insert("Host".to_string(), "localhost".to_string());
//! let mut request = HttpRequest::new(Method::GET, "/users/43".to_string(), HttpVersion::Http11, headers);
//! request.path_params.insert("id".to_string(), "43".to_string());
//!
//! assert_eq!(evaluate(&routes[0], &request), Err(MatchError::ParamMismatch("id".to_string())));
//! ```
//!
//! Serving a table:
//!
//! ```no_run
//! use routemock::{build_server, load_routes, ServerConfig};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), routemock::ServerError> {
//! let server = build_server(ServerConfig::default(), load_routes(Path::new("routes.json")));
//! server.start().await
//! # }
//! ```

// Wire-level request parsing
pub mod parser;

// HTTP server, routing table and responses
pub mod server;

// Route declarations, loading, matching and dispatch
pub mod mock;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use server::{Error as ServerError, HttpResponse, HttpServer, PathPattern, Router, ServerConfig, StatusCode};
pub use mock::{
    build_server, evaluate, load_routes, parse_routes, register, respond, shallow_equal, Error as RouteError,
    MatchError, RouteDeclaration,
};
