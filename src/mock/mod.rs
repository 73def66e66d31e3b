//! The mock engine.
//!
//! Route declarations are loaded once from a JSON file, bound to a
//! [`Router`](crate::server::Router) one handler per declaration, and every
//! request reaching a handler is checked against the declaration's expected
//! path parameters, body and headers before the canned response is sent.

mod declaration;
mod dispatcher;
mod error;
mod loader;
mod matcher;
mod tests;

pub use declaration::RouteDeclaration;
pub use dispatcher::{register, respond};
pub use error::{Error, MatchError};
pub use loader::{load_routes, parse_routes, read_routes};
pub use matcher::{evaluate, shallow_equal};

use crate::server::{HttpServer, Router, ServerConfig};

/// Build a server whose routing table holds exactly `declarations`.
pub fn build_server(config: ServerConfig, declarations: Vec<RouteDeclaration>) -> HttpServer {
    let mut router = Router::new();
    register(&mut router, declarations);
    HttpServer::new(config, router)
}
