//! HTTP request handlers and routing.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::parser::{HttpRequest, Method};
use crate::server::path::PathPattern;
use crate::server::{HttpResponse, Error};

/// Type alias for a boxed future that returns a Result<HttpResponse, Error>.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// Type alias for a handler function that takes an HttpRequest and returns a HandlerFuture.
pub type HandlerFn = Arc<dyn Fn(HttpRequest) -> HandlerFuture + Send + Sync>;

/// Represents a route in the HTTP server.
pub struct Route {
    /// The path pattern to match.
    pub pattern: PathPattern,
    /// The HTTP methods to match.
    pub methods: Vec<Method>,
    /// The handler function.
    pub handler: HandlerFn,
}

impl Route {
    /// Whether this route serves `method`.
    pub fn accepts(&self, method: Method) -> bool {
        self.methods.contains(&method) || (method == Method::HEAD && self.methods.contains(&Method::GET))
    }
}

/// The routing table.
///
/// Built once before the server starts and read-only afterwards, so request
/// tasks share it through an `Arc` without locking. Routes are tried in
/// registration order.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Create an empty routing table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route to the table.
    pub fn add_route<F, Fut>(&mut self, pattern: &str, methods: Vec<Method>, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |req: HttpRequest| -> HandlerFuture {
            Box::pin(handler(req))
        });

        self.routes.push(Route {
            pattern: PathPattern::new(pattern),
            methods,
            handler,
        });
    }

    /// Find the first route accepting `method` whose pattern matches `path`.
    ///
    /// Returns the route together with the path parameters it captured.
    /// `HEAD` is also accepted by routes that accept `GET`.
    pub fn find(&self, method: Method, path: &str) -> Option<(&Route, HashMap<String, String>)> {
        self.routes
            .iter()
            .filter(|route| route.accepts(method))
            .find_map(|route| route.pattern.match_path(path).map(|params| (route, params)))
    }

    /// The registered routes, in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
