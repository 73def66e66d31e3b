//! Binds route declarations to the router and turns match outcomes into responses.

use std::sync::Arc;
use log::debug;
use serde_json::json;

use crate::mock::declaration::RouteDeclaration;
use crate::mock::matcher::evaluate;
use crate::parser::HttpRequest;
use crate::server::{Error, HttpResponse, Router, StatusCode};

/// Register one route per declaration, in order. Returns how many were registered.
pub fn register(router: &mut Router, declarations: Vec<RouteDeclaration>) -> usize {
    let count = declarations.len();

    for declaration in declarations {
        let declaration = Arc::new(declaration);
        let pattern = declaration.pattern.clone();
        let method = declaration.method;

        router.add_route(&pattern, vec![method], move |request| {
            let declaration = Arc::clone(&declaration);
            async move { respond(&declaration, &request) }
        });
    }

    count
}

/// Answer a request routed to `declaration`.
///
/// A full match yields `200` with the declared response. Any failed
/// constraint yields `400` with `{"error": <reason>}`.
pub fn respond(declaration: &RouteDeclaration, request: &HttpRequest) -> Result<HttpResponse, Error> {
    match evaluate(declaration, request) {
        Ok(response) => HttpResponse::new(StatusCode::Ok).with_json(response),
        Err(mismatch) => {
            debug!("{} {} rejected: {mismatch}", request.method, request.path);
            HttpResponse::new(StatusCode::BadRequest).with_json(&json!({ "error": mismatch.to_string() }))
        }
    }
}
