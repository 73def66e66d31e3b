//! Route declarations: one configured endpoint and what it expects.

use log::warn;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::mock::error::Error;
use crate::parser::Method;

/// A configured endpoint.
///
/// Immutable once loaded. An empty `params`, `headers` or `body` places no
/// constraint on requests. Path parameters and headers always arrive as
/// strings, so a non-string expected value in `params` or `headers` can
/// never be met.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDeclaration {
    /// Path pattern, possibly with `:name` placeholders.
    pub pattern: String,
    /// The method the route is bound to.
    pub method: Method,
    /// Required path parameter values, in declaration order.
    pub params: Vec<(String, Value)>,
    /// Required header values, in declaration order. Names match case-insensitively.
    pub headers: Vec<(String, Value)>,
    /// The exact top-level fields the JSON body must carry.
    pub body: Map<String, Value>,
    /// Returned verbatim when a request satisfies every constraint.
    pub response: Value,
}

/// A declaration as written in the route file.
#[derive(Debug, Deserialize)]
struct RawDeclaration {
    #[serde(default = "default_method")]
    method: String,
    #[serde(default = "empty_object")]
    response: Value,
    #[serde(default)]
    headers: Map<String, Value>,
    #[serde(default)]
    params: Map<String, Value>,
    #[serde(default)]
    body: Map<String, Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl RouteDeclaration {
    /// A declaration without constraints.
    pub fn new(pattern: impl Into<String>, method: Method, response: Value) -> Self {
        Self {
            pattern: pattern.into(),
            method,
            params: Vec::new(),
            headers: Vec::new(),
            body: Map::new(),
            response,
        }
    }

    /// Require a path parameter value.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Require a header value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Require a top-level body field.
    pub fn with_body_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(name.into(), value.into());
        self
    }

    /// Build a declaration from one entry of the route file.
    ///
    /// Missing fields take their defaults: method `GET`, response `{}` and
    /// no constraints. The method is matched case-insensitively against the
    /// declarable methods.
    pub fn from_json(pattern: &str, value: Value) -> Result<Self, Error> {
        let invalid = |reason: String| Error::InvalidDeclaration {
            pattern: pattern.to_string(),
            reason,
        };

        if !value.is_object() {
            return Err(invalid("expected a JSON object".to_string()));
        }

        let raw: RawDeclaration = serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;

        let method = Method::from_declared(&raw.method).map_err(|_| Error::UnsupportedMethod {
            pattern: pattern.to_string(),
            method: raw.method.clone(),
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            method,
            params: constraint_pairs(pattern, raw.params, "params"),
            headers: constraint_pairs(pattern, raw.headers, "headers"),
            body: raw.body,
            response: raw.response,
        })
    }
}

/// Flatten a constraint object into ordered pairs.
fn constraint_pairs(pattern: &str, fields: Map<String, Value>, section: &str) -> Vec<(String, Value)> {
    for (name, value) in &fields {
        if !value.is_string() {
            warn!("Route {pattern}: {section}.{name} is {value}, not a string; requests will never match it");
        }
    }
    fields.into_iter().collect()
}
