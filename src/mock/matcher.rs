//! Request matching against a route declaration.

use serde_json::{Map, Value};

use crate::mock::declaration::RouteDeclaration;
use crate::mock::error::MatchError;
use crate::parser::HttpRequest;

/// Check a request against every constraint of a declaration.
///
/// Constraints are checked in a fixed order (path parameters, then body,
/// then headers) and the first failure is reported. On success the
/// declared response is returned.
pub fn evaluate<'a>(declaration: &'a RouteDeclaration, request: &HttpRequest) -> Result<&'a Value, MatchError> {
    for (name, expected) in &declaration.params {
        if !string_equal(request.get_path_param(name), expected) {
            return Err(MatchError::ParamMismatch(name.clone()));
        }
    }

    if !declaration.body.is_empty() && !shallow_equal(&request.json_object(), &declaration.body) {
        return Err(MatchError::BodyMismatch);
    }

    for (name, expected) in &declaration.headers {
        if !string_equal(request.get_header(name), expected) {
            return Err(MatchError::HeaderMismatch(name.clone()));
        }
    }

    Ok(&declaration.response)
}

/// A present request value equals a declared string; nothing else does.
fn string_equal(actual: Option<&String>, expected: &Value) -> bool {
    matches!((actual, expected), (Some(actual), Value::String(expected)) if actual == expected)
}

/// Compare two objects on their top-level fields only.
///
/// Both sides need the same number of fields and equal values under every
/// key of `actual`. Only scalars (null, booleans, numbers, strings) can be
/// equal; nested objects and arrays never are.
pub fn shallow_equal(actual: &Map<String, Value>, expected: &Map<String, Value>) -> bool {
    if actual.len() != expected.len() {
        return false;
    }

    actual.iter().all(|(key, value)| {
        expected
            .get(key)
            .is_some_and(|other| scalar_equal(value, other))
    })
}

fn scalar_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}
