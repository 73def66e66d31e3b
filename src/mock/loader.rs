//! Route table loading.

use std::path::Path;
use log::{error, info, warn};
use serde_json::Value;

use crate::mock::declaration::RouteDeclaration;
use crate::mock::error::Error;

/// Parse a route table from JSON text.
///
/// The table is an object keyed by path pattern. Declarations come back in
/// file order; a duplicated key keeps its first position and its last value.
/// Declarations that fail to parse are logged and skipped.
pub fn parse_routes(content: &str) -> Result<Vec<RouteDeclaration>, Error> {
    let Value::Object(entries) = serde_json::from_str::<Value>(content)? else {
        return Err(Error::NotAnObject);
    };

    let mut declarations = Vec::with_capacity(entries.len());
    for (pattern, entry) in entries {
        match RouteDeclaration::from_json(&pattern, entry) {
            Ok(declaration) => declarations.push(declaration),
            Err(e) => warn!("Skipping route: {e}"),
        }
    }

    Ok(declarations)
}

/// Read and parse a route file.
pub fn read_routes(path: &Path) -> Result<Vec<RouteDeclaration>, Error> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_routes(&content)
}

/// Load a route file, falling back to an empty table on any error.
pub fn load_routes(path: &Path) -> Vec<RouteDeclaration> {
    match read_routes(path) {
        Ok(declarations) => {
            info!("Loaded {} routes from {}", declarations.len(), path.display());
            declarations
        }
        Err(e) => {
            error!("Failed to load routes: {e}");
            Vec::new()
        }
    }
}
