//! Path pattern matching.
//!
//! Patterns are written the way route tables usually spell them:
//! `/users/:id/posts/:post_id`. A `:name` segment captures exactly one
//! non-empty path segment; every other segment must match literally,
//! ignoring ASCII case.

use std::collections::HashMap;
use std::fmt;

/// A segment in a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// A literal string segment.
    Literal(String),
    /// A named placeholder (e.g., `:id`).
    Param(String),
}

/// A parsed path pattern for matching request paths.
#[derive(Debug, Clone)]
pub struct PathPattern {
    pattern: String,
    segments: Vec<PathSegment>,
}

impl PathPattern {
    /// Parses a path pattern string.
    pub fn new(pattern: &str) -> Self {
        let segments = split_segments(pattern)
            .into_iter()
            .map(|part| match part.strip_prefix(':') {
                Some(name) if !name.is_empty() => PathSegment::Param(name.to_string()),
                _ => PathSegment::Literal(part.to_string()),
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Attempts to match a request path (without query string).
    ///
    /// Returns the percent-decoded placeholder values if the path matches.
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts = split_segments(path);
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                PathSegment::Literal(literal) => {
                    if !literal.eq_ignore_ascii_case(part) {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), percent_decode(part)?);
                }
            }
        }

        Some(params)
    }

    /// Returns the pattern as written.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Split a path into segments, ignoring the leading slash and one trailing slash.
fn split_segments(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

/// Decode `%XX` escapes. Malformed escapes or non UTF-8 output yield `None`.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(decoded).ok()
}
