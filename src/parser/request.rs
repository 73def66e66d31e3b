//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::str::FromStr;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// Represents an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target, including any query string
    pub path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers, names as sent by the client
    pub headers: HashMap<String, String>,
    /// The request body
    pub body: Vec<u8>,
    /// Named path parameters, filled in by the router on dispatch
    pub path_params: HashMap<String, String>,
}

impl HttpRequest {
    /// Create a new HTTP request with an empty body.
    ///
    /// Path parameters start empty until a route pattern resolves them.
    pub fn new(method: Method, path: String, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        Self {
            method,
            path,
            version,
            headers,
            body: Vec::new(),
            path_params: HashMap::new(),
        }
    }

    /// Create a new HTTP request with a body.
    pub fn with_body(method: Method, path: String, version: HttpVersion, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        let mut request = Self::new(method, path, version, headers);
        request.body = body;
        request
    }

    /// The path used for routing: the request target without its query string.
    pub fn route_path(&self) -> &str {
        self.path.split_once('?').map_or(self.path.as_str(), |(path, _)| path)
    }

    /// Get a header value, ignoring the case of the header name.
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                Some(v)
            } else {
                None
            }
        })
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Get a resolved path parameter.
    pub fn get_path_param(&self, name: &str) -> Option<&String> {
        self.path_params.get(name)
    }

    /// Parse the request body as JSON.
    ///
    /// # Returns
    ///
    /// The parsed JSON value, or an error if the body is not valid JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }

        let json = serde_json::from_slice(&self.body)?;
        Ok(json)
    }

    /// The top-level fields of a JSON object body.
    ///
    /// Anything that is not a JSON object sent as `application/json` (no body,
    /// another content type, invalid JSON, an array or a scalar) yields an
    /// empty object.
    pub fn json_object(&self) -> Map<String, Value> {
        match self.json::<Value>() {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        }
    }

    /// Check if the request has a JSON body.
    ///
    /// Only the media type counts: parameters such as `charset` are ignored
    /// and the comparison is case-insensitive.
    pub fn is_json(&self) -> bool {
        self.get_header("Content-Type")
            .and_then(|content_type| content_type.split(';').next())
            .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case("application/json"))
    }
}

/// Length of the header block, including the blank line that ends it.
///
/// Returns `None` while the terminating blank line has not been seen yet.
pub fn head_length(input: &[u8]) -> Option<usize> {
    let crlf = input
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| i + 4);
    let lf = input
        .windows(2)
        .position(|w| w == b"\n\n")
        .map(|i| i + 2);

    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Parse an HTTP request from a byte slice.
///
/// The body is whatever follows the header block, cut to `Content-Length`
/// when that header is present. A `Transfer-Encoding: chunked` body is
/// decoded and takes precedence over `Content-Length`. Repeated headers are
/// merged into one comma-separated value under the first spelling seen.
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    let head_end = head_length(input).unwrap_or(input.len());
    let (head, rest) = input.split_at(head_end);

    let head = match std::str::from_utf8(head) {
        Ok(s) => s,
        Err(_) => return Err(Error::MalformedRequestLine("Invalid UTF-8".to_string())),
    };

    let mut lines = head.lines();

    let request_line = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => return Err(Error::EmptyRequest),
    };

    // Split the request line into method, path, and version
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    let path = parts[1].to_string();
    if !path.starts_with('/') {
        return Err(Error::InvalidPath);
    }

    let version = HttpVersion::from_str(parts[2])?;

    let mut headers: HashMap<String, String> = HashMap::new();
    for line in lines {
        // Empty line indicates the end of headers
        if line.is_empty() {
            break;
        }

        let (name, value) = line.split_once(':').ok_or(Error::InvalidHeaderFormat)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidHeaderFormat);
        }

        let value = value.trim();
        if let Some((_, existing)) = headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            existing.push_str(", ");
            existing.push_str(value);
            continue;
        }
        headers.insert(name.to_string(), value.to_string());
    }

    if version.requires_host() && !headers.keys().any(|k| k.eq_ignore_ascii_case("Host")) {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    let mut request = HttpRequest::new(method, path, version, headers);

    if request.get_header("Transfer-Encoding").is_some_and(|value| is_chunked(value)) {
        request.body = decode_chunked(rest)?
            .ok_or_else(|| Error::InvalidChunkedBody("missing last chunk".to_string()))?;
        return Ok(request);
    }

    let body = match request.get_header("Content-Length") {
        Some(value) => {
            let length = content_length(value)?;
            &rest[..length.min(rest.len())]
        }
        None => rest,
    };
    request.body = body.to_vec();

    Ok(request)
}

/// Whether a `Transfer-Encoding` value ends with the `chunked` coding.
pub(crate) fn is_chunked(value: &str) -> bool {
    value
        .rsplit(',')
        .next()
        .is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
}

/// Decode a chunked message body.
///
/// Returns `Ok(None)` while the last chunk and the trailer section have not
/// fully arrived. Chunk extensions and trailer fields are discarded.
pub fn decode_chunked(input: &[u8]) -> Result<Option<Vec<u8>>, Error> {
    let mut body = Vec::new();
    let mut pos = 0;

    loop {
        let Some(line_len) = line_length(&input[pos..]) else {
            return Ok(None);
        };
        let size = chunk_size(&input[pos..pos + line_len])?;
        pos += line_len + 2;

        if size == 0 {
            // Trailer fields, then a blank line
            loop {
                let Some(line_len) = line_length(&input[pos..]) else {
                    return Ok(None);
                };
                pos += line_len + 2;
                if line_len == 0 {
                    return Ok(Some(body));
                }
            }
        }

        let data_end = pos
            .checked_add(size)
            .ok_or_else(|| Error::InvalidChunkedBody(format!("chunk too large: {size:x}")))?;
        if input.len().saturating_sub(data_end) < 2 {
            return Ok(None);
        }
        if &input[data_end..data_end + 2] != b"\r\n" {
            return Err(Error::InvalidChunkedBody("chunk data not followed by CRLF".to_string()));
        }
        body.extend_from_slice(&input[pos..data_end]);
        pos = data_end + 2;
    }
}

/// Length of the line at the start of `input`, without its CRLF.
fn line_length(input: &[u8]) -> Option<usize> {
    input.windows(2).position(|w| w == b"\r\n")
}

/// Parse a chunk-size line, ignoring any chunk extensions.
fn chunk_size(line: &[u8]) -> Result<usize, Error> {
    let line = String::from_utf8_lossy(line);
    let size = line.split(';').next().unwrap_or_default().trim();
    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidChunkedBody(format!("bad chunk size: {line}")));
    }
    usize::from_str_radix(size, 16).map_err(|_| Error::InvalidChunkedBody(format!("bad chunk size: {line}")))
}

/// Parse the value of a `Content-Length` header.
pub(crate) fn content_length(value: &str) -> Result<usize, Error> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::InvalidContentLength(value.to_string()))
}
