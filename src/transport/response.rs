//! Immutable record of a completed HTTP exchange

use http::{Method, StatusCode};
use url::Url;

/// Immutable record of one completed (or redirect-terminated) request.
///
/// Produced exactly once per request that obtained a response; never mutated
/// after construction. Header order and duplicates are preserved as received.
#[derive(Debug, Clone)]
pub struct RestResponse {
    method: Method,
    uri: Url,
    status_code: StatusCode,
    headers: Vec<(String, String)>,
    content: String,
}

impl RestResponse {
    /// Assemble a response record.
    pub fn new(
        method: Method,
        uri: Url,
        status_code: StatusCode,
        headers: Vec<(String, String)>,
        content: String,
    ) -> Self {
        Self {
            method,
            uri,
            status_code,
            headers,
            content,
        }
    }

    /// HTTP method of the originating request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// URI the request was issued against.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Received status code. A non-2xx status is not itself an error.
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Received headers in wire order, duplicates preserved.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Raw body content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True for a 3xx response carrying a `Location` header.
    pub fn is_redirect(&self) -> bool {
        self.status_code.is_redirection() && self.location().is_some()
    }

    /// The `Location` header, if present.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }
}
