//! HTTP response produced by the request handler

use std::collections::HashMap;

use super::constants::headers;

/// HTTP response builder with fluent API
///
/// # Example
///
/// ```rust,ignore
/// use nox_core::http::HttpResponse;
///
/// let response = HttpResponse::new(200)
///     .content_type("application/json")
///     .body(br#"{"status":1}"#.to_vec());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self { status, headers: HashMap::new(), body: Vec::new() }
    }

    /// Create a 200 OK response
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Redirect to another URL with the given status
    pub fn redirect(location: &str, status: u16) -> Self {
        Self::new(status).header(headers::LOCATION, location)
    }

    // Builder methods

    /// Set a header
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the Content-Type header
    pub fn content_type(self, content_type: &str) -> Self {
        self.header(headers::CONTENT_TYPE, content_type)
    }

    /// Set the body as raw bytes
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self.headers.insert(headers::CONTENT_LENGTH.to_string(), self.body.len().to_string());
        self
    }

    // Accessors

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn get_headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, with invalid UTF-8 replaced
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::ok()
    }
}
