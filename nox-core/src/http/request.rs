//! Request-side types seen by the dispatcher
//!
//! [`RequestContext`] is the per-request state that replaces ambient globals:
//! the method and path being routed, the query string, the named captures
//! bound by route matching, and the response-shaping flags set by admission
//! checks and chosen-route hooks.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use super::HttpError;
use crate::app::AppContext;

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    /// Convert method to string
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

impl AsRef<str> for HttpMethod {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for HttpMethod {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::GET),
            "POST" => Ok(HttpMethod::POST),
            "PUT" => Ok(HttpMethod::PUT),
            "DELETE" => Ok(HttpMethod::DELETE),
            "PATCH" => Ok(HttpMethod::PATCH),
            "HEAD" => Ok(HttpMethod::HEAD),
            "OPTIONS" => Ok(HttpMethod::OPTIONS),
            _ => Err(HttpError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parsed query parameters from URL
pub type QueryParams = HashMap<String, String>;

/// Named captures bound while matching route bases and routes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParameters {
    values: HashMap<String, String>,
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }

    /// Parse a parameter, e.g. `ctx.parameters().parse::<i64>("id")`
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| v.parse().ok())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for RequestParameters {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

/// State of one request as it travels through the dispatcher
///
/// # Example
///
/// ```rust,ignore
/// use nox_core::http::{HttpMethod, RequestContext};
///
/// let mut ctx = RequestContext::new(HttpMethod::GET, "/users/42?tab=posts");
/// assert_eq!(ctx.path(), "/users/42");
/// assert_eq!(ctx.query_param("tab"), Some("posts"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: String,
    path: String,
    query_params: QueryParams,
    headers: HashMap<String, String>,
    parameters: RequestParameters,
    response_status: Option<u16>,
    response_headers: HashMap<String, String>,
    output_json: bool,
    rewrite_depth: u32,
    app: Option<Arc<AppContext>>,
}

impl RequestContext {
    /// Create a context for `method` and `path`; the path gains a leading `/`
    /// and its query string is split off.
    pub fn new(method: impl AsRef<str>, path: &str) -> Self {
        let (path, query_params) = parse_path_and_query(path);
        Self {
            method: method.as_ref().to_uppercase(),
            path,
            query_params,
            headers: HashMap::new(),
            parameters: RequestParameters::new(),
            response_status: None,
            response_headers: HashMap::new(),
            output_json: false,
            rewrite_depth: 0,
            app: None,
        }
    }

    /// Attach the application root (config and connection pool)
    pub fn with_app(mut self, app: Arc<AppContext>) -> Self {
        self.app = Some(app);
        self
    }

    /// Add a request header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    /// Default for the JSON-output flag, normally taken from `RouterConfig`
    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    // Accessors

    /// Upper-case HTTP method
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path without the query string
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &QueryParams {
        &self.query_params
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_params.get(key).map(|s| s.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    pub fn parameters(&self) -> &RequestParameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut RequestParameters {
        &mut self.parameters
    }

    /// Shorthand for `parameters().get(name)`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.parameters.get(name)
    }

    pub fn app(&self) -> Option<&Arc<AppContext>> {
        self.app.as_ref()
    }

    /// Status code chosen by an admission check or a rewrite, if any
    pub fn response_status(&self) -> Option<u16> {
        self.response_status
    }

    pub fn set_response_status(&mut self, status: u16) {
        self.response_status = Some(status);
    }

    pub fn response_headers(&self) -> &HashMap<String, String> {
        &self.response_headers
    }

    pub fn set_response_header(&mut self, name: &str, value: &str) {
        self.response_headers.insert(name.to_string(), value.to_string());
    }

    /// Whether structured handler results are serialized to JSON text
    pub fn output_json(&self) -> bool {
        self.output_json
    }

    pub fn set_output_json(&mut self, enabled: bool) {
        self.output_json = enabled;
    }

    /// Number of internal re-dispatches this request went through
    pub fn rewrite_depth(&self) -> u32 {
        self.rewrite_depth
    }

    /// Point the context at a new path (and optionally method) for an
    /// internal re-dispatch. Captures bound for the previous path are dropped.
    pub(crate) fn reroute(&mut self, path: &str, method: Option<&str>) {
        let (path, query_params) = parse_path_and_query(path);
        self.path = path;
        self.parameters = RequestParameters::new();
        if !query_params.is_empty() {
            self.query_params = query_params;
        }
        if let Some(method) = method {
            self.method = method.to_uppercase();
        }
        self.rewrite_depth += 1;
    }

    pub(crate) fn replace_parameters(&mut self, parameters: RequestParameters) {
        self.parameters = parameters;
    }
}

/// Parse path and query parameters
fn parse_path_and_query(full_path: &str) -> (String, QueryParams) {
    let (path, query) = match full_path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (full_path, None),
    };
    let path = if path.starts_with('/') { path.to_string() } else { format!("/{}", path) };

    let mut params = HashMap::new();
    for pair in query.unwrap_or_default().split('&') {
        match pair.split_once('=') {
            Some((key, value)) => {
                params.insert(decode_query_component(key), decode_query_component(value));
            }
            None if !pair.is_empty() => {
                params.insert(decode_query_component(pair), String::new());
            }
            None => {}
        }
    }

    (path, params)
}

/// Form-style query decoding: `+` is a space, `%XX` escapes are resolved.
/// Undecodable input is kept as given.
fn decode_query_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_parsing() {
        assert_eq!("GET".parse::<HttpMethod>().unwrap(), HttpMethod::GET);
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::POST);
        assert!("BREW".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_path_normalization() {
        let ctx = RequestContext::new("get", "users/42");
        assert_eq!(ctx.method(), "GET");
        assert_eq!(ctx.path(), "/users/42");
    }

    #[test]
    fn test_query_split() {
        let ctx = RequestContext::new(HttpMethod::GET, "/search?q=rust+lang&page=2&flag");
        assert_eq!(ctx.path(), "/search");
        assert_eq!(ctx.query_param("q"), Some("rust lang"));
        assert_eq!(ctx.query_param("page"), Some("2"));
        assert_eq!(ctx.query_param("flag"), Some(""));
    }

    #[test]
    fn test_query_percent_decoding() {
        let ctx = RequestContext::new(HttpMethod::GET, "/search?q=caf%C3%A9&tag=a%2Bb&name%20x=%41");
        assert_eq!(ctx.query_param("q"), Some("café"));
        assert_eq!(ctx.query_param("tag"), Some("a+b"));
        assert_eq!(ctx.query_param("name x"), Some("A"));

        // Invalid UTF-8 after decoding keeps the raw text
        let ctx = RequestContext::new(HttpMethod::GET, "/search?q=%FF");
        assert_eq!(ctx.query_param("q"), Some("%FF"));
    }

    #[test]
    fn test_reroute_counts_depth() {
        let mut ctx = RequestContext::new(HttpMethod::POST, "/a");
        ctx.reroute("/b", None);
        assert_eq!(ctx.path(), "/b");
        assert_eq!(ctx.method(), "POST");
        ctx.reroute("c", Some("get"));
        assert_eq!(ctx.path(), "/c");
        assert_eq!(ctx.method(), "GET");
        assert_eq!(ctx.rewrite_depth(), 2);
    }

    #[test]
    fn test_reroute_drops_previous_captures() {
        let mut ctx = RequestContext::new(HttpMethod::GET, "/users/42");
        ctx.parameters_mut().insert("id", "42");
        ctx.reroute("/login", None);
        assert!(ctx.parameters().is_empty());
        assert_eq!(ctx.param("id"), None);
    }

    #[test]
    fn test_parameters_parse() {
        let mut params = RequestParameters::new();
        params.insert("id", "42");
        assert_eq!(params.parse::<i64>("id"), Some(42));
        assert_eq!(params.parse::<i64>("missing"), None);
    }
}
