//! HTTP types shared by the router and its hosts
//!
//! The router does not own a socket: a host (any HTTP server) builds a
//! [`RequestContext`] from the incoming request, hands it to
//! [`RequestHandler`](crate::router::RequestHandler) and writes back the
//! resulting [`HttpResponse`].
//!
//! # Architecture
//!
//! - [`request`] - `HttpMethod`, `RequestContext` and `RequestParameters`
//! - [`response`] - `HttpResponse` builder

pub mod request;
pub mod response;

pub use request::{HttpMethod, QueryParams, RequestContext, RequestParameters};
pub use response::HttpResponse;

/// Result type for HTTP operations
pub type HttpResult<T> = std::result::Result<T, HttpError>;

/// HTTP-specific error types
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}

/// HTTP protocol constants
pub mod constants {
    /// Common HTTP headers
    pub mod headers {
        pub const CONTENT_TYPE: &str = "Content-Type";
        pub const CONTENT_LENGTH: &str = "Content-Length";
        pub const LOCATION: &str = "Location";
    }

    /// Common content types
    pub mod content_types {
        pub const JSON: &str = "application/json";
        pub const HTML: &str = "text/html; charset=utf-8";
        pub const TEXT: &str = "text/plain; charset=utf-8";
    }
}
