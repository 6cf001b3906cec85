//! Routes registered at runtime
//!
//! Dynamic routes are tried only after every declared controller route has
//! been exhausted, in registration order. They share the admission and
//! re-routing semantics of declared routes.

use std::sync::Arc;

use super::admission::{AdmissionCheck, AttributeResponse};
use super::controller::HandlerFn;
use super::result::IntoHandlerResult;
use super::route::PathMatcher;
use super::ConfigError;
use crate::http::RequestContext;

/// A route added with [`Router::add_dynamic_route`](super::Router::add_dynamic_route)
///
/// # Example
///
/// ```rust,ignore
/// router.add_dynamic_route(
///     DynamicRoute::new("GET", r"/pages/(?P<slug>[a-z-]+)", true, |ctx: &mut RequestContext| {
///         format!("page {}", ctx.param("slug").unwrap_or_default())
///     })?
///     .with_route_check(|ctx: &RequestContext| {
///         if ctx.header("authorization").is_some() {
///             AttributeResponse::usable()
///         } else {
///             AttributeResponse::abort(401)
///         }
///     }),
/// );
/// ```
#[derive(Clone)]
pub struct DynamicRoute {
    request_method: String,
    request_path: String,
    is_regex: bool,
    matcher: PathMatcher,
    on_render: HandlerFn,
    on_route_check: Option<Arc<dyn AdmissionCheck>>,
}

impl DynamicRoute {
    /// Compiles `request_path` right away; an invalid regex is a load error
    pub fn new<F, R>(
        request_method: impl AsRef<str>,
        request_path: impl Into<String>,
        is_regex: bool,
        on_render: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&mut RequestContext) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        let request_path = request_path.into();
        Ok(Self {
            request_method: request_method.as_ref().to_uppercase(),
            matcher: PathMatcher::full(&request_path, is_regex)?,
            request_path,
            is_regex,
            on_render: Arc::new(move |ctx: &mut RequestContext| on_render(ctx).into_handler_result()),
            on_route_check: None,
        })
    }

    pub fn with_route_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&RequestContext) -> AttributeResponse + Send + Sync + 'static,
    {
        self.on_route_check = Some(Arc::new(check));
        self
    }

    pub fn request_method(&self) -> &str {
        &self.request_method
    }

    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    pub fn is_regex(&self) -> bool {
        self.is_regex
    }

    pub(crate) fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    pub(crate) fn on_render(&self) -> &HandlerFn {
        &self.on_render
    }

    pub(crate) fn route_check(&self) -> Option<&Arc<dyn AdmissionCheck>> {
        self.on_route_check.as_ref()
    }
}

impl std::fmt::Debug for DynamicRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicRoute")
            .field("request_method", &self.request_method)
            .field("request_path", &self.request_path)
            .field("is_regex", &self.is_regex)
            .field("has_route_check", &self.on_route_check.is_some())
            .finish()
    }
}
