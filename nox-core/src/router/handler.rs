//! Outermost request layer
//!
//! [`RequestHandler`] is where dispatch outcomes turn into HTTP: rendered
//! content becomes a body, redirects get a `Location`, handler rewrites are
//! followed as internal `GET`s and unanswered requests are re-routed to the
//! not-found route with a 404. Every internal hop shares the router's
//! recursion budget.

use super::dispatcher::{DispatchOutcome, RenderedContent, Router};
use crate::config::RouterConfig;
use crate::http::constants::{content_types, headers};
use crate::http::{HttpMethod, HttpResponse, RequestContext};

/// Default route answering unmatched requests
pub const DEFAULT_NOT_FOUND_ROUTE: &str = "/404";

/// Drives one request through a [`Router`] and builds the response
#[derive(Debug, Clone)]
pub struct RequestHandler<'r> {
    router: &'r Router,
    not_found_route: String,
}

impl<'r> RequestHandler<'r> {
    pub fn new(router: &'r Router) -> Self {
        Self { router, not_found_route: DEFAULT_NOT_FOUND_ROUTE.to_string() }
    }

    pub fn from_config(router: &'r Router, config: &RouterConfig) -> Self {
        Self::new(router).with_not_found_route(config.not_found_route.clone())
    }

    pub fn with_not_found_route(mut self, route: impl Into<String>) -> Self {
        self.not_found_route = route.into();
        self
    }

    /// Dispatch `ctx` and build the response
    ///
    /// # Errors
    ///
    /// Recursion overflow and handler errors; callers usually answer those
    /// with a 500.
    pub fn handle(&self, ctx: &mut RequestContext) -> crate::Result<HttpResponse> {
        let outcome = self.router.dispatch(ctx)?;
        self.respond(outcome, ctx)
    }

    fn respond(
        &self,
        outcome: DispatchOutcome,
        ctx: &mut RequestContext,
    ) -> crate::Result<HttpResponse> {
        match outcome {
            DispatchOutcome::Rendered(content) => Ok(self.render(content, ctx)),
            DispatchOutcome::Redirect { path, status } => {
                Ok(with_context_headers(HttpResponse::redirect(&path, status), ctx))
            }
            DispatchOutcome::Rewrite { path, status } => {
                ctx.set_response_status(status);
                let next = self.router.redispatch(ctx, &path, Some(HttpMethod::GET.as_str()))?;
                self.respond(next, ctx)
            }
            DispatchOutcome::NotFound => {
                ctx.set_response_status(404);
                if ctx.path() == self.not_found_route {
                    return Ok(self.render(RenderedContent::Empty, ctx));
                }
                log::debug!("Re-routing {} to {}", ctx.path(), self.not_found_route);
                let next = self.router.redispatch(
                    ctx,
                    &self.not_found_route,
                    Some(HttpMethod::GET.as_str()),
                )?;
                self.respond(next, ctx)
            }
        }
    }

    fn render(&self, content: RenderedContent, ctx: &RequestContext) -> HttpResponse {
        let response = HttpResponse::new(ctx.response_status().unwrap_or(200));
        let response = match content {
            RenderedContent::Empty => response.body(Vec::new()),
            RenderedContent::Text(text) => {
                response.content_type(content_types::HTML).body(text.into_bytes())
            }
            RenderedContent::Structured(value) => {
                response.content_type(content_types::TEXT).body(value.to_string().into_bytes())
            }
        };
        with_context_headers(response, ctx)
    }
}

/// Headers set by checks and hooks win over the defaults
fn with_context_headers(mut response: HttpResponse, ctx: &RequestContext) -> HttpResponse {
    for (name, value) in ctx.response_headers() {
        if name.eq_ignore_ascii_case(headers::CONTENT_TYPE) {
            response = response.content_type(value);
        } else {
            response = response.header(name, value);
        }
    }
    response
}
