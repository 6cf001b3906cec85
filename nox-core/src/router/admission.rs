//! Route admission
//!
//! Every candidate route runs its [`AdmissionCheck`]s in declaration order.
//! Each check answers with an [`AttributeResponse`]:
//!
//! - usable: move on to the next check
//! - not usable, no code and no path: abandon this candidate, keep looking
//! - not usable with a code and/or a path: stop dispatching, apply the code
//!   and re-route to the path when one is given
//!
//! [`ChosenRouteHook`]s only run once a candidate has passed its whole chain.

use std::sync::Arc;

use crate::http::constants::content_types;
use crate::http::RequestContext;

/// Verdict of one admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeResponse {
    pub is_route_usable: bool,
    pub response_code: Option<u16>,
    pub new_request_path: Option<String>,
}

impl AttributeResponse {
    /// The check passes
    pub fn usable() -> Self {
        Self { is_route_usable: true, response_code: None, new_request_path: None }
    }

    /// The check fails quietly; the router tries the next candidate
    pub fn skip() -> Self {
        Self { is_route_usable: false, response_code: None, new_request_path: None }
    }

    /// The check fails and ends dispatch with `code`
    pub fn abort(code: u16) -> Self {
        Self { is_route_usable: false, response_code: Some(code), new_request_path: None }
    }

    /// The check fails and re-routes the request to `path`
    pub fn reroute(path: impl Into<String>) -> Self {
        Self { is_route_usable: false, response_code: None, new_request_path: Some(path.into()) }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.response_code = Some(code);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.new_request_path = Some(path.into());
        self
    }

    pub(crate) fn verdict(self) -> Verdict {
        if self.is_route_usable {
            Verdict::Proceed
        } else if self.response_code.is_none() && self.new_request_path.is_none() {
            Verdict::Skip
        } else {
            Verdict::Abort { code: self.response_code, path: self.new_request_path }
        }
    }
}

/// What the router does with a candidate after its admission chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Verdict {
    Proceed,
    Skip,
    Abort { code: Option<u16>, path: Option<String> },
}

/// Policy deciding whether a matched route may serve the request
pub trait AdmissionCheck: Send + Sync {
    fn evaluate(&self, ctx: &RequestContext) -> AttributeResponse;
}

impl<F> AdmissionCheck for F
where
    F: Fn(&RequestContext) -> AttributeResponse + Send + Sync,
{
    fn evaluate(&self, ctx: &RequestContext) -> AttributeResponse {
        self(ctx)
    }
}

/// Runs `checks` in order; the first non-usable answer decides
pub(crate) fn run_chain(checks: &[Arc<dyn AdmissionCheck>], ctx: &RequestContext) -> Verdict {
    for check in checks {
        match check.evaluate(ctx).verdict() {
            Verdict::Proceed => continue,
            other => return other,
        }
    }
    Verdict::Proceed
}

/// Side effect applied only to the route that was finally chosen
pub trait ChosenRouteHook: Send + Sync {
    fn on_chosen(&self, ctx: &mut RequestContext);
}

impl<F> ChosenRouteHook for F
where
    F: Fn(&mut RequestContext) + Send + Sync,
{
    fn on_chosen(&self, ctx: &mut RequestContext) {
        self(ctx)
    }
}

/// Serialize structured results as JSON and answer with the JSON content type
#[derive(Debug, Clone, Copy, Default)]
pub struct UseJson;

impl ChosenRouteHook for UseJson {
    fn on_chosen(&self, ctx: &mut RequestContext) {
        ctx.set_output_json(true);
        ctx.set_response_header("Content-Type", content_types::JSON);
    }
}
