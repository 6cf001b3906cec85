//! Controller declarations
//!
//! A controller is described by a [`ControllerDescriptor`]: an optional
//! [`RouteBase`] and an ordered list of [`RouteMethod`]s, each carrying its
//! routes, admission checks, chosen-route hooks and handler. Declaration
//! order is dispatch order.

use std::sync::Arc;

use super::admission::{AdmissionCheck, AttributeResponse, ChosenRouteHook};
use super::result::{HandlerResult, IntoHandlerResult};
use super::route::{Route, RouteBase};
use crate::http::RequestContext;

/// Type-erased route handler
pub type HandlerFn =
    Arc<dyn Fn(&mut RequestContext) -> anyhow::Result<HandlerResult> + Send + Sync>;

/// Types exposing routes to the router
///
/// Implemented by `#[controller]`; registering the type through
/// [`ClassRegistry::controller`](super::ClassRegistry::controller) marks it
/// as extending `BaseController`.
pub trait Controller {
    fn descriptor() -> ControllerDescriptor;
}

/// One public controller method and everything declared on it
#[derive(Clone)]
pub struct RouteMethod {
    pub name: String,
    pub routes: Vec<Route>,
    pub checks: Vec<Arc<dyn AdmissionCheck>>,
    pub hooks: Vec<Arc<dyn ChosenRouteHook>>,
    pub handler: HandlerFn,
}

impl RouteMethod {
    pub fn new<F, R>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut RequestContext) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        Self {
            name: name.into(),
            routes: Vec::new(),
            checks: Vec::new(),
            hooks: Vec::new(),
            handler: Arc::new(move |ctx: &mut RequestContext| handler(ctx).into_handler_result()),
        }
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn check(mut self, check: impl AdmissionCheck + 'static) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    /// Closure-based admission check
    pub fn check_fn<F>(self, check: F) -> Self
    where
        F: Fn(&RequestContext) -> AttributeResponse + Send + Sync + 'static,
    {
        self.check(check)
    }

    pub fn hook(mut self, hook: impl ChosenRouteHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for RouteMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMethod")
            .field("name", &self.name)
            .field("routes", &self.routes)
            .field("checks", &self.checks.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Everything the router needs to know about one controller
#[derive(Debug, Clone)]
pub struct ControllerDescriptor {
    pub name: String,
    /// Only the first base is effective
    pub bases: Vec<RouteBase>,
    pub methods: Vec<RouteMethod>,
}

impl ControllerDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), bases: Vec::new(), methods: Vec::new() }
    }

    pub fn base(mut self, base: RouteBase) -> Self {
        self.bases.push(base);
        self
    }

    pub fn method(mut self, method: RouteMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// The base the router applies
    pub fn effective_base(&self) -> Option<&RouteBase> {
        self.bases.first()
    }
}
