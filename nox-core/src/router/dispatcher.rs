//! The request dispatcher
//!
//! # Matching order
//!
//! 1. Controllers whose base does not match the path are excluded as a
//!    whole; the others see the path with their base stripped.
//! 2. Controllers, their methods and each method's routes are tried in
//!    declaration order. Every route matching method and path is a candidate.
//! 3. A candidate is invoked once its whole admission chain passes.
//! 4. Dynamic routes are tried only when no declared route was invoked.
//!
//! Re-routing (from an admission check, or a handler returning a
//! [`Rewrite`](super::Rewrite) through [`RequestHandler`](super::RequestHandler))
//! is bounded by the maximum recursion depth.

use std::sync::Arc;

use serde_json::Value;

use super::admission::{run_chain, ChosenRouteHook, Verdict};
use super::controller::HandlerFn;
use super::dynamic::DynamicRoute;
use super::loader::{LoadedController, RouteTable};
use super::result::HandlerResult;
use super::route::Captures;
use super::RouteError;
use crate::config::RouterConfig;
use crate::http::RequestContext;

/// Internal re-dispatches allowed for one request
pub const DEFAULT_MAX_RECURSION_DEPTH: u32 = 10;

/// Body produced by a rendered route
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedContent {
    Empty,
    Text(String),
    /// Structured value, left unserialized because JSON output is off
    Structured(Value),
}

/// Terminal result of one dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Rendered(RenderedContent),
    Redirect { path: String, status: u16 },
    Rewrite { path: String, status: u16 },
    NotFound,
}

/// A controller whose base matched the current path
struct RoutableController<'t> {
    controller: &'t LoadedController,
    baseless_request_path: String,
    base_captures: Captures,
}

/// Matches requests against a [`RouteTable`] and its dynamic routes
#[derive(Debug, Clone)]
pub struct Router {
    table: RouteTable,
    dynamic_routes: Vec<DynamicRoute>,
    max_recursion_depth: u32,
}

impl Router {
    pub fn new(table: RouteTable) -> Self {
        Self { table, dynamic_routes: Vec::new(), max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH }
    }

    pub fn from_config(table: RouteTable, config: &RouterConfig) -> Self {
        Self::new(table).with_max_recursion_depth(config.max_recursion_depth)
    }

    pub fn with_max_recursion_depth(mut self, depth: u32) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn max_recursion_depth(&self) -> u32 {
        self.max_recursion_depth
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Register a route tried after every declared route
    pub fn add_dynamic_route(&mut self, route: DynamicRoute) {
        self.dynamic_routes.push(route);
    }

    pub fn dynamic_routes(&self) -> &[DynamicRoute] {
        &self.dynamic_routes
    }

    /// Route `ctx` and return what should be sent back
    ///
    /// # Errors
    ///
    /// [`RouteError::RecursionDepthExceeded`] when re-routing loops, or the
    /// handler's own error.
    pub fn dispatch(&self, ctx: &mut RequestContext) -> crate::Result<DispatchOutcome> {
        let routables = self.routable_controllers(ctx.path());

        for routable in &routables {
            for loaded in &routable.controller.methods {
                for candidate in &loaded.routes {
                    if !candidate.route.matches_method(ctx.method()) {
                        continue;
                    }
                    let Some(captures) = candidate.matcher.match_full(&routable.baseless_request_path)
                    else {
                        continue;
                    };

                    log::debug!(
                        "{} {} matched {}::{} ({})",
                        ctx.method(),
                        ctx.path(),
                        routable.controller.name,
                        loaded.method.name,
                        candidate.route.pattern()
                    );

                    let saved = ctx.parameters().clone();
                    ctx.parameters_mut().extend(routable.base_captures.iter().cloned());
                    ctx.parameters_mut().extend(captures);

                    match run_chain(&loaded.method.checks, ctx) {
                        Verdict::Proceed => {
                            return self.invoke(&loaded.method.hooks, &loaded.method.handler, ctx);
                        }
                        Verdict::Skip => {
                            log::debug!(
                                "Admission check skipped {}::{}",
                                routable.controller.name,
                                loaded.method.name
                            );
                            ctx.replace_parameters(saved);
                        }
                        Verdict::Abort { code, path } => return self.abort(ctx, code, path),
                    }
                }
            }
        }

        self.dispatch_dynamic(ctx)
    }

    /// Like [`dispatch`](Self::dispatch), but a request nothing answers is an error
    pub fn route(&self, ctx: &mut RequestContext) -> crate::Result<DispatchOutcome> {
        match self.dispatch(ctx)? {
            DispatchOutcome::NotFound => Err(RouteError::NoMatchingRoute {
                method: ctx.method().to_string(),
                path: ctx.path().to_string(),
            }
            .into()),
            outcome => Ok(outcome),
        }
    }

    /// Every plain URI the current request context may reach
    ///
    /// Regex routes (and every route of a controller with a regex base) are
    /// left out since their reachable paths cannot be enumerated.
    pub fn all_non_regex_uris(&self, ctx: &RequestContext) -> Vec<String> {
        let mut uris = Vec::new();

        for controller in &self.table.controllers {
            let base_uri = match &controller.base {
                Some(base) if base.base.is_regex() => continue,
                Some(base) => base.base.pattern(),
                None => "",
            };

            for loaded in &controller.methods {
                let reachable =
                    loaded.method.checks.iter().all(|check| check.evaluate(ctx).is_route_usable);
                if !reachable {
                    continue;
                }
                uris.extend(
                    loaded
                        .routes
                        .iter()
                        .filter(|r| !r.route.is_regex())
                        .map(|r| format!("{}{}", base_uri, r.route.pattern())),
                );
            }
        }

        for dynamic in self.dynamic_routes.iter().filter(|d| !d.is_regex()) {
            let usable = dynamic.route_check().map_or(true, |check| check.evaluate(ctx).is_route_usable);
            if usable {
                uris.push(dynamic.request_path().to_string());
            }
        }

        uris
    }

    /// Re-dispatch `ctx` at `path`, one level deeper
    pub(crate) fn redispatch(
        &self,
        ctx: &mut RequestContext,
        path: &str,
        method: Option<&str>,
    ) -> crate::Result<DispatchOutcome> {
        if ctx.rewrite_depth() >= self.max_recursion_depth {
            log::error!(
                "Recursion depth {} exceeded while re-routing {} to {}",
                self.max_recursion_depth,
                ctx.path(),
                path
            );
            return Err(RouteError::RecursionDepthExceeded {
                path: ctx.path().to_string(),
                depth: ctx.rewrite_depth(),
            }
            .into());
        }
        ctx.reroute(path, method);
        self.dispatch(ctx)
    }

    fn routable_controllers(&self, path: &str) -> Vec<RoutableController<'_>> {
        self.table
            .controllers
            .iter()
            .filter_map(|controller| {
                let (baseless, base_captures) = match &controller.base {
                    Some(base) => {
                        let Some((rest, captures)) = base.matcher.strip_prefix(path) else {
                            log::debug!("{} excluded: base does not match {}", controller.name, path);
                            return None;
                        };
                        (rest, captures)
                    }
                    None => (path, Vec::new()),
                };
                let baseless_request_path =
                    if baseless.is_empty() { "/".to_string() } else { baseless.to_string() };
                Some(RoutableController { controller, baseless_request_path, base_captures })
            })
            .collect()
    }

    fn dispatch_dynamic(&self, ctx: &mut RequestContext) -> crate::Result<DispatchOutcome> {
        for dynamic in &self.dynamic_routes {
            if !dynamic.request_method().eq_ignore_ascii_case(ctx.method()) {
                continue;
            }
            let Some(captures) = dynamic.matcher().match_full(ctx.path()) else {
                continue;
            };

            let saved = ctx.parameters().clone();
            ctx.parameters_mut().extend(captures);

            let verdict = match dynamic.route_check() {
                Some(check) => check.evaluate(ctx).verdict(),
                None => Verdict::Proceed,
            };
            match verdict {
                Verdict::Proceed => {
                    log::debug!("{} {} matched dynamic route", ctx.method(), ctx.path());
                    return self.invoke(&[], dynamic.on_render(), ctx);
                }
                Verdict::Skip => ctx.replace_parameters(saved),
                Verdict::Abort { code, path } => return self.abort(ctx, code, path),
            }
        }

        log::debug!("No route for {} {}", ctx.method(), ctx.path());
        Ok(DispatchOutcome::NotFound)
    }

    fn abort(
        &self,
        ctx: &mut RequestContext,
        code: Option<u16>,
        path: Option<String>,
    ) -> crate::Result<DispatchOutcome> {
        if let Some(code) = code {
            ctx.set_response_status(code);
        }
        match path {
            Some(path) => self.redispatch(ctx, &path, None),
            None => Ok(DispatchOutcome::Rendered(RenderedContent::Empty)),
        }
    }

    fn invoke(
        &self,
        hooks: &[Arc<dyn ChosenRouteHook>],
        handler: &HandlerFn,
        ctx: &mut RequestContext,
    ) -> crate::Result<DispatchOutcome> {
        for hook in hooks {
            hook.on_chosen(ctx);
        }

        let structured = |value: Value, ctx: &RequestContext| {
            if ctx.output_json() {
                DispatchOutcome::Rendered(RenderedContent::Text(value.to_string()))
            } else {
                DispatchOutcome::Rendered(RenderedContent::Structured(value))
            }
        };

        Ok(match handler(ctx)? {
            HandlerResult::Empty => DispatchOutcome::Rendered(RenderedContent::Empty),
            HandlerResult::Text(text) => DispatchOutcome::Rendered(RenderedContent::Text(text)),
            HandlerResult::Structured(value) => structured(value, ctx),
            HandlerResult::Array(value) => structured(value.to_array(), ctx),
            HandlerResult::Redirect(r) => DispatchOutcome::Redirect { path: r.path, status: r.status },
            HandlerResult::Rewrite(r) => DispatchOutcome::Rewrite { path: r.path, status: r.status },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{
        AttributeResponse, ClassRegistry, Controller, ControllerDescriptor, JsonSuccess, Route,
        RouteBase, RouteMethod, RouteTableLoader, UseJson,
    };
    use serde_json::json;

    struct Pages;

    impl Controller for Pages {
        fn descriptor() -> ControllerDescriptor {
            ControllerDescriptor::new("Pages")
                .method(
                    RouteMethod::new("home", |_: &mut RequestContext| "home")
                        .route(Route::new("GET", "/")),
                )
                .method(
                    RouteMethod::new("about_v1", |_: &mut RequestContext| "about v1")
                        .route(Route::new("GET", "/about")),
                )
                .method(
                    RouteMethod::new("about_v2", |_: &mut RequestContext| "about v2")
                        .route(Route::new("GET", "/about")),
                )
                .method(
                    RouteMethod::new("nothing", |_: &mut RequestContext| ())
                        .route(Route::new("GET", "/nothing")),
                )
        }
    }

    struct Api;

    impl Controller for Api {
        fn descriptor() -> ControllerDescriptor {
            ControllerDescriptor::new("Api")
                .base(RouteBase::new("/api"))
                .method(
                    RouteMethod::new("status", |_: &mut RequestContext| JsonSuccess::new())
                        .route(Route::new("GET", "/"))
                        .hook(UseJson),
                )
                .method(
                    RouteMethod::new("raw", |_: &mut RequestContext| json!({"a": 1}))
                        .route(Route::new("GET", "/raw")),
                )
                .method(
                    RouteMethod::new("secret", |_: &mut RequestContext| "secret")
                        .route(Route::new("GET", "/secret"))
                        .check_fn(|_| AttributeResponse::abort(403)),
                )
        }
    }

    fn router() -> Router {
        let registry = ClassRegistry::new().controller::<Pages>().controller::<Api>();
        Router::new(RouteTableLoader::load_from(&registry).unwrap())
    }

    fn get(router: &Router, path: &str) -> (DispatchOutcome, RequestContext) {
        let mut ctx = RequestContext::new("GET", path);
        let outcome = router.dispatch(&mut ctx).unwrap();
        (outcome, ctx)
    }

    #[test]
    fn test_first_declared_method_wins() {
        let (outcome, _) = get(&router(), "/about");
        assert_eq!(outcome, DispatchOutcome::Rendered(RenderedContent::Text("about v1".into())));
    }

    #[test]
    fn test_empty_result_is_not_not_found() {
        let router = router();
        assert_eq!(get(&router, "/nothing").0, DispatchOutcome::Rendered(RenderedContent::Empty));
        assert_eq!(get(&router, "/missing").0, DispatchOutcome::NotFound);
    }

    #[test]
    fn test_method_mismatch() {
        let mut ctx = RequestContext::new("POST", "/about");
        assert_eq!(router().dispatch(&mut ctx).unwrap(), DispatchOutcome::NotFound);
    }

    #[test]
    fn test_base_strips_to_root() {
        let (outcome, ctx) = get(&router(), "/api");
        assert_eq!(
            outcome,
            DispatchOutcome::Rendered(RenderedContent::Text(r#"{"status":1}"#.into()))
        );
        assert!(ctx.output_json());
    }

    #[test]
    fn test_structured_without_json_flag() {
        let (outcome, _) = get(&router(), "/api/raw");
        assert_eq!(outcome, DispatchOutcome::Rendered(RenderedContent::Structured(json!({"a": 1}))));
    }

    #[test]
    fn test_abort_sets_status() {
        let (outcome, ctx) = get(&router(), "/api/secret");
        assert_eq!(outcome, DispatchOutcome::Rendered(RenderedContent::Empty));
        assert_eq!(ctx.response_status(), Some(403));
    }

    #[test]
    fn test_route_errors_on_no_match() {
        let mut ctx = RequestContext::new("GET", "/missing");
        let err = router().route(&mut ctx).unwrap_err();
        assert!(matches!(err, crate::Error::Route(RouteError::NoMatchingRoute { .. })));
    }

    #[test]
    fn test_all_non_regex_uris() {
        let mut router = router();
        router.add_dynamic_route(
            DynamicRoute::new("GET", "/dyn", false, |_: &mut RequestContext| "dyn").unwrap(),
        );
        let uris = router.all_non_regex_uris(&RequestContext::new("GET", "/"));
        assert_eq!(
            uris,
            vec!["/", "/about", "/about", "/nothing", "/api/", "/api/raw", "/dyn"]
        );
    }
}
