//! Declaration-driven request router
//!
//! Controllers declare their routes up front as a [`ControllerDescriptor`]
//! (usually generated by `#[controller]`). The [`RouteTableLoader`] validates
//! the registered classes and compiles every pattern once; the [`Router`]
//! then matches each request against the table, runs the admission chain of
//! every candidate and invokes the first one that passes.
//!
//! # Architecture
//!
//! - [`route`] - `Route` / `RouteBase` declarations and compiled matchers
//! - [`admission`] - Admission checks, their verdicts and chosen-route hooks
//! - [`controller`] - Controller descriptors and route methods
//! - [`loader`] - Class registry, route table loading and model identification
//! - [`dynamic`] - Routes registered at runtime, tried after declared ones
//! - [`result`] - What handlers return (`HandlerResult`, `Redirect`, `Rewrite`, JSON payloads)
//! - [`dispatcher`] - The `Router` and its `DispatchOutcome`
//! - [`handler`] - `RequestHandler`, turning outcomes into HTTP responses
//!
//! # Example
//!
//! ```rust,ignore
//! use nox_core::prelude::*;
//!
//! let classes = ClassRegistry::new().controller::<UsersController>();
//! let router = Router::new(RouteTableLoader::load_from(&classes)?);
//!
//! let mut ctx = RequestContext::new(HttpMethod::GET, "/users/42");
//! let response = RequestHandler::new(&router).handle(&mut ctx)?;
//! ```

pub mod admission;
pub mod controller;
pub mod dispatcher;
pub mod dynamic;
pub mod handler;
pub mod loader;
pub mod result;
pub mod route;

pub use admission::{AdmissionCheck, AttributeResponse, ChosenRouteHook, UseJson};
pub use controller::{Controller, ControllerDescriptor, HandlerFn, RouteMethod};
pub use dispatcher::{DispatchOutcome, RenderedContent, Router, DEFAULT_MAX_RECURSION_DEPTH};
pub use dynamic::DynamicRoute;
pub use handler::{RequestHandler, DEFAULT_NOT_FOUND_ROUTE};
pub use loader::{
    ClassDescriptor, ClassMarker, ClassRegistry, ClassScanner, ModelClassIdentifier, RouteTable,
    RouteTableLoader, BASE_CONTROLLER, MODEL_INTERFACE,
};
pub use result::{
    ArrayLike, HandlerResult, IntoHandlerResult, JsonError, JsonSuccess, Redirect, Rewrite,
};
pub use route::{Route, RouteBase};

/// Load-time errors: the registered classes or their patterns are unusable
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Controller {0} does not extend BaseController")]
    ControllerMissingExtension(String),

    #[error("Model class {0} does not implement MySQLModelInterface")]
    ModelMissingImplementation(String),

    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidRoutePattern { pattern: String, reason: String },
}

/// Dispatch-time errors
#[derive(thiserror::Error, Debug)]
pub enum RouteError {
    #[error("No route matches {method} {path}")]
    NoMatchingRoute { method: String, path: String },

    #[error("Too many recursive requests. Last request processed was {path}")]
    RecursionDepthExceeded { path: String, depth: u32 },
}
