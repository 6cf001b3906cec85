//! Nox Framework - Core
//!
//! An attribute-driven request router and a schema-synchronizing ORM.
//!
//! # Overview
//!
//! Controllers declare their routes, admission checks and hooks next to the
//! handler code; the router loads those declarations once and matches every
//! request against them in declaration order. Models declare their columns;
//! Abyss keeps the live MySQL tables converged to those declarations and
//! maps rows to typed instances and back.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use nox_core::prelude::*;
//!
//! #[derive(Default)]
//! struct UsersController;
//!
//! #[controller(base = "/users")]
//! impl UsersController {
//!     #[route("GET", r"/(?P<id>\d+)", regex)]
//!     #[chosen(UseJson)]
//!     fn show(&self, ctx: &mut RequestContext) -> anyhow::Result<JsonSuccess> {
//!         let id: i64 = ctx.parameters().parse("id").unwrap_or_default();
//!         Ok(JsonSuccess::new().with("id", id))
//!     }
//! }
//!
//! let classes = ClassRegistry::new().controller::<UsersController>();
//! let router = Router::new(RouteTableLoader::load_from(&classes)?);
//! let mut ctx = RequestContext::new(HttpMethod::GET, "/users/42");
//! let response = RequestHandler::new(&router).handle(&mut ctx)?;
//! ```
//!
//! # Architecture
//!
//! - [`router`] - Route declarations, loading, dispatch and the request handler
//! - [`http`] - Request context and response types
//! - [`orm`] - Abyss: models, query builder, schema sync and connections
//! - [`app`] - `AppContext`, the application root owning config and pool
//! - [`config`] - TOML + environment configuration
//! - [`logging`] - `env_logger` setup for the `log` facade

// Lets the proc macros name `::nox_core` from inside this crate's own tests
extern crate self as nox_core;

pub mod app;
pub mod config;
pub mod http;
pub mod logging;
pub mod orm;
pub mod router;

#[cfg(test)]
pub mod testing;

// Re-export the macros from nox-macros so users only need one crate
#[cfg(feature = "macros")]
pub use nox_macros::{controller, ModelInstance};

// Prelude module for convenient imports
pub mod prelude;

pub use app::AppContext;
pub use orm::{Abyss, OrmError};
pub use router::{ConfigError, RouteError, Router};

// Main result type for the framework
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Nox
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Unusable class declarations or route patterns, raised at load time
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Orm(#[from] OrmError),

    #[error(transparent)]
    Http(#[from] http::HttpError),

    /// Error returned by a route handler
    #[error("Handler error: {0}")]
    Handler(#[from] anyhow::Error),
}
