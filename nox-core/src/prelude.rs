//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use nox_core::prelude::*;
//! ```

// === Macros (from nox-macros) ===
// The derive shares its name with the `ModelInstance` trait re-exported below
#[cfg(feature = "macros")]
pub use crate::{controller, ModelInstance};

// === Application root and configuration ===
pub use crate::app::AppContext;
pub use crate::config::NoxConfig;

// === HTTP types ===
pub use crate::http::{HttpMethod, HttpResponse, RequestContext, RequestParameters};

// === Routing ===
pub use crate::router::{
    AdmissionCheck, AttributeResponse, ChosenRouteHook, ClassRegistry, Controller,
    ControllerDescriptor, DispatchOutcome, DynamicRoute, HandlerResult, JsonError, JsonSuccess,
    Redirect, RequestHandler, Rewrite, Route, RouteBase, RouteMethod, RouteTableLoader, Router,
    UseJson,
};

// === ORM ===
#[cfg(feature = "mysql")]
pub use crate::orm::mysql::MySqlConnector;
pub use crate::orm::{
    Abyss, ColumnDefinition, ColumnQuery, ConnectionPool, DataType, DatabaseCredentials, Model,
    ModelInstance, Pager, ResultOrder, SortDirection, SqlValue, TrustedSql,
};

// === Errors ===
pub use crate::{Error, Result};
