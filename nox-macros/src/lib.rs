//! Procedural macros for the Nox framework
//!
//! Both macros generate the explicit registration code `nox_core` consumes:
//! `#[controller]` builds a `ControllerDescriptor` from annotated methods and
//! `#[derive(ModelInstance)]` binds struct fields to model properties.

use proc_macro::TokenStream;

mod controller;
mod model_instance;

/// Attribute macro turning an impl block into a routable controller
///
/// Every method carrying at least one `#[route(...)]` becomes a route method,
/// in source order. Handlers take `&mut RequestContext` and may return
/// anything implementing `IntoHandlerResult`. Methods with a receiver run on
/// a fresh `Self::default()` per request.
///
/// - `#[route("METHOD", "/path")]` or `#[route("METHOD", r"regex", regex)]`
/// - `#[admission(expr)]`: an `AdmissionCheck`, evaluated in declaration order
/// - `#[chosen(expr)]`: a `ChosenRouteHook`, run once the route is selected
///
/// # Example
///
/// ```rust,ignore
/// use nox_core::prelude::*;
///
/// #[derive(Default)]
/// struct AccountController;
///
/// #[controller(base = "/account")]
/// impl AccountController {
///     #[route("GET", "/")]
///     #[admission(require_login)]
///     fn overview(&self, ctx: &mut RequestContext) -> String {
///         format!("Hello {}", ctx.param("user").unwrap_or("guest"))
///     }
///
///     #[route("GET", r"/orders/(?P<id>\d+)", regex)]
///     #[chosen(UseJson)]
///     fn order(&self, ctx: &mut RequestContext) -> JsonSuccess {
///         JsonSuccess::new().with("id", ctx.parameters().parse::<i64>("id").unwrap_or_default())
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn controller(args: TokenStream, item: TokenStream) -> TokenStream {
    controller::controller_impl(args.into(), item.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive macro binding a struct to an Abyss model
///
/// Each named field becomes a property (named after the field unless
/// `#[nox(property = "...")]` renames it). Field types convert through
/// `Into<SqlValue>` and `FromSqlValue`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Default, ModelInstance)]
/// #[nox(model = UsersModel)]
/// struct User {
///     id: Option<i64>,
///     name: String,
///     #[nox(property = "creationTimestamp")]
///     creation_timestamp: Option<i64>,
///     #[nox(skip)]
///     cached_avatar: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(ModelInstance, attributes(nox))]
pub fn derive_model_instance(input: TokenStream) -> TokenStream {
    model_instance::derive_model_instance(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
