//! `#[controller]` implementation
//!
//! Collects the route, admission and chosen-route attributes of every method
//! and emits an `impl Controller` whose descriptor lists them in source order.
//! The helper attributes are stripped from the re-emitted impl block.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{parse2, Error, Expr, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, Result, Token, Type};

const ROUTE: &str = "route";
const ADMISSION: &str = "admission";
const CHOSEN: &str = "chosen";

#[derive(Default)]
struct ControllerArgs {
    base: Option<LitStr>,
    regex: bool,
}

/// `"GET", "/path"` with an optional trailing `regex`
struct RouteArgs {
    method: LitStr,
    path: LitStr,
    regex: bool,
}

impl Parse for RouteArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        let method: LitStr = input.parse()?;
        input.parse::<Token![,]>()?;
        let path: LitStr = input.parse()?;
        let mut regex = false;
        if input.parse::<Option<Token![,]>>()?.is_some() && !input.is_empty() {
            let flag: Ident = input.parse()?;
            if flag != "regex" {
                return Err(Error::new_spanned(flag, "expected `regex`"));
            }
            regex = true;
        }
        if !input.is_empty() {
            return Err(input.error("unexpected tokens after route"));
        }
        Ok(Self { method, path, regex })
    }
}

struct DeclaredMethod {
    ident: Ident,
    has_receiver: bool,
    routes: Vec<RouteArgs>,
    checks: Vec<Expr>,
    hooks: Vec<Expr>,
}

pub fn controller_impl(args: TokenStream, item: TokenStream) -> Result<TokenStream> {
    let args = parse_controller_args(args)?;
    let mut input: ItemImpl = parse2(item)?;

    if let Some((_, path, _)) = &input.trait_ {
        return Err(Error::new_spanned(path, "#[controller] expects an inherent impl block"));
    }

    let mut methods = Vec::new();
    for item in &mut input.items {
        if let ImplItem::Fn(method) = item {
            if let Some(declared) = take_route_method(method)? {
                methods.push(declared);
            }
        }
    }

    let self_ty = &input.self_ty;
    let name = type_name(self_ty);
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    let base = args.base.map(|base| {
        if args.regex {
            quote! { .base(::nox_core::router::RouteBase::regex(#base)) }
        } else {
            quote! { .base(::nox_core::router::RouteBase::new(#base)) }
        }
    });

    let methods = methods.iter().map(|declared| {
        let ident = &declared.ident;
        let method_name = ident.to_string();
        let call = if declared.has_receiver {
            quote! { <#self_ty as ::core::default::Default>::default().#ident(ctx) }
        } else {
            quote! { <#self_ty>::#ident(ctx) }
        };
        let routes = declared.routes.iter().map(|route| {
            let RouteArgs { method, path, regex } = route;
            if *regex {
                quote! { .route(::nox_core::router::Route::regex(#method, #path)) }
            } else {
                quote! { .route(::nox_core::router::Route::new(#method, #path)) }
            }
        });
        let checks = &declared.checks;
        let hooks = &declared.hooks;
        quote! {
            .method(
                ::nox_core::router::RouteMethod::new(
                    #method_name,
                    |ctx: &mut ::nox_core::http::RequestContext| #call,
                )
                #(#routes)*
                #(.check(#checks))*
                #(.hook(#hooks))*
            )
        }
    });

    Ok(quote! {
        #input

        impl #impl_generics ::nox_core::router::Controller for #self_ty #where_clause {
            fn descriptor() -> ::nox_core::router::ControllerDescriptor {
                ::nox_core::router::ControllerDescriptor::new(#name)
                    #base
                    #(#methods)*
            }
        }
    })
}

fn parse_controller_args(args: TokenStream) -> Result<ControllerArgs> {
    let mut parsed = ControllerArgs::default();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("base") {
            parsed.base = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("regex") {
            parsed.regex = true;
            Ok(())
        } else {
            Err(meta.error("unsupported controller property, expected `base` or `regex`"))
        }
    });
    syn::parse::Parser::parse2(parser, args)?;
    if parsed.regex && parsed.base.is_none() {
        return Err(Error::new(Span::call_site(), "`regex` needs a `base` pattern"));
    }
    Ok(parsed)
}

/// Strips the helper attributes off `method`; `None` when it declares no route
fn take_route_method(method: &mut ImplItemFn) -> Result<Option<DeclaredMethod>> {
    let mut routes = Vec::new();
    let mut checks = Vec::new();
    let mut hooks = Vec::new();
    let mut kept = Vec::new();

    for attr in method.attrs.drain(..) {
        if attr.path().is_ident(ROUTE) {
            routes.push(attr.parse_args::<RouteArgs>()?);
        } else if attr.path().is_ident(ADMISSION) {
            checks.push(attr.parse_args::<Expr>()?);
        } else if attr.path().is_ident(CHOSEN) {
            hooks.push(attr.parse_args::<Expr>()?);
        } else {
            kept.push(attr);
        }
    }
    method.attrs = kept;

    if routes.is_empty() {
        if let Some(expr) = checks.first().or(hooks.first()) {
            return Err(Error::new_spanned(expr, "admission checks and hooks need a #[route]"));
        }
        return Ok(None);
    }

    let inputs = &method.sig.inputs;
    let has_receiver = matches!(inputs.first(), Some(FnArg::Receiver(_)));
    let typed = inputs.iter().filter(|arg| matches!(arg, FnArg::Typed(_))).count();
    if typed != 1 {
        return Err(Error::new_spanned(
            &method.sig,
            "route methods take exactly one argument: `ctx: &mut RequestContext`",
        ));
    }

    Ok(Some(DeclaredMethod { ident: method.sig.ident.clone(), has_receiver, routes, checks, hooks }))
}

fn type_name(ty: &Type) -> String {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .unwrap_or_default(),
        other => quote!(#other).to_string(),
    }
}
