//! `#[derive(ModelInstance)]` implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{parse2, Attribute, Data, DeriveInput, Error, Fields, Ident, LitStr, Result, Type};

struct PropertyField {
    ident: Ident,
    ty: Type,
    property: String,
}

pub fn derive_model_instance(input: TokenStream) -> Result<TokenStream> {
    let input: DeriveInput = parse2(input)?;
    let name = &input.ident;
    let model = model_type(&input)?;

    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(name, "ModelInstance can only be derived for structs"));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(Error::new_spanned(name, "ModelInstance needs named fields"));
    };

    let mut properties = Vec::new();
    for field in &fields.named {
        let Some(ident) = field.ident.clone() else { continue };
        let options = FieldOptions::parse(&field.attrs)?;
        if options.skip {
            continue;
        }
        let property = options.property.unwrap_or_else(|| ident.to_string());
        properties.push(PropertyField { ident, ty: field.ty.clone(), property });
    }

    let names = properties.iter().map(|p| &p.property);
    let getters = properties.iter().map(|PropertyField { ident, property, .. }| {
        quote! {
            #property => ::core::option::Option::Some(
                ::core::convert::Into::into(::core::clone::Clone::clone(&self.#ident)),
            ),
        }
    });
    let setters = properties.iter().map(|PropertyField { ident, ty, property }| {
        quote! {
            #property => {
                self.#ident = <#ty as ::nox_core::orm::FromSqlValue>::from_sql_value(&value)
                    .ok_or_else(|| ::nox_core::orm::OrmError::PropertyType {
                        property: name.to_string(),
                        value: value.to_string(),
                    })?;
            }
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::nox_core::orm::ModelInstance for #name #ty_generics #where_clause {
            type Model = #model;

            fn property_names() -> &'static [&'static str] {
                &[#(#names),*]
            }

            fn get_property(&self, name: &str) -> ::core::option::Option<::nox_core::orm::SqlValue> {
                match name {
                    #(#getters)*
                    _ => ::core::option::Option::None,
                }
            }

            fn set_property(
                &mut self,
                name: &str,
                value: ::nox_core::orm::SqlValue,
            ) -> ::nox_core::orm::OrmResult<()> {
                match name {
                    #(#setters)*
                    _ => {
                        return ::core::result::Result::Err(
                            ::nox_core::orm::OrmError::UnknownProperty(name.to_string()),
                        )
                    }
                }
                ::core::result::Result::Ok(())
            }
        }
    })
}

/// The `#[nox(model = Type)]` container attribute
fn model_type(input: &DeriveInput) -> Result<Type> {
    let mut model = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("nox")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("model") {
                model = Some(meta.value()?.parse::<Type>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported nox property, expected `model`"))
            }
        })?;
    }
    model.ok_or_else(|| Error::new_spanned(&input.ident, "missing #[nox(model = ...)]"))
}

#[derive(Default)]
struct FieldOptions {
    skip: bool,
    property: Option<String>,
}

impl FieldOptions {
    fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut options = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("nox")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    options.skip = true;
                    Ok(())
                } else if meta.path.is_ident("property") {
                    options.property = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported nox property, expected `skip` or `property`"))
                }
            })?;
        }
        Ok(options)
    }
}
