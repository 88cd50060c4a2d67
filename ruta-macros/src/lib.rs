use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

/// Derives `ruta::RouteEnum` and `ruta::FromValue` for a fieldless enum.
///
/// # Usage
///
/// ```ignore
/// #[derive(RouteEnum)]
/// #[ruta(alias = "env")]
/// enum Environment {
///     Dev,
///     Staging,
///     #[ruta(name = "prod")]
///     Production,
/// }
/// ```
///
/// Route patterns can then constrain a value with `{target:Environment}` or
/// `{target:env}`, once the enum is registered with
/// `Router::enum_type::<Environment>()`. Members match case-insensitively by
/// variant name, or by the `name` given in `#[ruta(name = "...")]`.
#[proc_macro_derive(RouteEnum, attributes(ruta))]
pub fn derive_route_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_route_enum(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_route_enum(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let enum_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let data = match &input.data {
        Data::Enum(data) => data,
        _ => {
            return Err(syn::Error::new_spanned(
                enum_name,
                "RouteEnum can only be derived for enums",
            ))
        }
    };

    let alias = match extract_ruta_attr(&input.attrs, "alias")? {
        Some(alias) => quote! { Some(#alias) },
        None => quote! { None },
    };

    let mut idents = Vec::new();
    let mut names = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "RouteEnum only supports unit variants",
            ));
        }
        let name = extract_ruta_attr(&variant.attrs, "name")?
            .unwrap_or_else(|| LitStr::new(&variant.ident.to_string(), variant.ident.span()));
        idents.push(&variant.ident);
        names.push(name);
    }

    let type_name = enum_name.to_string();

    Ok(quote! {
        impl #impl_generics ::ruta::RouteEnum for #enum_name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;
            const ALIAS: Option<&'static str> = #alias;

            fn variants() -> &'static [&'static str] {
                &[#(#names),*]
            }

            fn from_variant(name: &str) -> Option<Self> {
                match name {
                    #(#names => Some(#enum_name::#idents),)*
                    _ => None,
                }
            }

            fn variant(&self) -> &'static str {
                match self {
                    #(#enum_name::#idents => #names,)*
                }
            }
        }

        impl #impl_generics ::ruta::FromValue for #enum_name #ty_generics #where_clause {
            fn from_value(value: &::ruta::Value) -> Option<Self> {
                match value {
                    ::ruta::Value::Enum(member)
                        if member.type_name == <Self as ::ruta::RouteEnum>::TYPE_NAME =>
                    {
                        <Self as ::ruta::RouteEnum>::from_variant(member.member)
                    }
                    _ => None,
                }
            }
        }
    })
}

/// Extract a string from `#[ruta(key = "...")]`.
fn extract_ruta_attr(attrs: &[syn::Attribute], key: &str) -> syn::Result<Option<LitStr>> {
    let mut found = None;
    for attr in attrs {
        if !attr.path().is_ident("ruta") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(key) {
                found = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else if meta.path.is_ident("alias") || meta.path.is_ident("name") {
                // Belongs to the other lookup; consume the value.
                meta.value()?.parse::<LitStr>()?;
                Ok(())
            } else {
                Err(meta.error("unsupported ruta attribute, expected `alias` or `name`"))
            }
        })?;
    }
    Ok(found)
}
