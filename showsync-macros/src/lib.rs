//! Procedural macros for showsync

use std::collections::HashSet;

use darling::{FromDeriveInput, FromVariant};
use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::{format_ident, quote};
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(KeyedVariant)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(keyed), supports(enum_any))]
struct KeyedOpts {
    ident: syn::Ident,
    vis: syn::Visibility,
    generics: syn::Generics,
    data: darling::ast::Data<KeyedVariantOpts, ()>,

    /// Host channel carrying this union; generates `HostEvent`
    #[darling(default)]
    channel: Option<String>,

    /// Name of the generated handler trait (default `{Name}Handler`)
    #[darling(default)]
    handler: Option<syn::Ident>,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(keyed))]
struct KeyedVariantOpts {
    ident: syn::Ident,
    fields: darling::ast::Fields<syn::Field>,

    /// Wire tag override, for variants renamed with serde
    #[darling(default)]
    tag: Option<String>,
}

/// Convert PascalCase to snake_case
fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

/// Derive macro for keyed variant dispatch
///
/// For an enum `Name` this generates:
/// - `NameHandler` trait with one required method `on_{variant}` per variant
/// - `impl KeyedVariant for Name` (`tag()` and `TAGS`)
/// - `impl<H: NameHandler + ?Sized> Route<H> for Name`
/// - `impl HostEvent for Name` when `#[keyed(channel = "...")]` is given
///
/// Every handler method is required, so a handler that does not handle a
/// variant fails to compile. Each method receives the variant's data:
/// `()` for a unit variant, the field itself for a single field, and a tuple
/// of the fields otherwise.
///
/// # Example
/// ```ignore
/// #[derive(Deserialize, KeyedVariant)]
/// #[keyed(channel = "showEvent")]
/// enum ShowEvent {
///     Loaded(Show),
///     CueAdded(usize, Cue),
/// }
///
/// impl ShowEventHandler for Fold {
///     fn on_loaded(&mut self, show: Show) { /* ... */ }
///     fn on_cue_added(&mut self, (index, cue): (usize, Cue)) { /* ... */ }
/// }
///
/// assert_eq!(ShowEvent::TAGS, &["Loaded", "CueAdded"]);
/// ```
#[proc_macro_derive(KeyedVariant, attributes(keyed))]
pub fn derive_keyed_variant(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match KeyedOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let vis = &opts.vis;

    if !opts.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &opts.generics,
            "KeyedVariant cannot be derived for generic enums",
        )
        .to_compile_error()
        .into();
    }

    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        _ => {
            return syn::Error::new_spanned(&input, "KeyedVariant can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    if variants.is_empty() {
        return syn::Error::new_spanned(&input, "KeyedVariant needs at least one variant")
            .to_compile_error()
            .into();
    }

    let mut seen_tags = HashSet::new();
    for v in variants {
        let tag = v.tag.clone().unwrap_or_else(|| v.ident.to_string());
        if !seen_tags.insert(tag.clone()) {
            return syn::Error::new_spanned(&v.ident, format!("duplicate tag `{tag}`"))
                .to_compile_error()
                .into();
        }
    }

    let handler_trait = opts
        .handler
        .clone()
        .unwrap_or_else(|| format_ident!("{}Handler", name));

    let tags: Vec<String> = variants
        .iter()
        .map(|v| v.tag.clone().unwrap_or_else(|| v.ident.to_string()))
        .collect();

    let tag_arms = variants.iter().zip(&tags).map(|(v, tag)| {
        let variant = &v.ident;
        quote! { #name::#variant { .. } => #tag }
    });

    let mut handler_methods = Vec::new();
    let mut route_arms = Vec::new();

    for (v, tag) in variants.iter().zip(&tags) {
        let variant = &v.ident;
        let method = format_ident!("on_{}", to_snake_case(&variant.to_string()));

        let types: Vec<&syn::Type> = v.fields.fields.iter().map(|f| &f.ty).collect();
        let bindings: Vec<Ident> = v
            .fields
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| {
                f.ident
                    .clone()
                    .unwrap_or_else(|| format_ident!("__field{}", i))
            })
            .collect();

        let pattern = match v.fields.style {
            darling::ast::Style::Unit => quote! { #name::#variant },
            darling::ast::Style::Tuple => quote! { #name::#variant(#(#bindings),*) },
            darling::ast::Style::Struct => quote! { #name::#variant { #(#bindings),* } },
        };

        let (payload_ty, payload) = match (types.as_slice(), bindings.as_slice()) {
            ([], _) => (quote! { () }, quote! { () }),
            ([ty], [binding]) => (quote! { #ty }, quote! { #binding }),
            _ => (quote! { (#(#types),*) }, quote! { (#(#bindings),*) }),
        };

        let doc = format!("Handle the `{}` variant of [`{}`].", tag, name);
        handler_methods.push(quote! {
            #[doc = #doc]
            fn #method(&mut self, payload: #payload_ty);
        });
        route_arms.push(quote! {
            #pattern => __handler.#method(#payload)
        });
    }

    let handler_doc = format!(
        "Handles every variant of [`{}`].\n\n\
         Each method is required: adding a variant to [`{}`] breaks every \
         handler until it handles the new variant.",
        name, name
    );

    let mut expanded = quote! {
        #[doc = #handler_doc]
        #vis trait #handler_trait {
            #(#handler_methods)*
        }

        impl ::showsync::KeyedVariant for #name {
            const TAGS: &'static [&'static str] = &[#(#tags),*];

            fn tag(&self) -> &'static str {
                match self {
                    #(#tag_arms,)*
                }
            }
        }

        impl<__H: #handler_trait + ?Sized> ::showsync::Route<__H> for #name {
            fn route(self, __handler: &mut __H) {
                match self {
                    #(#route_arms,)*
                }
            }
        }
    };

    if let Some(channel) = &opts.channel {
        expanded = quote! {
            #expanded

            impl ::showsync::HostEvent for #name {
                const CHANNEL: &'static str = #channel;
            }
        };
    }

    TokenStream::from(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("Loaded"), "loaded");
        assert_eq!(to_snake_case("CueAdded"), "cue_added");
        assert_eq!(to_snake_case("Update"), "update");
    }
}
