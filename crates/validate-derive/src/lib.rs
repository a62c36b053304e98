//! Derive macro for `codex_env_shared::Validate`.
//!
//! Supported field rules:
//!
//! - `non_empty`: string must contain a non-whitespace character
//! - `max_len(N)`: string length, in characters, must not exceed `N`
//! - `custom = "path::to::fn"`: call `fn(&field) -> Result<(), Error>`
//! - `field = "wire_name"`: name reported in errors (defaults to the ident)
//!
//! `Option<_>` fields are only checked when `Some`. Rules run in field
//! declaration order, then attribute order, and the first failure wins.

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Fields, GenericArgument, Ident, LitInt, LitStr, Path,
    PathArguments, Type,
};

/// Derive `codex_env_shared::Validate` with field-level checks.
#[proc_macro_derive(Validate, attributes(validate))]
pub fn derive_validate(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand_validate(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

enum Rule {
    NonEmpty,
    MaxLen(LitInt),
    Custom(Path),
}

struct FieldRules<'a> {
    ident: &'a Ident,
    wire_name: LitStr,
    ty: &'a Type,
    optional: bool,
    rules: Vec<Rule>,
}

fn expand_validate(input: &DeriveInput) -> Result<proc_macro2::TokenStream, syn::Error> {
    let error_ty = parse_error_type(&input.attrs)?;
    let Data::Struct(struct_data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "Validate can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &struct_data.fields else {
        return Err(syn::Error::new_spanned(
            &struct_data.fields,
            "Validate requires named fields",
        ));
    };

    let mut checks = Vec::new();
    for field in &fields.named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let (wire_name, rules) = parse_field_rules(&field.attrs, ident)?;
        if rules.is_empty() {
            continue;
        }
        let (optional, ty) = option_inner(&field.ty).map_or((false, &field.ty), |inner| (true, inner));
        let spec = FieldRules {
            ident,
            wire_name,
            ty,
            optional,
            rules,
        };
        checks.push(expand_field(&spec, &error_ty)?);
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics codex_env_shared::Validate for #name #ty_generics #where_clause {
            type Error = #error_ty;

            fn validate(&self) -> Result<(), Self::Error> {
                #(#checks)*
                Ok(())
            }
        }
    })
}

fn parse_error_type(attrs: &[Attribute]) -> Result<Path, syn::Error> {
    let mut error_ty: Option<Path> = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("validate")) {
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident("error") {
                return Err(meta.error("unsupported validate attribute on container"));
            }
            if error_ty.is_some() {
                return Err(meta.error("duplicate validate(error = ...)"));
            }
            let value: LitStr = meta.value()?.parse()?;
            error_ty = Some(value.parse()?);
            Ok(())
        })?;
    }

    error_ty.ok_or_else(|| {
        syn::Error::new(
            proc_macro2::Span::call_site(),
            "missing #[validate(error = \"path\")] on struct",
        )
    })
}

fn parse_field_rules(attrs: &[Attribute], ident: &Ident) -> Result<(LitStr, Vec<Rule>), syn::Error> {
    let mut rules = Vec::new();
    let mut wire_name: Option<LitStr> = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("validate")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("field") {
                if wire_name.is_some() {
                    return Err(meta.error("duplicate validate(field = ...)"));
                }
                wire_name = Some(meta.value()?.parse()?);
                return Ok(());
            }
            if meta.path.is_ident("non_empty") {
                rules.push(Rule::NonEmpty);
                return Ok(());
            }
            if meta.path.is_ident("max_len") {
                let content;
                syn::parenthesized!(content in meta.input);
                let limit: LitInt = content.parse()?;
                limit.base10_parse::<usize>()?;
                rules.push(Rule::MaxLen(limit));
                return Ok(());
            }
            if meta.path.is_ident("custom") {
                let value: LitStr = meta.value()?.parse()?;
                rules.push(Rule::Custom(value.parse()?));
                return Ok(());
            }
            Err(meta.error("unsupported validate attribute on field"))
        })?;
    }
    let wire_name =
        wire_name.unwrap_or_else(|| LitStr::new(&ident.to_string(), proc_macro2::Span::call_site()));
    Ok((wire_name, rules))
}

fn expand_field(spec: &FieldRules<'_>, error_ty: &Path) -> Result<proc_macro2::TokenStream, syn::Error> {
    let mut body = Vec::new();
    for rule in &spec.rules {
        body.push(expand_rule(spec, rule, error_ty)?);
    }

    let ident = spec.ident;
    if spec.optional {
        Ok(quote! {
            if let Some(value) = self.#ident.as_ref() {
                #(#body)*
            }
        })
    } else {
        Ok(quote! {
            {
                let value = &self.#ident;
                #(#body)*
            }
        })
    }
}

fn expand_rule(
    spec: &FieldRules<'_>,
    rule: &Rule,
    error_ty: &Path,
) -> Result<proc_macro2::TokenStream, syn::Error> {
    let wire_name = &spec.wire_name;
    match rule {
        Rule::NonEmpty => {
            require_string_like(spec.ty, "non_empty")?;
            Ok(quote! {
                if value.trim().is_empty() {
                    return Err(<#error_ty as codex_env_shared::ValidationError>::empty(#wire_name));
                }
            })
        },
        Rule::MaxLen(limit) => {
            require_string_like(spec.ty, "max_len")?;
            Ok(quote! {
                let actual = value.chars().count();
                if actual > #limit {
                    return Err(<#error_ty as codex_env_shared::ValidationError>::too_long(
                        #wire_name,
                        #limit,
                        actual,
                    ));
                }
            })
        },
        Rule::Custom(path) => Ok(quote! {
            #path(value)?;
        }),
    }
}

fn require_string_like(ty: &Type, rule: &str) -> Result<(), syn::Error> {
    if is_string_like(ty) {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            ty,
            format!("{rule} can only be used on string-like fields"),
        ))
    }
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    first_type_argument(&segment.arguments)
}

fn first_type_argument(arguments: &PathArguments) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}

fn is_string_like(ty: &Type) -> bool {
    match ty {
        Type::Reference(reference) => is_string_like(&reference.elem),
        Type::Path(type_path) => {
            let Some(segment) = type_path.path.segments.last() else {
                return false;
            };
            if segment.ident == "String" || segment.ident == "str" {
                return true;
            }
            if segment.ident == "Box" {
                return first_type_argument(&segment.arguments).is_some_and(is_string_like);
            }
            false
        },
        _ => false,
    }
}
