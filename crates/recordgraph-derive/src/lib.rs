// Proc macros operate on named structs where field.ident is always Some
#![allow(clippy::unwrap_used)]

//! # recordgraph-derive
//!
//! Derive macros for recordgraph row mapping.
//!
//! This crate generates the type descriptors and mapping functions that
//! recordgraph's binder consumes. Use it through the `recordgraph`
//! re-exports rather than directly.
//!
//! ## Available Macros
//!
//! - `#[derive(FromRow)]` - Describe a struct and materialize it from rows
//! - `#[derive(ToFields)]` - Flatten a struct into named values
//!
//! ## Example
//!
//! ```rust,ignore
//! use recordgraph::{FromRow, ToFields};
//!
//! #[derive(Default, FromRow)]
//! struct User {
//!     id: i32,
//!     #[record(rename = "user_name")]
//!     name: String,
//!     email: Option<String>,
//! }
//!
//! #[derive(ToFields)]
//! struct Audit {
//!     modified_by: String,
//!     version: i32,
//! }
//! ```

#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{Attribute, Data, DeriveInput, Field, Fields, LitStr, parse_macro_input};

/// Field configuration extracted from attributes.
#[derive(Default)]
struct FieldConfig {
    /// Column the field binds to, if not its own name.
    rename: Option<String>,
    /// Never bind this field.
    skip: bool,
    /// Serializer that decodes the column.
    serializer: Option<String>,
    /// Pass the field to the struct's constructor.
    ctor: bool,
}

/// Struct-level configuration extracted from attributes.
#[derive(Default)]
struct StructConfig {
    /// Rename all fields using a casing convention.
    rename_all: Option<String>,
    /// Associated function taking the `ctor` fields.
    constructor: Option<String>,
    /// Fall back to `Default` when the constructor cannot be satisfied.
    default: bool,
}

/// Parse record attributes from a list of attributes.
fn parse_field_config(attrs: &[Attribute]) -> syn::Result<FieldConfig> {
    let mut config = FieldConfig::default();

    for attr in attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                config.rename = Some(lit.value());
            } else if meta.path.is_ident("skip") {
                config.skip = true;
            } else if meta.path.is_ident("serializer") {
                let lit: LitStr = meta.value()?.parse()?;
                config.serializer = Some(lit.value());
            } else if meta.path.is_ident("ctor") {
                config.ctor = true;
            } else {
                return Err(meta.error("unsupported record field attribute"));
            }
            Ok(())
        })?;
    }

    if config.skip && config.ctor {
        return Err(syn::Error::new_spanned(
            &attrs[0],
            "a skipped field cannot be a constructor parameter",
        ));
    }

    Ok(config)
}

/// Parse struct-level record attributes.
fn parse_struct_config(attrs: &[Attribute]) -> syn::Result<StructConfig> {
    let mut config = StructConfig::default();

    for attr in attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let lit: LitStr = meta.value()?.parse()?;
                let value = lit.value();
                if !RENAME_RULES.contains(&value.as_str()) {
                    return Err(syn::Error::new_spanned(
                        lit,
                        format!("unknown rename_all rule, expected one of {RENAME_RULES:?}"),
                    ));
                }
                config.rename_all = Some(value);
            } else if meta.path.is_ident("constructor") {
                let lit: LitStr = meta.value()?.parse()?;
                config.constructor = Some(lit.value());
            } else if meta.path.is_ident("default") {
                config.default = true;
            } else {
                return Err(meta.error("unsupported record struct attribute"));
            }
            Ok(())
        })?;
    }

    Ok(config)
}

const RENAME_RULES: &[&str] = &[
    "snake_case",
    "camelCase",
    "PascalCase",
    "SCREAMING_SNAKE_CASE",
];

/// Convert a field name to a column name based on rename_all setting.
fn apply_rename_all(name: &str, rename_all: Option<&str>) -> String {
    match rename_all {
        Some("snake_case") => to_snake_case(name),
        Some("camelCase") => to_camel_case(name),
        Some("PascalCase") => to_pascal_case(name),
        Some("SCREAMING_SNAKE_CASE") => to_screaming_snake_case(name),
        _ => name.to_string(),
    }
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

fn to_camel_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = false;
    for (i, c) in s.chars().enumerate() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(c.to_uppercase());
            capitalize_next = false;
        } else if i == 0 {
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

fn to_pascal_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = true;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}

fn to_screaming_snake_case(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> syn::Result<&'a Punctuated<Field, Comma>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{derive} can only be derived for structs"),
        )),
    }
}

/// A bound field: its descriptor member index and Rust shape.
struct Member<'a> {
    index: usize,
    field: &'a syn::Ident,
    ty: &'a syn::Type,
    ctor: bool,
}

/// Derive macro for implementing `FromRow`.
///
/// Generates a type descriptor listing every non-skipped field as a member,
/// and a mapping function that reads the bound members. Members without a
/// column keep their default value, so the struct must implement `Default`
/// unless it declares a constructor.
///
/// ## Attributes
///
/// ### Field Attributes
///
/// - `#[record(rename = "column_name")]` - Bind the field to a different column
/// - `#[record(skip)]` - Not a member; keeps its default or constructor value
/// - `#[record(serializer = "name")]` - Decode the column through a registered serializer
/// - `#[record(ctor)]` - Pass the field to the struct's constructor, in declaration order
///
/// ### Struct Attributes
///
/// - `#[record(rename_all = "snake_case")]` - Apply a naming convention to all columns
/// - `#[record(constructor = "new")]` - Construct through `Self::new(..)` (the
///   default name when any field is marked `ctor`)
/// - `#[record(default)]` - Fall back to `Default` when the constructor's
///   columns are missing
///
/// ## Example
///
/// ```rust,ignore
/// #[derive(FromRow)]
/// #[record(rename_all = "PascalCase", constructor = "new")]
/// struct Point {
///     #[record(ctor)]
///     x: i32,
///     #[record(ctor)]
///     y: i32,
///     label: Option<String>,
/// }
///
/// impl Point {
///     fn new(x: i32, y: i32) -> Self {
///         Self { x, y, label: None }
///     }
/// }
/// ```
#[proc_macro_derive(FromRow, attributes(record))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match impl_from_row(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn impl_from_row(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let struct_config = parse_struct_config(&input.attrs)?;
    let fields = named_fields(input, "FromRow")?;

    let mut members = Vec::new();
    let mut descriptor_calls = Vec::new();

    for field in fields {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let config = parse_field_config(&field.attrs)?;

        if config.skip {
            continue;
        }

        let member_name = field_name.unraw().to_string();
        let column_name = config.rename.unwrap_or_else(|| {
            apply_rename_all(&member_name, struct_config.rename_all.as_deref())
        });
        let field_type = &field.ty;

        let mut call = if column_name == member_name {
            quote! { .member(#member_name) }
        } else {
            quote! { .member_from(#member_name, #column_name) }
        };
        call.extend(quote! { .typed::<#field_type>() });
        if let Some(serializer) = &config.serializer {
            call.extend(quote! { .serializer(#serializer) });
        }
        descriptor_calls.push(call);

        members.push(Member {
            index: members.len(),
            field: field_name,
            ty: field_type,
            ctor: config.ctor,
        });
    }

    let has_ctor_fields = members.iter().any(|m| m.ctor);
    let constructor = match (&struct_config.constructor, has_ctor_fields) {
        (Some(function), _) => Some(function.clone()),
        (None, true) => Some("new".to_string()),
        (None, false) => None,
    };

    if struct_config.default && constructor.is_none() {
        return Err(syn::Error::new_spanned(
            input,
            "#[record(default)] only applies together with a constructor",
        ));
    }

    // Member assignments for everything the constructor does not take.
    let assignments: Vec<TokenStream2> = members
        .iter()
        .filter(|m| constructor.is_none() || !m.ctor)
        .map(|m| {
            let Member { index, field, ty, .. } = m;
            quote! {
                if let ::std::option::Option::Some(v) = row.value::<#ty>(#index)? {
                    value.#field = v;
                }
            }
        })
        .collect();

    let type_name_expr = quote! { ::std::any::type_name::<Self>() };

    let (constructor_calls, construct) = match &constructor {
        None => (
            quote! {},
            quote! {
                let mut value: Self = ::std::default::Default::default();
            },
        ),
        Some(function) => {
            let function_ident = format_ident!("{}", function);
            let params: Vec<&Member<'_>> = members.iter().filter(|m| m.ctor).collect();
            let param_names: Vec<String> = params
                .iter()
                .map(|m| m.field.unraw().to_string())
                .collect();
            let param_reads = params.iter().map(|m| {
                let Member { index, ty, .. } = m;
                quote! { row.param::<#ty>(#index)? }
            });

            let mut calls = if param_names.is_empty() {
                quote! { .constructor(#function, ::std::iter::empty::<&str>()) }
            } else {
                quote! { .constructor(#function, [#(#param_names),*]) }
            };
            let fallback = if struct_config.default {
                calls.extend(quote! {
                    .constructor("default", ::std::iter::empty::<&str>())
                });
                quote! {
                    ::std::option::Option::Some(1) => ::std::default::Default::default(),
                }
            } else {
                quote! {}
            };

            (
                calls,
                quote! {
                    let mut value: Self = match row.constructor() {
                        ::std::option::Option::Some(0) => Self::#function_ident(#(#param_reads),*),
                        #fallback
                        other => {
                            return ::std::result::Result::Err(recordgraph::Error::Construction {
                                type_name: #type_name_expr,
                                reason: ::std::format!(
                                    "unexpected constructor selection {:?}",
                                    other
                                ),
                            });
                        }
                    };
                },
            )
        }
    };

    Ok(quote! {
        impl #impl_generics recordgraph::FromRow for #name #ty_generics #where_clause {
            fn descriptor() -> recordgraph::TypeDescriptor {
                recordgraph::TypeDescriptor::builder(#type_name_expr)
                    #(#descriptor_calls)*
                    #constructor_calls
                    .build()
            }

            #[allow(unused_mut)]
            fn from_row(
                row: &recordgraph::BoundRow<'_>,
            ) -> ::std::result::Result<Self, recordgraph::Error> {
                #construct
                #(#assignments)*
                ::std::result::Result::Ok(value)
            }
        }
    })
}

/// Derive macro for implementing `ToFields`.
///
/// This macro generates code to flatten a struct into named values.
///
/// ## Attributes
///
/// - `#[record(rename = "name")]` - Use a different field name
/// - `#[record(skip)]` - Don't include this field
/// - `#[record(rename_all = "...")]` on the struct - Apply a naming convention
///
/// ## Example
///
/// ```rust,ignore
/// #[derive(ToFields)]
/// struct Audit {
///     #[record(rename = "ModifiedBy")]
///     user: String,
///     version: i32,
///     #[record(skip)]
///     dirty: bool,
/// }
///
/// let row = row.expand(&audit)?;
/// ```
#[proc_macro_derive(ToFields, attributes(record))]
pub fn derive_to_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match impl_to_fields(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn impl_to_fields(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let struct_config = parse_struct_config(&input.attrs)?;
    let fields = named_fields(input, "ToFields")?;

    let mut field_values = Vec::new();

    for field in fields {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let config = parse_field_config(&field.attrs)?;

        if config.skip {
            continue;
        }

        let value_name = config.rename.unwrap_or_else(|| {
            apply_rename_all(
                &field_name.unraw().to_string(),
                struct_config.rename_all.as_deref(),
            )
        });

        field_values.push(quote! {
            recordgraph::NamedValue::from_value(#value_name, &self.#field_name)?
        });
    }

    let field_count = field_values.len();

    Ok(quote! {
        impl #impl_generics recordgraph::ToFields for #name #ty_generics #where_clause {
            fn to_fields(&self) -> ::std::result::Result<
                ::std::vec::Vec<recordgraph::NamedValue>,
                recordgraph::TypeError
            > {
                ::std::result::Result::Ok(::std::vec![
                    #(#field_values),*
                ])
            }

            fn field_count(&self) -> ::std::option::Option<usize> {
                ::std::option::Option::Some(#field_count)
            }
        }
    })
}
