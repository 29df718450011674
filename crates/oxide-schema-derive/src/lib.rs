//! Derive macro for `oxide-schema` models.
//!
//! `#[derive(Model)]` turns a struct with named fields into a static schema
//! descriptor implementing `oxide_schema::Model`. No runtime reflection is
//! involved: field names, Rust type spellings, optionality and defaults are
//! captured at compile time.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{
    parenthesized, parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument,
    LitStr, Meta, PathArguments, Token, Type,
};

/// Derives `oxide_schema::Model` for a struct.
///
/// # Container Attributes
///
/// - `#[model(table = "name")]` - SQL table name (defaults to the snake_case
///   struct name, so `UserAccount` maps to `user_account`)
/// - `#[model(primary_key("a", "b"))]` - ordered primary key
///
/// # Field Attributes
///
/// - `#[column(name = "name")]` - SQL column name (defaults to the field name)
/// - `#[column(primary_key)]` - adds the column to the primary key, in field
///   order; cannot be combined with `#[model(primary_key(...))]`
/// - `#[column(auto)]` - database-generated value (`SERIAL` for `i32`,
///   a UUID generator for `Uuid`)
/// - `#[column(default = "literal")]` - literal default, decoded with the
///   field's type when the model is registered
///
/// An `Option<T>` field is nullable. Without any primary key attribute the
/// model uses the implicit `id` key.
///
/// ```ignore
/// #[derive(Model)]
/// #[model(table = "order")]
/// pub struct Order {
///     #[column(auto)]
///     pub id: Uuid,
///     pub total: Decimal,
///     pub note: Option<String>,
/// }
/// ```
#[proc_macro_derive(Model, attributes(model, column))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_model_impl(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_model_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let model_attrs = parse_model_attrs(&input.attrs)?;
    let table_name = model_attrs
        .table
        .unwrap_or_else(|| to_snake_case(&struct_name.to_string()));

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Model derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Model derive only supports structs",
            ));
        }
    };

    let mut field_entries = Vec::new();
    let mut field_keys = Vec::new();
    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_column_attrs(&field.attrs)?;
        let column_name = attrs.name.unwrap_or_else(|| field_name.to_string());

        let (inner, nullable) = match option_inner(&field.ty) {
            Some(inner) => (inner, true),
            None => (&field.ty, false),
        };
        let rust_type = quote!(#inner).to_string().replace(' ', "");

        let default = match (attrs.auto, attrs.default) {
            (true, Some(lit)) => {
                return Err(syn::Error::new_spanned(
                    lit,
                    "`auto` and `default` cannot be combined",
                ));
            }
            (true, None) => quote! { ::oxide_schema::FieldDefault::Auto },
            (false, Some(lit)) => quote! { ::oxide_schema::FieldDefault::Literal(#lit) },
            (false, None) => quote! { ::oxide_schema::FieldDefault::None },
        };

        if attrs.primary_key {
            field_keys.push(column_name.clone());
        }

        field_entries.push(quote! {
            ::oxide_schema::FieldSchema {
                name: #column_name,
                rust_type: #rust_type,
                nullable: #nullable,
                default: #default,
            }
        });
    }

    let primary_key: Vec<String> = match model_attrs.primary_key {
        Some(keys) if !field_keys.is_empty() => {
            return Err(syn::Error::new_spanned(
                &keys[0],
                "primary key declared on both the model and its columns",
            ));
        }
        Some(keys) => keys.iter().map(LitStr::value).collect(),
        None => field_keys,
    };

    let model_name = struct_name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::oxide_schema::Model for #struct_name #ty_generics #where_clause {
            const MODEL_NAME: &'static str = #model_name;
            const TABLE_NAME: &'static str = #table_name;
            const FIELDS: &'static [::oxide_schema::FieldSchema] = &[
                #(#field_entries),*
            ];
            const PRIMARY_KEY: &'static [&'static str] = &[#(#primary_key),*];
        }
    })
}

struct ModelAttrs {
    table: Option<String>,
    primary_key: Option<Vec<LitStr>>,
}

struct ColumnAttrs {
    name: Option<String>,
    primary_key: bool,
    auto: bool,
    default: Option<LitStr>,
}

fn parse_model_attrs(attrs: &[Attribute]) -> syn::Result<ModelAttrs> {
    let mut result = ModelAttrs {
        table: None,
        primary_key: None,
    };

    for attr in attrs.iter().filter(|a| a.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                result.table = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("primary_key") {
                let content;
                parenthesized!(content in meta.input);
                let keys = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
                if keys.is_empty() {
                    return Err(meta.error("primary_key needs at least one column"));
                }
                result.primary_key = Some(keys.into_iter().collect());
                Ok(())
            } else {
                Err(meta.error("unknown model attribute"))
            }
        })?;
    }

    Ok(result)
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut result = ColumnAttrs {
        name: None,
        primary_key: false,
        auto: false,
        default: None,
    };

    for attr in attrs.iter().filter(|a| a.path().is_ident("column")) {
        // Bare `#[column]`
        if matches!(attr.meta, Meta::Path(_)) {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                result.name = Some(lit.value());
            } else if meta.path.is_ident("primary_key") {
                result.primary_key = true;
            } else if meta.path.is_ident("auto") {
                result.auto = true;
            } else if meta.path.is_ident("default") {
                result.default = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unknown column attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

/// Returns `T` for a field typed `Option<T>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

/// Same conversion as `oxide_schema::table_name_for`.
fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                result.push('_');
            }
        }
        result.push(c.to_ascii_lowercase());
    }
    result
}
