//! Proc macros for Mirage tool and reply schemas.
//!
//! Provides `#[derive(Tool)]` to generate JSON schemas and `claude::Tool`
//! definitions from documented struct definitions.
//!
//! # Example
//!
//! ```ignore
//! /// Fetch the value of a declared input
//! #[derive(Tool, Deserialize)]
//! #[tool(name = "get_input")]
//! struct GetInput {
//!     /// Name of the input
//!     name: String,
//!     /// Which kind of input to look in
//!     #[tool(values = "argument,file")]
//!     kind: Option<String>,
//! }
//! ```
//!
//! Fields whose type is another struct (or a `Vec` of one) embed that
//! struct's own `input_schema()`, so nested types must derive `Tool` too.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, DeriveInput, Field, GenericArgument, LitStr, PathArguments,
    Type,
};

/// Derive macro for generating tool schemas.
///
/// # Attributes
///
/// - `#[tool(name = "...")]` - Override the tool name (defaults to snake_case struct name)
/// - `#[tool(optional)]` on fields - Leave the field out of `required`
/// - `#[tool(rename = "...")]` on fields - Override field name in schema
/// - `#[tool(values = "a,b,c")]` on string fields - Restrict to an enum of values
#[proc_macro_derive(Tool, attributes(tool))]
pub fn derive_tool(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_tool(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Field-level `#[tool(...)]` settings.
#[derive(Default)]
struct FieldOptions {
    optional: bool,
    rename: Option<String>,
    values: Option<Vec<String>>,
}

fn expand_tool(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let tool_name = tool_name(&input)?;
    let description = doc_comment(&input.attrs);

    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => &named.named,
            syn::Fields::Unit => {
                return Ok(expand_impl(struct_name, &tool_name, &description, &[], &[]));
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Tool derive only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(&input, "Tool derive only supports structs")),
    };

    let mut property_tokens = Vec::new();
    let mut required_fields = Vec::new();

    for field in fields {
        let options = field_options(field)?;
        let field_name = match &options.rename {
            Some(name) => name.clone(),
            None => field
                .ident
                .as_ref()
                .map(|ident| ident.to_string())
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?,
        };
        let field_desc = doc_comment(&field.attrs);
        let type_schema = type_to_schema(&field.ty)?;

        let desc_token = if field_desc.is_empty() {
            quote! {}
        } else {
            quote! { property["description"] = serde_json::json!(#field_desc); }
        };

        let enum_token = match &options.values {
            Some(values) => quote! { property["enum"] = serde_json::json!([#(#values),*]); },
            None => quote! {},
        };

        property_tokens.push(quote! {
            {
                let mut property = #type_schema;
                #desc_token
                #enum_token
                properties.insert(#field_name.to_string(), property);
            }
        });

        if !options.optional && !is_wrapper(&field.ty, "Option") {
            required_fields.push(field_name);
        }
    }

    Ok(expand_impl(
        struct_name,
        &tool_name,
        &description,
        &property_tokens,
        &required_fields,
    ))
}

fn expand_impl(
    struct_name: &syn::Ident,
    tool_name: &str,
    description: &str,
    property_tokens: &[TokenStream2],
    required_fields: &[String],
) -> TokenStream2 {
    quote! {
        impl #struct_name {
            /// Get the tool name.
            pub fn tool_name() -> &'static str {
                #tool_name
            }

            /// Get the tool description.
            pub fn tool_description() -> &'static str {
                #description
            }

            /// Generate the JSON schema for this tool's input.
            pub fn input_schema() -> serde_json::Value {
                #[allow(unused_mut)]
                let mut properties = serde_json::Map::new();
                #(#property_tokens)*

                let required: Vec<&str> = vec![#(#required_fields),*];

                serde_json::json!({
                    "type": "object",
                    "properties": properties,
                    "required": required
                })
            }

            /// Create a Tool definition for use with the Claude API.
            pub fn as_tool() -> claude::Tool {
                claude::Tool {
                    name: Self::tool_name().to_string(),
                    description: Self::tool_description().to_string(),
                    input_schema: Self::input_schema(),
                }
            }
        }
    }
}

fn tool_name(input: &DeriveInput) -> syn::Result<String> {
    let mut name = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("tool")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported tool attribute on struct"))
            }
        })?;
    }

    Ok(name.unwrap_or_else(|| to_snake_case(&input.ident.to_string())))
}

fn field_options(field: &Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("tool")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("optional") {
                options.optional = true;
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                options.rename = Some(value.value());
            } else if meta.path.is_ident("values") {
                let value: LitStr = meta.value()?.parse()?;
                options.values = Some(
                    value
                        .value()
                        .split(',')
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                        .collect(),
                );
            } else {
                return Err(meta.error("unsupported tool attribute on field"));
            }
            Ok(())
        })?;
    }
    Ok(options)
}

fn doc_comment(attrs: &[Attribute]) -> String {
    let mut docs = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let syn::Meta::NameValue(nv) = &attr.meta {
            if let syn::Expr::Lit(expr_lit) = &nv.value {
                if let syn::Lit::Str(s) = &expr_lit.lit {
                    docs.push(s.value().trim().to_string());
                }
            }
        }
    }
    docs.join(" ")
}

/// Is `ty` the single-argument generic `wrapper` (e.g. `Option<T>`)?
fn is_wrapper(ty: &Type, wrapper: &str) -> bool {
    last_segment(ty).is_some_and(|segment| segment.ident == wrapper)
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last(),
        _ => None,
    }
}

fn inner_type(segment: &syn::PathSegment) -> Option<&Type> {
    if let PathArguments::AngleBracketed(args) = &segment.arguments {
        if let Some(GenericArgument::Type(inner)) = args.args.first() {
            return Some(inner);
        }
    }
    None
}

fn type_to_schema(ty: &Type) -> syn::Result<TokenStream2> {
    let Some(segment) = last_segment(ty) else {
        return Ok(quote! { serde_json::json!({}) });
    };

    Ok(match segment.ident.to_string().as_str() {
        "String" | "str" | "PathBuf" => quote! { serde_json::json!({"type": "string"}) },
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            quote! { serde_json::json!({"type": "integer"}) }
        }
        "f32" | "f64" => quote! { serde_json::json!({"type": "number"}) },
        "bool" => quote! { serde_json::json!({"type": "boolean"}) },
        "Value" => quote! { serde_json::json!({}) },
        "Option" | "Box" => match inner_type(segment) {
            Some(inner) => type_to_schema(inner)?,
            None => quote! { serde_json::json!({}) },
        },
        "Vec" => match inner_type(segment) {
            Some(inner) => {
                let inner_schema = type_to_schema(inner)?;
                quote! {
                    serde_json::json!({
                        "type": "array",
                        "items": #inner_schema
                    })
                }
            }
            None => quote! { serde_json::json!({"type": "array"}) },
        },
        // Any other named type is expected to derive Tool itself.
        _ => quote! { <#ty>::input_schema() },
    })
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
