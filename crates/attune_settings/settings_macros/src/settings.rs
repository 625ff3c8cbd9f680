//! Derive macro for the `Settings` trait.

use darling::util::{Flag, Ignored};
use darling::{FromDeriveInput, FromField, ast};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{DeriveInput, Expr, LitStr, parse_macro_input};

/// Parsed struct-level attributes.
#[derive(FromDeriveInput)]
#[darling(attributes(settings), supports(struct_named))]
struct SettingsArgs {
    ident: syn::Ident,
    generics: syn::Generics,
    data: ast::Data<Ignored, SettingsField>,

    /// Parent settings type whose declarations are inherited.
    extends: Option<syn::Path>,

    /// Function called with `&mut Self` after construction.
    on_resolved: Option<syn::Path>,
}

/// Parsed field-level attributes. `#[source]` attributes are forwarded
/// untouched and parsed by [`parse_source`].
#[derive(FromField)]
#[darling(attributes(settings), forward_attrs(source))]
struct SettingsField {
    ident: Option<syn::Ident>,
    ty: syn::Type,
    attrs: Vec<syn::Attribute>,
    overwrite: Flag,
    skip: Flag,
}

/// One `#[source(...)]` attribute.
enum Declaration {
    Env(LitStr),
    Transform(Expr),
    Nested,
    Custom {
        kind: LitStr,
        argument: Option<LitStr>,
    },
}

fn parse_source(attr: &syn::Attribute) -> syn::Result<Declaration> {
    let mut env = None;
    let mut transform = None;
    let mut nested = false;
    let mut custom = None;
    let mut argument = None;

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("env") {
            env = Some(meta.value()?.parse::<LitStr>()?);
        } else if meta.path.is_ident("transform") {
            transform = Some(meta.value()?.parse::<Expr>()?);
        } else if meta.path.is_ident("nested") {
            nested = true;
        } else if meta.path.is_ident("custom") {
            custom = Some(meta.value()?.parse::<LitStr>()?);
        } else if meta.path.is_ident("arg") {
            argument = Some(meta.value()?.parse::<LitStr>()?);
        } else {
            return Err(meta.error(
                "unknown source, expected `env`, `transform`, `nested` or `custom`",
            ));
        }
        Ok(())
    })?;

    if argument.is_some() && custom.is_none() {
        return Err(syn::Error::new_spanned(
            attr,
            "`arg` is only allowed together with `custom`",
        ));
    }

    let declared = usize::from(env.is_some())
        + usize::from(transform.is_some())
        + usize::from(nested)
        + usize::from(custom.is_some());
    if declared != 1 {
        return Err(syn::Error::new_spanned(
            attr,
            "each #[source] attribute must hold exactly one declaration",
        ));
    }

    Ok(if let Some(name) = env {
        Declaration::Env(name)
    } else if let Some(func) = transform {
        Declaration::Transform(func)
    } else if let Some(kind) = custom {
        Declaration::Custom { kind, argument }
    } else {
        Declaration::Nested
    })
}

fn expand_declaration(declaration: &Declaration) -> TokenStream2 {
    match declaration {
        Declaration::Env(name) => quote!(.env(#name)),
        Declaration::Transform(func) => quote!(.transform(#func)),
        Declaration::Nested => quote!(.nested()),
        Declaration::Custom { kind, argument } => {
            let argument = match argument {
                Some(argument) => quote! {
                    ::core::option::Option::Some(::std::string::String::from(#argument))
                },
                None => quote!(::core::option::Option::None),
            };
            quote!(.custom(#kind, #argument))
        }
    }
}

/// Implementation of the `#[derive(Settings)]` macro.
pub(crate) fn derive_settings(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let args = match SettingsArgs::from_derive_input(&input) {
        Ok(args) => args,
        Err(err) => return err.write_errors().into(),
    };

    match expand(&args) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(args: &SettingsArgs) -> syn::Result<TokenStream2> {
    if !args.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &args.generics,
            "Settings cannot be derived for generic types",
        ));
    }

    let name = &args.ident;
    let krate = attune_macro_utils::resolve_crate_path(attune_macro_utils::AttuneCrate::Settings);

    let fields = args
        .data
        .as_ref()
        .take_struct()
        .map(|fields| fields.fields)
        .unwrap_or_default();

    let mut declarations = Vec::new();
    let mut arms = Vec::new();
    for field in fields {
        if field.skip.is_present() {
            if field.overwrite.is_present() || !field.attrs.is_empty() {
                return Err(syn::Error::new(
                    field.skip.span(),
                    "a skipped field cannot carry sources or `overwrite`",
                ));
            }
            continue;
        }

        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let field_name = ident.unraw().to_string();

        let sources = field
            .attrs
            .iter()
            .map(|attr| parse_source(attr).map(|declaration| expand_declaration(&declaration)))
            .collect::<syn::Result<Vec<_>>>()?;
        let overwrite = field.overwrite.is_present().then(|| quote!(.overwrite()));

        declarations.push(quote! {
            class
                .field(#field_name, <#ty as #krate::FieldType>::declared_type())
                #(#sources)*
                #overwrite;
        });

        arms.push(quote! {
            #field_name => {
                self.#ident = <#ty as #krate::FromValue>::from_value(value)?;
                ::core::result::Result::Ok(())
            }
        });
    }

    let extends = args
        .extends
        .as_ref()
        .map(|parent| quote!(class.extends::<#parent>();));

    let on_resolved = args.on_resolved.as_ref().map(|hook| {
        quote! {
            fn on_resolved(&mut self) {
                #hook(self);
            }
        }
    });

    Ok(quote! {
        impl #krate::Settings for #name {
            fn declare(class: &mut #krate::ClassBuilder<'_>) {
                #extends
                #(#declarations)*
                let _ = class;
            }

            fn apply(
                &mut self,
                field: &str,
                value: #krate::Value,
            ) -> ::core::result::Result<(), #krate::ApplyError> {
                match field {
                    #(#arms)*
                    other => {
                        let _ = value;
                        ::core::result::Result::Err(#krate::ApplyError::unknown_field(other))
                    }
                }
            }

            #on_resolved
        }

        impl #krate::FieldType for #name {
            fn declared_type() -> #krate::DeclaredType {
                #krate::DeclaredType::settings::<Self>()
            }
        }

        impl #krate::FromValue for #name {
            fn from_value(
                value: #krate::Value,
            ) -> ::core::result::Result<Self, #krate::ConversionError> {
                value.into_instance::<Self>()
            }
        }
    })
}
