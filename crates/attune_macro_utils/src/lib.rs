//! Path lookup for code emitted by the attune derive macros.
//!
//! A settings struct may live in a crate that lists `attune_settings` in its
//! manifest, possibly under another name, or in one that only pulls in the
//! `attune` facade. [`resolve_crate_path`] reads the consumer's manifest
//! and picks whichever route is available.

use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

/// Package name of the facade crate.
const UMBRELLA: &str = "attune";

/// Runtime crates targeted by generated code.
pub enum AttuneCrate {
    /// `attune_settings`: the registry, resolver and `Settings` trait.
    Settings,
}

impl AttuneCrate {
    fn package(&self) -> &'static str {
        match self {
            Self::Settings => "attune_settings",
        }
    }

    fn ident(&self) -> Ident {
        format_ident!("{}", self.package())
    }
}

/// Path prefix under which `krate`'s items are reachable from the crate
/// being expanded.
///
/// A direct dependency is used under the name the manifest gives it. Without
/// one, the item is reached through the facade as `attune::attune_settings`.
/// When neither is listed, the bare package name is emitted and the compiler
/// reports the missing dependency at the use site.
pub fn resolve_crate_path(krate: AttuneCrate) -> TokenStream {
    let inner = krate.ident();

    if let Ok(found) = crate_name(krate.package()) {
        return match found {
            FoundCrate::Name(renamed) => {
                let renamed = format_ident!("{}", renamed);
                quote!(#renamed)
            }
            FoundCrate::Itself => quote!(#inner),
        };
    }

    match crate_name(UMBRELLA) {
        Ok(FoundCrate::Name(facade)) => {
            let facade = format_ident!("{}", facade);
            quote!(#facade::#inner)
        }
        // The facade's own doctests and integration tests.
        Ok(FoundCrate::Itself) => quote!(::attune::#inner),
        Err(_) => quote!(#inner),
    }
}
