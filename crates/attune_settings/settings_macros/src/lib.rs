//! Procedural macros for `attune_settings`.
//!
//! This crate provides `#[derive(Settings)]`, which records a struct's
//! source declarations and routes resolved values into its fields.

mod settings;

use proc_macro::TokenStream;

/// Derive macro for the `Settings` trait.
///
/// Generates `Settings`, `FieldType` and `FromValue` implementations for a
/// struct with named fields. The struct must implement `Default`.
///
/// # Field attributes
///
/// - `#[source(env = "NAME")]`: read an environment variable.
/// - `#[source(transform = path)]`: apply a function
///   `fn(Option<Value>) -> Option<Value>` to the value produced by the
///   declarations below it.
/// - `#[source(nested)]`: resolve the field's type as nested settings.
/// - `#[source(custom = "kind", arg = "...")]`: a declaration for an
///   evaluator registered with `Resolver::with_evaluator`. `arg` is
///   optional.
/// - `#[settings(overwrite)]`: discard the chain inherited from the parent.
/// - `#[settings(skip)]`: leave the field out entirely.
///
/// Each `#[source]` attribute holds one declaration. They are read top to
/// bottom; the topmost one that yields a value wins.
///
/// # Struct attributes
///
/// - `#[settings(extends = Parent)]`: inherit `Parent`'s declarations.
///   Fields declared on `Parent` must also exist on this struct.
/// - `#[settings(on_resolved = path)]`: call `path(&mut self)` once every
///   resolved value has been applied.
///
/// # Example
///
/// ```
/// use attune_settings::{MapEnvironment, Resolver, Settings, SettingsRegistry, transform};
/// use std::sync::Arc;
///
/// #[derive(Debug, Default, Settings)]
/// struct Base {
///     #[source(env = "LOG")]
///     log: String,
/// }
///
/// #[derive(Debug, Default, Settings)]
/// #[settings(extends = Base, on_resolved = Service::finish)]
/// struct Service {
///     log: String,
///
///     #[source(transform = transform::number)]
///     #[source(env = "PORT")]
///     port: u16,
///
///     #[settings(skip)]
///     summary: String,
/// }
///
/// impl Service {
///     fn finish(&mut self) {
///         self.summary = format!("{} on {}", self.log, self.port);
///     }
/// }
///
/// let resolver = Resolver::new()
///     .with_registry(Arc::new(SettingsRegistry::new()))
///     .with_environment(MapEnvironment::new().with("LOG", "info").with("PORT", "80"));
///
/// let service = resolver.create::<Service>().unwrap();
/// assert_eq!(service.summary, "info on 80");
/// ```
#[proc_macro_derive(Settings, attributes(settings, source))]
pub fn derive_settings(input: TokenStream) -> TokenStream {
    settings::derive_settings(input)
}
