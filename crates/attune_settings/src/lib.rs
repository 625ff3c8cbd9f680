//! Declarative settings resolution for Attune.
//!
//! `attune_settings` populates plain structs from declared sources:
//!
//! - [`declaration`] - Source declarations and per-field chains
//! - [`registry`] - The annotation store, keyed by settings type
//! - [`resolver`] - Chain evaluation, validation and construction
//! - [`validate`](mod@validate) - Declared types and the validation pass
//! - [`value`] - Dynamic values produced by sources
//! - [`env`] - Environment lookup
//! - [`transform`] - Builtin transforms
//! - [`macro@Settings`] - Derive macro for settings types
//!
//! # Resolution
//!
//! Every field of a settings type carries a chain of declarations, written
//! top to bottom. The topmost declaration that yields a value wins, a
//! transform wraps whatever the declarations below it produce, and a field
//! whose chain yields nothing keeps its `Default` value. Resolved values
//! are checked against the field types before anything is constructed;
//! every failing field is reported, not just the first.
//!
//! # Example
//!
//! ```
//! use attune_settings::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default, Settings)]
//! struct Database {
//!     #[source(env = "DATABASE_URL")]
//!     url: String,
//! }
//!
//! #[derive(Debug, Default, Settings)]
//! struct App {
//!     #[source(transform = transform::number)]
//!     #[source(env = "FOO_OVERRIDE")]
//!     #[source(env = "FOO")]
//!     foo: f64,
//!
//!     #[source(nested)]
//!     database: Database,
//! }
//!
//! let resolver = Resolver::new()
//!     .with_registry(Arc::new(SettingsRegistry::new()))
//!     .with_environment(
//!         MapEnvironment::new()
//!             .with("FOO", "1")
//!             .with("FOO_OVERRIDE", "100")
//!             .with("DATABASE_URL", "postgres://localhost/app"),
//!     );
//!
//! let app = resolver.create::<App>().unwrap();
//! assert_eq!(app.foo, 100.0);
//! assert_eq!(app.database.url, "postgres://localhost/app");
//! ```

// Lets `#[derive(Settings)]` output use `attune_settings::` paths inside this crate.
extern crate self as attune_settings;

/// Source declarations and declaration chains.
pub mod declaration;

/// Environment lookup.
pub mod env;

/// Error types.
pub mod error;

/// The annotation store.
pub mod registry;

/// The resolution engine.
pub mod resolver;

/// The [`Settings`](trait@Settings) trait.
pub mod settings;

/// Builtin transforms.
pub mod transform;

/// Declared types and validation.
pub mod validate;

/// Dynamic values.
pub mod value;

pub use declaration::{DeclarationChain, SourceDeclaration, Transform, TransformFn};
pub use env::{Environment, MapEnvironment, ProcessEnvironment};
pub use error::{ApplyError, ConversionError, SettingsError};
pub use registry::{ClassBuilder, ClassId, FieldBuilder, SettingsRegistry};
pub use resolver::{EvalContext, QueryResult, Resolution, Resolver, SourceEvaluator};
pub use settings::Settings;
pub use validate::{DeclaredType, FieldType, InstanceType, ValidationError, ValidationErrors, validate};
pub use value::{FromValue, Instance, Value};

/// Re-export the `#[derive(Settings)]` macro.
pub use settings_macros::Settings;

/// Resolves `T` with the global registry and the process environment.
///
/// Shorthand for `Resolver::new().create::<T>()`.
pub fn create<T: Settings>() -> Result<T, SettingsError> {
    Resolver::new().create::<T>()
}

/// Resolves `T` with the global registry and the process environment,
/// reporting validation failures as data.
///
/// Shorthand for `Resolver::new().query::<T>()`.
pub fn query<T: Settings>() -> Result<QueryResult<T>, SettingsError> {
    Resolver::new().query::<T>()
}

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::declaration::{DeclarationChain, SourceDeclaration};
    pub use crate::env::{Environment, MapEnvironment, ProcessEnvironment};
    pub use crate::error::{ApplyError, ConversionError, SettingsError};
    pub use crate::instance_value;
    pub use crate::registry::{ClassBuilder, ClassId, SettingsRegistry};
    pub use crate::resolver::{EvalContext, QueryResult, Resolver, SourceEvaluator};
    pub use crate::settings::Settings;
    pub use crate::transform;
    pub use crate::validate::{DeclaredType, FieldType, ValidationError, ValidationErrors};
    pub use crate::value::{FromValue, Value};
    pub use settings_macros::Settings;
}
