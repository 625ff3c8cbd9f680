//! The [`Settings`] trait.

use crate::error::ApplyError;
use crate::registry::ClassBuilder;
use crate::value::Value;

/// A type whose fields are populated by resolving declared sources.
///
/// Usually derived:
///
/// ```
/// use attune_settings::{MapEnvironment, Resolver, Settings, SettingsRegistry};
/// use attune_settings::transform;
/// use std::sync::Arc;
///
/// #[derive(Debug, Default, Settings)]
/// struct Server {
///     #[source(env = "HOST")]
///     host: String,
///
///     #[source(transform = transform::number)]
///     #[source(env = "PORT_OVERRIDE")]
///     #[source(env = "PORT")]
///     port: u16,
/// }
///
/// let resolver = Resolver::new()
///     .with_registry(Arc::new(SettingsRegistry::new()))
///     .with_environment(MapEnvironment::new().with("HOST", "0.0.0.0").with("PORT", "8080"));
///
/// let server = resolver.create::<Server>().unwrap();
/// assert_eq!(server.host, "0.0.0.0");
/// assert_eq!(server.port, 8080);
/// ```
///
/// Implementing it by hand means describing the declarations in
/// [`declare`](Settings::declare) and routing resolved values to fields in
/// [`apply`](Settings::apply):
///
/// ```
/// use attune_settings::{ApplyError, ClassBuilder, DeclaredType, FromValue, Settings, Value};
///
/// #[derive(Default)]
/// struct Greeting {
///     name: String,
/// }
///
/// impl Settings for Greeting {
///     fn declare(class: &mut ClassBuilder<'_>) {
///         class.field("name", DeclaredType::String).env("GREETING_NAME");
///     }
///
///     fn apply(&mut self, field: &str, value: Value) -> Result<(), ApplyError> {
///         match field {
///             "name" => self.name = String::from_value(value)?,
///             other => return Err(ApplyError::unknown_field(other)),
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Settings: Default + Send + Sync + 'static {
    /// Records this type's declarations.
    ///
    /// Called once per registry, the first time the type is registered.
    /// Parents are attached with [`ClassBuilder::extends`].
    fn declare(class: &mut ClassBuilder<'_>);

    /// Overwrites `field` with a validated value.
    ///
    /// Must accept every annotated field name, including inherited ones.
    fn apply(&mut self, field: &str, value: Value) -> Result<(), ApplyError>;

    /// Lifecycle hook, called exactly once after every resolved value has
    /// been applied.
    ///
    /// `Default::default` runs before any value is applied, so logic that
    /// depends on resolved fields belongs here.
    fn on_resolved(&mut self) {}
}
