//! The resolution engine.
//!
//! [`Resolver`] turns a settings type's declarations into a validated
//! instance:
//!
//! 1. every annotated field's [`DeclarationChain`] is evaluated into a value
//!    or absent ([`Resolver::resolve`]);
//! 2. the values are checked against their declared types
//!    ([`validate`](crate::validate()));
//! 3. on success the type's `Default` is overlaid with every value and the
//!    [`Settings::on_resolved`] hook runs ([`Resolver::query`] /
//!    [`Resolver::create`]).
//!
//! # Chain evaluation
//!
//! A chain is folded from its last declaration to its first, starting from
//! absent. Each declaration's evaluator receives the value produced so far
//! (its *upstream*); when it yields absent, the upstream is kept. Hence:
//!
//! - with several environment declarations, the topmost variable that is
//!   set wins and the ones below act as fallbacks;
//! - a transform sees the value of the declarations written below it, and
//!   is invoked even when that value is absent.
//!
//! Evaluators are looked up by [`SourceDeclaration::kind`]. The `env`,
//! `transform` and `nested` kinds are builtin; others are added with
//! [`Resolver::with_evaluator`].

use crate::declaration::{DeclarationChain, SourceDeclaration};
use crate::env::{Environment, ProcessEnvironment};
use crate::error::{ApplyError, SettingsError};
use crate::registry::{ClassId, SettingsRegistry};
use crate::settings::Settings;
use crate::validate::{DeclaredType, InstanceType, ValidationError, ValidationErrors, validate};
use crate::value::Value;
use indexmap::IndexMap;
use std::borrow::Cow;
use std::sync::Arc;

/// Evaluates one kind of [`SourceDeclaration`].
///
/// # Example
///
/// ```
/// use attune_settings::{EvalContext, SettingsError, SourceDeclaration, SourceEvaluator, Value};
///
/// /// Resolves `custom = "literal"` declarations to their argument.
/// struct Literal;
///
/// impl SourceEvaluator for Literal {
///     fn evaluate(
///         &self,
///         _ctx: &EvalContext<'_>,
///         declaration: &SourceDeclaration,
///         _upstream: Option<Value>,
///     ) -> Result<Option<Value>, SettingsError> {
///         match declaration {
///             SourceDeclaration::Custom { argument, .. } => Ok(argument.clone().map(Value::String)),
///             _ => Ok(None),
///         }
///     }
/// }
/// ```
pub trait SourceEvaluator: Send + Sync {
    /// Produces a value for `declaration`, given the upstream value.
    ///
    /// Returning `Ok(None)` keeps the upstream value.
    fn evaluate(
        &self,
        ctx: &EvalContext<'_>,
        declaration: &SourceDeclaration,
        upstream: Option<Value>,
    ) -> Result<Option<Value>, SettingsError>;
}

/// What an evaluator knows about the field being resolved.
pub struct EvalContext<'a> {
    resolver: &'a Resolver,
    class: ClassId,
    field: &'a str,
    declared_type: Option<&'a DeclaredType>,
}

impl<'a> EvalContext<'a> {
    /// Returns the resolver running this evaluation.
    #[must_use]
    pub fn resolver(&self) -> &'a Resolver {
        self.resolver
    }

    /// Returns the settings type being resolved.
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Returns the field being resolved.
    #[must_use]
    pub fn field(&self) -> &'a str {
        self.field
    }

    /// Returns the field's declared type, if any.
    #[must_use]
    pub fn declared_type(&self) -> Option<&'a DeclaredType> {
        self.declared_type
    }

    /// Looks up an environment variable through the resolver's environment.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<String> {
        let value = self.resolver.environment.lookup(name);
        tracing::trace!(
            class = self.class.name(),
            field = self.field,
            variable = name,
            set = value.is_some(),
            "environment lookup"
        );
        value
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builtin evaluators
// ─────────────────────────────────────────────────────────────────────────────

struct EnvEvaluator;

impl SourceEvaluator for EnvEvaluator {
    fn evaluate(
        &self,
        ctx: &EvalContext<'_>,
        declaration: &SourceDeclaration,
        _upstream: Option<Value>,
    ) -> Result<Option<Value>, SettingsError> {
        match declaration {
            SourceDeclaration::Env(name) => Ok(ctx.lookup(name).map(Value::String)),
            _ => Ok(None),
        }
    }
}

struct TransformEvaluator;

impl SourceEvaluator for TransformEvaluator {
    fn evaluate(
        &self,
        _ctx: &EvalContext<'_>,
        declaration: &SourceDeclaration,
        upstream: Option<Value>,
    ) -> Result<Option<Value>, SettingsError> {
        match declaration {
            SourceDeclaration::Transform(transform) => Ok(transform.apply(upstream)),
            _ => Ok(None),
        }
    }
}

struct NestedEvaluator;

impl SourceEvaluator for NestedEvaluator {
    fn evaluate(
        &self,
        ctx: &EvalContext<'_>,
        _declaration: &SourceDeclaration,
        _upstream: Option<Value>,
    ) -> Result<Option<Value>, SettingsError> {
        let Some(declared_type) = ctx.declared_type() else {
            return Err(SettingsError::MissingNestedType {
                class: ctx.class().name(),
                field: ctx.field().to_string(),
            });
        };

        let Some(resolve) = declared_type
            .as_settings()
            .and_then(InstanceType::nested_resolver)
        else {
            return Err(SettingsError::NotSettingsType {
                class: ctx.class().name(),
                field: ctx.field().to_string(),
                type_name: declared_type.to_string(),
            });
        };

        resolve(ctx.resolver()).map(Some)
    }
}

/// Resolves `T` for a `nested` declaration.
pub(crate) fn resolve_nested<T: Settings>(resolver: &Resolver) -> Result<Value, SettingsError> {
    resolver.create::<T>().map(Value::instance)
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// The outcome of walking every declaration chain of a settings type.
///
/// Holds the fields that produced a value together with their declared
/// types. Fields whose chain yielded absent are not present. `rejected`
/// holds validation errors raised while resolving nested settings, already
/// re-rooted under the outer field.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    values: IndexMap<String, Value>,
    declared_types: IndexMap<String, DeclaredType>,
    rejected: Vec<ValidationError>,
}

impl Resolution {
    /// Returns the resolved values, in field order.
    #[must_use]
    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    /// Returns the declared type of every resolved field.
    #[must_use]
    pub fn declared_types(&self) -> &IndexMap<String, DeclaredType> {
        &self.declared_types
    }

    /// Returns the errors raised by nested settings.
    #[must_use]
    pub fn rejected(&self) -> &[ValidationError] {
        &self.rejected
    }

    /// Returns the value resolved for `field`.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Checks every resolved value against its declared type, together with
    /// the nested rejections.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.rejected.clone();
        if let Err(invalid) = validate(&self.values, &self.declared_types) {
            errors.extend(invalid);
        }

        match ValidationErrors::from_vec(errors) {
            Some(errors) => Err(errors),
            None => Ok(()),
        }
    }

    fn insert(&mut self, field: String, value: Value, declared_type: DeclaredType) {
        self.declared_types.insert(field.clone(), declared_type);
        self.values.insert(field, value);
    }
}

/// The result of [`Resolver::query`]: exactly one of an instance or its
/// validation errors.
#[derive(Debug)]
pub enum QueryResult<T> {
    /// Every field validated; the instance is fully populated.
    Resolved(T),
    /// At least one field failed validation.
    Rejected(ValidationErrors),
}

impl<T> QueryResult<T> {
    /// Returns the instance, if resolution succeeded.
    #[must_use]
    pub fn result(&self) -> Option<&T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    /// Returns the validation errors, if resolution failed.
    #[must_use]
    pub fn errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Resolved(_) => None,
            Self::Rejected(errors) => Some(errors),
        }
    }

    /// Returns `true` if resolution succeeded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Converts into a `Result`.
    pub fn into_result(self) -> Result<T, ValidationErrors> {
        match self {
            Self::Resolved(value) => Ok(value),
            Self::Rejected(errors) => Err(errors),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// Resolves settings types against a registry and an environment.
///
/// A resolver keeps no state between calls: every `resolve`, `query` or
/// `create` reads the environment afresh and returns a new instance.
///
/// # Example
///
/// ```
/// use attune_settings::{MapEnvironment, Resolver, SettingsRegistry};
/// use std::sync::Arc;
///
/// let resolver = Resolver::new()
///     .with_registry(Arc::new(SettingsRegistry::new()))
///     .with_environment(MapEnvironment::new().with("LOG", "debug"));
///
/// assert!(resolver.has_evaluator("env"));
/// ```
pub struct Resolver {
    registry: Arc<SettingsRegistry>,
    environment: Arc<dyn Environment>,
    evaluators: IndexMap<Cow<'static, str>, Arc<dyn SourceEvaluator>>,
}

impl core::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.registry)
            .field("evaluators", &self.evaluators.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Creates a resolver over the global registry and the process
    /// environment, with the builtin evaluators.
    #[must_use]
    pub fn new() -> Self {
        let mut evaluators: IndexMap<Cow<'static, str>, Arc<dyn SourceEvaluator>> =
            IndexMap::new();
        evaluators.insert(SourceDeclaration::ENV.into(), Arc::new(EnvEvaluator));
        evaluators.insert(SourceDeclaration::TRANSFORM.into(), Arc::new(TransformEvaluator));
        evaluators.insert(SourceDeclaration::NESTED.into(), Arc::new(NestedEvaluator));

        Self {
            registry: SettingsRegistry::global(),
            environment: Arc::new(ProcessEnvironment),
            evaluators,
        }
    }

    /// Uses `registry` instead of the global registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<SettingsRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Uses `environment` for variable lookups.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Environment + 'static) -> Self {
        self.environment = Arc::new(environment);
        self
    }

    /// Registers `evaluator` for declarations of `kind`, replacing any
    /// evaluator already registered for it.
    #[must_use]
    pub fn with_evaluator(
        mut self,
        kind: impl Into<Cow<'static, str>>,
        evaluator: impl SourceEvaluator + 'static,
    ) -> Self {
        self.evaluators.insert(kind.into(), Arc::new(evaluator));
        self
    }

    /// Returns the registry declarations are read from.
    #[must_use]
    pub fn registry(&self) -> &Arc<SettingsRegistry> {
        &self.registry
    }

    /// Returns the environment variables are read from.
    #[must_use]
    pub fn environment(&self) -> &dyn Environment {
        self.environment.as_ref()
    }

    /// Returns `true` if declarations of `kind` can be evaluated.
    #[must_use]
    pub fn has_evaluator(&self, kind: &str) -> bool {
        self.evaluators.contains_key(kind)
    }

    /// Registers `T` if needed and evaluates all of its declaration chains.
    pub fn resolve<T: Settings>(&self) -> Result<Resolution, SettingsError> {
        self.registry.register::<T>();
        self.resolve_class(ClassId::of::<T>())
    }

    /// Evaluates all declaration chains of an already registered type.
    pub fn resolve_class(&self, class: ClassId) -> Result<Resolution, SettingsError> {
        if !self.registry.is_declared(class) {
            return Err(SettingsError::Unregistered {
                class: class.name(),
            });
        }

        let mut resolution = Resolution::default();
        for field in self.registry.annotated_fields(class) {
            let Some(chain) = self.registry.chain_for(class, &field) else {
                continue;
            };
            if chain.is_empty() {
                tracing::trace!(class = class.name(), field, "no sources, keeping default");
                continue;
            }

            let declared_type = self.registry.declared_type(class, &field);
            let ctx = EvalContext {
                resolver: self,
                class,
                field: &field,
                declared_type: declared_type.as_ref(),
            };

            match self.evaluate_chain(&ctx, &chain) {
                Ok(Some(value)) => {
                    let Some(declared_type) = declared_type else {
                        return Err(SettingsError::MissingDeclaredType {
                            class: class.name(),
                            field,
                        });
                    };
                    tracing::debug!(class = class.name(), field, kind = value.kind_name(), "field resolved");
                    resolution.insert(field, value, declared_type);
                }
                Ok(None) => {
                    tracing::debug!(class = class.name(), field, "field absent, keeping default");
                }
                Err(SettingsError::Invalid { errors, .. }) => {
                    tracing::debug!(class = class.name(), field, errors = errors.len(), "nested settings rejected");
                    resolution
                        .rejected
                        .extend(errors.into_iter().map(|error| error.nested_under(&field)));
                }
                Err(err) => return Err(err),
            }
        }

        Ok(resolution)
    }

    fn evaluate_chain(
        &self,
        ctx: &EvalContext<'_>,
        chain: &DeclarationChain,
    ) -> Result<Option<Value>, SettingsError> {
        let mut value = None;
        for declaration in chain.iter().rev() {
            let kind = declaration.kind();
            let evaluator =
                self.evaluators
                    .get(kind)
                    .ok_or_else(|| SettingsError::UnknownDeclarationKind {
                        class: ctx.class.name(),
                        field: ctx.field.to_string(),
                        kind: kind.to_string(),
                    })?;

            let produced = evaluator.evaluate(ctx, declaration, value.clone())?;
            value = produced.or(value);
        }
        Ok(value)
    }

    /// Resolves `T`, reporting validation failures as data.
    ///
    /// Returns `Err` only for structural errors. Otherwise the result holds
    /// either a fully populated instance, on which
    /// [`Settings::on_resolved`] has run once, or every validation error.
    pub fn query<T: Settings>(&self) -> Result<QueryResult<T>, SettingsError> {
        let class = ClassId::of::<T>();
        let resolution = self.resolve::<T>()?;

        if let Err(errors) = resolution.validate() {
            tracing::debug!(class = class.name(), errors = errors.len(), "settings rejected");
            return Ok(QueryResult::Rejected(errors));
        }

        let Resolution {
            values,
            declared_types,
            ..
        } = resolution;

        let fields = values.len();
        let mut instance = T::default();
        let mut errors = Vec::new();
        // `Resolution::insert` keeps both maps in the same key order.
        for ((field, value), (_, declared_type)) in values.into_iter().zip(declared_types) {
            match instance.apply(&field, value) {
                Ok(()) => {}
                Err(ApplyError::UnknownField(field)) => {
                    return Err(SettingsError::UnknownField {
                        class: class.name(),
                        field,
                    });
                }
                Err(ApplyError::Conversion(err)) => {
                    let message = err.to_string();
                    errors.push(ValidationError::new(
                        field,
                        declared_type,
                        err.into_found(),
                        message,
                    ));
                }
            }
        }

        if let Some(errors) = ValidationErrors::from_vec(errors) {
            tracing::debug!(class = class.name(), errors = errors.len(), "settings rejected");
            return Ok(QueryResult::Rejected(errors));
        }

        instance.on_resolved();
        tracing::debug!(class = class.name(), fields, "settings resolved");
        Ok(QueryResult::Resolved(instance))
    }

    /// Resolves `T`, failing with [`SettingsError::Invalid`] if any field
    /// is invalid.
    pub fn create<T: Settings>(&self) -> Result<T, SettingsError> {
        match self.query::<T>()? {
            QueryResult::Resolved(instance) => Ok(instance),
            QueryResult::Rejected(errors) => Err(SettingsError::Invalid {
                class: ClassId::of::<T>().name(),
                errors,
            }),
        }
    }
}
