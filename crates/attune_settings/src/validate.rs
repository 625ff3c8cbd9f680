//! Declared field types and the validation pass.
//!
//! Each annotated field carries a [`DeclaredType`] tag, attached when the
//! field is declared (derived from the Rust type through [`FieldType`]).
//! After resolution, [`validate`] checks every resolved value against its
//! field's tag and reports all failures at once.
//!
//! Primitive tags are checked by a small table of builtin predicates. Tags
//! without a builtin predicate fall back to a structural check: nullable
//! tags accept null or their inner type, instance tags require a value of
//! exactly that `TypeId`.

use crate::error::SettingsError;
use crate::resolver::{Resolver, resolve_nested};
use crate::settings::Settings;
use crate::value::Value;
use core::any::{Any, TypeId};
use core::fmt;
use indexmap::IndexMap;
use std::path::PathBuf;

/// Resolves a nested settings type into a [`Value::Instance`].
pub(crate) type NestedResolveFn = fn(&Resolver) -> Result<Value, SettingsError>;

/// The static type of a settings field, as seen by the validator.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    /// `bool`.
    Boolean,
    /// Any numeric type.
    Number,
    /// `String` and string-like types.
    String,
    /// The unit type; only `null` is accepted.
    Null,
    /// `Option<T>`; accepts `null` or the inner type.
    Optional(Box<DeclaredType>),
    /// Any other type, checked by `TypeId`.
    Instance(InstanceType),
}

impl DeclaredType {
    /// The tag for values carried as [`Value::Instance`] of `T`.
    #[must_use]
    pub fn instance<T: Any>() -> Self {
        Self::Instance(InstanceType {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            nested: None,
        })
    }

    /// The tag for a settings type `T`, resolvable through `nested`
    /// declarations.
    #[must_use]
    pub fn settings<T: Settings>() -> Self {
        Self::Instance(InstanceType {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            nested: Some(resolve_nested::<T> as NestedResolveFn),
        })
    }

    /// The nullable form of `inner`.
    #[must_use]
    pub fn optional(inner: DeclaredType) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Returns the settings type behind this tag, looking through
    /// [`DeclaredType::Optional`].
    #[must_use]
    pub fn as_settings(&self) -> Option<&InstanceType> {
        match self {
            Self::Instance(instance) if instance.is_settings() => Some(instance),
            Self::Optional(inner) => inner.as_settings(),
            _ => None,
        }
    }

    /// Returns `true` if `value` is acceptable for a field of this type.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        if let Some(predicate) = builtin_predicate(self) {
            return predicate(value);
        }

        match self {
            Self::Optional(inner) => value.is_null() || inner.accepts(value),
            Self::Instance(instance) => value.is_instance_of(instance.type_id),
            _ => false,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("boolean"),
            Self::Number => f.write_str("number"),
            Self::String => f.write_str("string"),
            Self::Null => f.write_str("null"),
            Self::Optional(inner) => write!(f, "{inner} or null"),
            Self::Instance(instance) => write!(f, "`{}`", instance.type_name),
        }
    }
}

/// Type identity for [`DeclaredType::Instance`].
#[derive(Clone, Copy)]
pub struct InstanceType {
    type_id: TypeId,
    type_name: &'static str,
    nested: Option<NestedResolveFn>,
}

impl InstanceType {
    /// Returns the `TypeId` values must match.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the Rust type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if this is a settings type.
    #[must_use]
    pub fn is_settings(&self) -> bool {
        self.nested.is_some()
    }

    pub(crate) fn nested_resolver(&self) -> Option<NestedResolveFn> {
        self.nested
    }
}

impl PartialEq for InstanceType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceType")
            .field("type_name", &self.type_name)
            .field("settings", &self.is_settings())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builtin predicates
// ─────────────────────────────────────────────────────────────────────────────

type Predicate = fn(&Value) -> bool;

fn is_boolean(value: &Value) -> bool {
    matches!(value, Value::Bool(_))
}

fn is_number(value: &Value) -> bool {
    matches!(value, Value::Number(_))
}

fn is_string(value: &Value) -> bool {
    matches!(value, Value::String(_))
}

fn is_null(value: &Value) -> bool {
    value.is_null()
}

fn builtin_predicate(declared: &DeclaredType) -> Option<Predicate> {
    match declared {
        DeclaredType::Boolean => Some(is_boolean as Predicate),
        DeclaredType::Number => Some(is_number as Predicate),
        DeclaredType::String => Some(is_string as Predicate),
        DeclaredType::Null => Some(is_null as Predicate),
        DeclaredType::Optional(_) | DeclaredType::Instance(_) => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FieldType
// ─────────────────────────────────────────────────────────────────────────────

/// Maps a Rust field type to its [`DeclaredType`] tag.
pub trait FieldType {
    /// Returns the tag for `Self`.
    fn declared_type() -> DeclaredType;
}

impl FieldType for bool {
    fn declared_type() -> DeclaredType {
        DeclaredType::Boolean
    }
}

impl FieldType for String {
    fn declared_type() -> DeclaredType {
        DeclaredType::String
    }
}

impl FieldType for PathBuf {
    fn declared_type() -> DeclaredType {
        DeclaredType::String
    }
}

impl FieldType for () {
    fn declared_type() -> DeclaredType {
        DeclaredType::Null
    }
}

macro_rules! impl_number_field_type {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldType for $ty {
                fn declared_type() -> DeclaredType {
                    DeclaredType::Number
                }
            }
        )*
    };
}

impl_number_field_type!(f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<T: FieldType> FieldType for Option<T> {
    fn declared_type() -> DeclaredType {
        DeclaredType::optional(T::declared_type())
    }
}

impl<T: Any> FieldType for Vec<T> {
    fn declared_type() -> DeclaredType {
        DeclaredType::instance::<Vec<T>>()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation errors
// ─────────────────────────────────────────────────────────────────────────────

/// A resolved value that does not fit its field.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    field: String,
    declared_type: DeclaredType,
    value: Value,
    message: String,
}

impl ValidationError {
    /// Creates a validation error with a custom message.
    pub fn new(
        field: impl Into<String>,
        declared_type: DeclaredType,
        value: Value,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            declared_type,
            value,
            message: message.into(),
        }
    }

    /// Creates the standard type-mismatch error.
    pub fn mismatch(field: impl Into<String>, declared_type: DeclaredType, value: Value) -> Self {
        let message = format!("expected {declared_type}, got {}", value.describe());
        Self::new(field, declared_type, value, message)
    }

    /// Returns the failing field. Nested fields are dotted (`db.port`).
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the field's declared type.
    #[must_use]
    pub fn declared_type(&self) -> &DeclaredType {
        &self.declared_type
    }

    /// Returns the offending value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the failure message, without the field name.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Re-roots this error under the outer field `parent`.
    #[must_use]
    pub fn nested_under(mut self, parent: &str) -> Self {
        self.field = format!("{parent}.{}", self.field);
        self
    }
}

/// A non-empty list of [`ValidationError`]s.
///
/// Displays as every error joined with `"; "`, so a single message names
/// every offending field.
#[derive(Debug, Clone)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Wraps `errors`, returning `None` if there are none.
    #[must_use]
    pub fn from_vec(errors: Vec<ValidationError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the errors in field order.
    pub fn iter(&self) -> core::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Returns the failing field names in order.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(ValidationError::field).collect()
    }

    /// Returns the error for `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&ValidationError> {
        self.0.iter().find(|error| error.field == field)
    }

    /// Returns the errors as a vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = core::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Checks every value against its field's declared type.
///
/// Exhaustive: all fields are checked, and every failure is reported.
/// Values without a declared type are not checked; the resolver never
/// produces them.
pub fn validate(
    values: &IndexMap<String, Value>,
    declared_types: &IndexMap<String, DeclaredType>,
) -> Result<(), ValidationErrors> {
    let errors = values
        .iter()
        .filter_map(|(field, value)| {
            let declared = declared_types.get(field)?;
            (!declared.accepts(value))
                .then(|| ValidationError::mismatch(field.as_str(), declared.clone(), value.clone()))
        })
        .collect();

    match ValidationErrors::from_vec(errors) {
        Some(errors) => Err(errors),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maps(
        entries: &[(&str, DeclaredType, Value)],
    ) -> (IndexMap<String, Value>, IndexMap<String, DeclaredType>) {
        let values = entries
            .iter()
            .map(|(field, _, value)| (field.to_string(), value.clone()))
            .collect();
        let types = entries
            .iter()
            .map(|(field, ty, _)| (field.to_string(), ty.clone()))
            .collect();
        (values, types)
    }

    #[test]
    fn primitive_predicates() {
        assert!(DeclaredType::Boolean.accepts(&Value::Bool(true)));
        assert!(DeclaredType::Number.accepts(&Value::Number(1.0)));
        assert!(DeclaredType::String.accepts(&Value::from("x")));
        assert!(DeclaredType::Null.accepts(&Value::Null));

        assert!(!DeclaredType::Number.accepts(&Value::from("1")));
        assert!(!DeclaredType::Null.accepts(&Value::Bool(false)));
        assert!(!DeclaredType::String.accepts(&Value::Null));
    }

    #[test]
    fn optional_accepts_null_or_inner() {
        let ty = <Option<u16> as FieldType>::declared_type();
        assert!(ty.accepts(&Value::Null));
        assert!(ty.accepts(&Value::Number(8.0)));
        assert!(!ty.accepts(&Value::from("8")));
    }

    #[test]
    fn instance_falls_back_to_type_identity() {
        let ty = <Vec<String> as FieldType>::declared_type();
        assert!(ty.accepts(&Value::instance(vec!["a".to_string()])));
        assert!(!ty.accepts(&Value::instance(vec![1_u8])));
        assert!(!ty.accepts(&Value::from("a")));
    }

    #[test]
    fn validation_is_exhaustive() {
        let (values, types) = maps(&[
            ("port", DeclaredType::Number, Value::from("80")),
            ("host", DeclaredType::String, Value::from("localhost")),
            ("debug", DeclaredType::Boolean, Value::from("yes")),
        ]);

        let errors = validate(&values, &types).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.fields(), ["port", "debug"]);
        assert_eq!(
            errors.get("port").unwrap().message(),
            "expected number, got string \"80\""
        );
    }

    #[test]
    fn joined_message_names_every_field() {
        let (values, types) = maps(&[
            ("a", DeclaredType::Number, Value::Bool(true)),
            ("b", DeclaredType::Boolean, Value::Number(2.0)),
        ]);

        let message = validate(&values, &types).unwrap_err().to_string();
        assert_eq!(
            message,
            "a: expected number, got boolean true; b: expected boolean, got number 2"
        );
    }

    #[test]
    fn valid_values_pass() {
        let (values, types) = maps(&[("name", DeclaredType::String, Value::from("svc"))]);
        assert!(validate(&values, &types).is_ok());
    }

    #[test]
    fn nested_under_prefixes_field() {
        let error = ValidationError::mismatch("port", DeclaredType::Number, Value::Null)
            .nested_under("database");
        assert_eq!(error.field(), "database.port");
        assert_eq!(error.to_string(), "database.port: expected number, got null");
    }
}
