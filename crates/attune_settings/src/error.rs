//! Error types for settings resolution.
//!
//! Two families of failure exist and are kept apart:
//!
//! - **Structural** errors mean a settings type was declared incorrectly
//!   (unknown declaration kind, a nested field without a settings type, ...).
//!   They are returned immediately and never aggregated.
//! - **Validation** errors mean a resolved value does not fit its field.
//!   They are collected across every field of a resolution and reported
//!   together as [`ValidationErrors`].

use crate::validate::ValidationErrors;
use crate::value::Value;
use std::borrow::Cow;

/// Errors returned by [`Resolver`](crate::Resolver) operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A declaration's kind has no registered evaluator.
    #[error("no evaluator registered for `{kind}` declarations (on {class}.{field})")]
    UnknownDeclarationKind {
        /// Settings type being resolved.
        class: &'static str,
        /// Field carrying the declaration.
        field: String,
        /// The unregistered kind.
        kind: String,
    },

    /// A `nested` declaration on a field without a declared type.
    #[error("{class}.{field} is declared nested but has no declared type")]
    MissingNestedType {
        /// Settings type being resolved.
        class: &'static str,
        /// Field carrying the declaration.
        field: String,
    },

    /// A `nested` declaration on a field whose type is not a settings type.
    #[error("{class}.{field} is declared nested but `{type_name}` is not a settings type")]
    NotSettingsType {
        /// Settings type being resolved.
        class: &'static str,
        /// Field carrying the declaration.
        field: String,
        /// Name of the field's declared type.
        type_name: String,
    },

    /// A field produced a value but no declared type to validate it against.
    #[error("{class}.{field} resolved a value but has no declared type")]
    MissingDeclaredType {
        /// Settings type being resolved.
        class: &'static str,
        /// Field that produced the value.
        field: String,
    },

    /// A resolved value targets a field the settings type does not have.
    #[error("{class} has no field `{field}` to receive a resolved value")]
    UnknownField {
        /// Settings type being constructed.
        class: &'static str,
        /// Field that could not be applied.
        field: String,
    },

    /// The settings type is not known to the registry.
    #[error("settings type {class} is not registered")]
    Unregistered {
        /// Name of the unregistered type.
        class: &'static str,
    },

    /// One or more resolved values failed validation.
    #[error("invalid settings for {class}: {errors}")]
    Invalid {
        /// Settings type being resolved.
        class: &'static str,
        /// Every field that failed.
        errors: ValidationErrors,
    },
}

impl SettingsError {
    /// Returns `true` for errors caused by incorrect declarations rather
    /// than by resolved values.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Invalid { .. })
    }

    /// Returns the validation errors carried by [`SettingsError::Invalid`].
    #[must_use]
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Invalid { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

/// A validated value could not be converted into its field type.
#[derive(Debug, Clone, thiserror::Error)]
#[error("cannot convert {} into {expected}", .found.describe())]
pub struct ConversionError {
    expected: Cow<'static, str>,
    found: Value,
}

impl ConversionError {
    /// Creates a conversion error for `found`, which was expected to become
    /// an `expected`.
    pub fn new(expected: impl Into<Cow<'static, str>>, found: Value) -> Self {
        Self {
            expected: expected.into(),
            found,
        }
    }

    /// Returns the name of the target type.
    #[must_use]
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Returns the value that failed to convert.
    #[must_use]
    pub fn found(&self) -> &Value {
        &self.found
    }

    /// Consumes the error, returning the value that failed to convert.
    #[must_use]
    pub fn into_found(self) -> Value {
        self.found
    }
}

/// Errors from [`Settings::apply`](crate::Settings::apply).
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The settings type has no field with this name.
    #[error("unknown field `{0}`")]
    UnknownField(String),

    /// The value could not be converted into the field's type.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl ApplyError {
    /// Creates an [`UnknownField`](Self::UnknownField).
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField(field.into())
    }
}
