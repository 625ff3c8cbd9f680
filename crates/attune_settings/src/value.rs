//! Dynamically typed values flowing through declaration chains.
//!
//! Every declaration evaluates to an optional [`Value`]. Primitive values
//! cover what environment lookups and the builtin transforms produce;
//! anything richer (nested settings, parsed collections, user types) travels
//! as a type-erased [`Instance`] tagged with its `TypeId`.
//!
//! [`FromValue`] converts a validated value into the concrete field type
//! when the value is overlaid onto a settings instance.

use crate::error::ConversionError;
use core::any::{Any, TypeId};
use core::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A resolved value, prior to conversion into its field type.
#[derive(Clone)]
pub enum Value {
    /// The literal null value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. Integers are represented exactly up to 2^53.
    Number(f64),
    /// A string, as read from the environment or produced by a transform.
    String(String),
    /// Any other value, type-erased.
    Instance(Instance),
}

impl Value {
    /// Wraps an arbitrary value as an [`Instance`].
    pub fn instance<T: Any + Send + Sync>(value: T) -> Self {
        Self::Instance(Instance::new(value))
    }

    /// Returns a short name for the kind of value held.
    ///
    /// Primitive kinds use the same names as [`DeclaredType`](crate::DeclaredType);
    /// instances report their Rust type name.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Instance(instance) => instance.type_name(),
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the number, if this is one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the instance, if this is one.
    #[must_use]
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Returns `true` if this is an instance of exactly `type_id`.
    #[must_use]
    pub fn is_instance_of(&self, type_id: TypeId) -> bool {
        matches!(self, Self::Instance(instance) if instance.type_id() == type_id)
    }

    /// Takes the instance out of this value as a `T`.
    ///
    /// Fails if the value is not an instance of `T`, or if the instance is
    /// still shared with another `Value`.
    pub fn into_instance<T: Any + Send + Sync>(self) -> Result<T, ConversionError> {
        match self {
            Self::Instance(instance) => instance.take::<T>().map_err(|instance| {
                ConversionError::new(core::any::type_name::<T>(), Value::Instance(instance))
            }),
            other => Err(ConversionError::new(core::any::type_name::<T>(), other)),
        }
    }

    /// Takes the instance out of this value as a `T`, cloning it if the
    /// instance is still shared with another `Value`.
    ///
    /// Fails only if the value is not an instance of `T`.
    pub fn into_instance_cloned<T: Any + Clone + Send + Sync>(self) -> Result<T, ConversionError> {
        match self {
            Self::Instance(instance) => instance.take::<T>().or_else(|instance| {
                instance.downcast_ref::<T>().cloned().ok_or_else(|| {
                    ConversionError::new(core::any::type_name::<T>(), Value::Instance(instance))
                })
            }),
            other => Err(ConversionError::new(core::any::type_name::<T>(), other)),
        }
    }

    /// Describes the value for error messages, e.g. `string "abc"`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Instance(instance) => format!("instance of `{}`", instance.type_name()),
            other => format!("{} {other}", other.kind_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Self::Number(value) => f.debug_tuple("Number").field(value).finish(),
            Self::String(value) => f.debug_tuple("String").field(value).finish(),
            Self::Instance(instance) => f.debug_tuple("Instance").field(instance).finish(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Instance(instance) => write!(f, "<{}>", instance.type_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Instance(a), Self::Instance(b)) => Arc::ptr_eq(&a.data, &b.data),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

macro_rules! impl_number_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Number(value as f64)
                }
            }
        )*
    };
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl_number_from!(f32, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

// ─────────────────────────────────────────────────────────────────────────────
// Instance
// ─────────────────────────────────────────────────────────────────────────────

/// A type-erased value with its type identity attached.
#[derive(Clone)]
pub struct Instance {
    type_id: TypeId,
    type_name: &'static str,
    data: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// Wraps `value`.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            data: Arc::new(value),
        }
    }

    /// Returns the `TypeId` of the wrapped value.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name of the wrapped value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the wrapped value is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Borrows the wrapped value as a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    /// Moves the wrapped value out as a `T`.
    ///
    /// Returns `self` unchanged if the type does not match or the value is
    /// still shared by a clone of this instance.
    pub fn take<T: Any + Send + Sync>(self) -> Result<T, Self> {
        let Self {
            type_id,
            type_name,
            data,
        } = self;

        match data.downcast::<T>() {
            Ok(typed) => Arc::try_unwrap(typed).map_err(|typed| Self {
                type_id,
                type_name,
                data: typed,
            }),
            Err(data) => Err(Self {
                type_id,
                type_name,
                data,
            }),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FromValue
// ─────────────────────────────────────────────────────────────────────────────

/// Conversion from a validated [`Value`] into a field's Rust type.
///
/// Implemented for the primitive types, `Option<T>`, `Vec<T>` and
/// `PathBuf`. `#[derive(Settings)]` implements it for settings types, and
/// [`instance_value!`](crate::instance_value) wires any other type through
/// [`Value::Instance`].
pub trait FromValue: Sized {
    /// Converts `value` into `Self`.
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(value) => Ok(value),
            other => Err(ConversionError::new("bool", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(value) => Ok(value),
            other => Err(ConversionError::new("String", other)),
        }
    }
}

impl FromValue for PathBuf {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(value) => Ok(PathBuf::from(value)),
            other => Err(ConversionError::new("PathBuf", other)),
        }
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(()),
            other => Err(ConversionError::new("()", other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Number(value) => Ok(value),
            other => Err(ConversionError::new("f64", other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Number(value) => Ok(value as f32),
            other => Err(ConversionError::new("f32", other)),
        }
    }
}

macro_rules! impl_integer_from_value {
    ($cmp:tt; $($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    match value {
                        Value::Number(n)
                            if n.fract() == 0.0 && n >= <$ty>::MIN as f64 && n $cmp <$ty>::MAX as f64 =>
                        {
                            Ok(n as $ty)
                        }
                        other => Err(ConversionError::new(stringify!($ty), other)),
                    }
                }
            }
        )*
    };
}

impl_integer_from_value!(<=; i8, i16, i32, u8, u16, u32);
// `MAX as f64` rounds up to the next power of two for these, so the bound is exclusive.
impl_integer_from_value!(<; i64, isize, u64, usize);

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Any + Clone + Send + Sync> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        value.into_instance_cloned::<Vec<T>>()
    }
}

/// Implements [`FieldType`](crate::FieldType) and [`FromValue`] for types
/// carried as [`Value::Instance`].
///
/// Fields of these types validate with an is-instance-of check and are
/// typically produced by a transform. The type must be `Clone`: an instance
/// still shared with another `Value` is cloned out.
///
/// # Example
///
/// ```
/// use attune_settings::{instance_value, Value, FromValue};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Endpoint(String);
///
/// instance_value!(Endpoint);
///
/// let value = Value::instance(Endpoint("localhost".into()));
/// assert_eq!(Endpoint::from_value(value).unwrap(), Endpoint("localhost".into()));
/// ```
#[macro_export]
macro_rules! instance_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::FieldType for $ty {
                fn declared_type() -> $crate::DeclaredType {
                    $crate::DeclaredType::instance::<$ty>()
                }
            }

            impl $crate::FromValue for $ty {
                fn from_value(
                    value: $crate::Value,
                ) -> ::core::result::Result<Self, $crate::ConversionError> {
                    value.into_instance_cloned::<$ty>()
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_reject_fractions_and_out_of_range() {
        assert_eq!(u16::from_value(Value::Number(8080.0)).unwrap(), 8080);
        assert!(u16::from_value(Value::Number(1.5)).is_err());
        assert!(u16::from_value(Value::Number(70_000.0)).is_err());
        assert!(u8::from_value(Value::Number(-1.0)).is_err());
        assert_eq!(i64::from_value(Value::Number(-42.0)).unwrap(), -42);
    }

    #[test]
    fn option_maps_null_to_none() {
        assert_eq!(Option::<String>::from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<String>::from_value(Value::from("x")).unwrap(),
            Some("x".to_string())
        );
    }

    #[test]
    fn wide_integers_reject_values_past_max() {
        assert!(u64::from_value(Value::Number(18_446_744_073_709_551_616.0)).is_err());
        assert!(i64::from_value(Value::Number(9_223_372_036_854_775_808.0)).is_err());
        assert!(usize::from_value(Value::Number(18_446_744_073_709_551_616.0)).is_err());
        assert_eq!(
            u64::from_value(Value::Number(9_007_199_254_740_992.0)).unwrap(),
            9_007_199_254_740_992
        );
        assert_eq!(i64::from_value(Value::Number(i64::MIN as f64)).unwrap(), i64::MIN);
        assert_eq!(u32::from_value(Value::Number(f64::from(u32::MAX))).unwrap(), u32::MAX);
    }

    #[test]
    fn instance_take_requires_unique_ownership() {
        let instance = Instance::new(vec![1_u32, 2, 3]);
        let shared = instance.clone();

        let instance = instance.take::<Vec<u32>>().unwrap_err();
        drop(shared);
        assert_eq!(instance.take::<Vec<u32>>().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn shared_instance_is_cloned_out() {
        let value = Value::instance(vec![1_u32, 2, 3]);
        let shared = value.clone();

        assert_eq!(Vec::<u32>::from_value(value).unwrap(), vec![1, 2, 3]);
        assert_eq!(Vec::<u32>::from_value(shared).unwrap(), vec![1, 2, 3]);
        assert!(Vec::<u16>::from_value(Value::instance(vec![1_u32])).is_err());
    }

    #[test]
    fn instance_take_rejects_other_types() {
        let instance = Instance::new(7_u8);
        assert!(instance.is::<u8>());
        assert!(!instance.is::<u16>());

        let instance = instance.take::<u16>().unwrap_err();
        assert_eq!(instance.take::<u8>().unwrap(), 7);
    }

    #[test]
    fn describe_quotes_strings() {
        assert_eq!(Value::from("1").describe(), "string \"1\"");
        assert_eq!(Value::from(1).describe(), "number 1");
        assert_eq!(Value::Null.describe(), "null");
        assert_eq!(
            Value::instance(3_u8).describe(),
            "instance of `u8`"
        );
    }

    #[test]
    fn instances_compare_by_identity() {
        let a = Value::instance(1_u8);
        let b = Value::instance(1_u8);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
