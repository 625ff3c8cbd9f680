//! Builtin transforms.
//!
//! Each function maps an upstream value to a new one and is meant to be
//! used as a transform declaration:
//!
//! ```
//! use attune_settings::{MapEnvironment, Resolver, Settings, SettingsRegistry, transform};
//! use std::sync::Arc;
//!
//! #[derive(Default, Settings)]
//! struct Limits {
//!     #[source(transform = transform::integer)]
//!     #[source(env = "MAX_CONNECTIONS")]
//!     max_connections: u32,
//!
//!     #[source(transform = transform::boolean)]
//!     #[source(env = "STRICT")]
//!     strict: bool,
//! }
//!
//! let resolver = Resolver::new()
//!     .with_registry(Arc::new(SettingsRegistry::new()))
//!     .with_environment(
//!         MapEnvironment::new()
//!             .with("MAX_CONNECTIONS", "64")
//!             .with("STRICT", "yes"),
//!     );
//!
//! let limits = resolver.create::<Limits>().unwrap();
//! assert_eq!(limits.max_connections, 64);
//! assert!(limits.strict);
//! ```
//!
//! Absent input stays absent. Input that cannot be parsed also yields
//! absent, so the upstream string is kept and reported by validation.
//! Values that already have the target shape pass through unchanged.

use crate::value::Value;
use serde::de::DeserializeOwned;

/// Parses a string as a floating-point number.
pub fn number(upstream: Option<Value>) -> Option<Value> {
    match upstream? {
        Value::Number(n) => Some(Value::Number(n)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(Value::Number),
        _ => None,
    }
}

/// Parses a string as an integer.
///
/// Rejects fractional input such as `"1.5"`.
pub fn integer(upstream: Option<Value>) -> Option<Value> {
    match upstream? {
        Value::Number(n) if n.fract() == 0.0 => Some(Value::Number(n)),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

/// Parses `true/false`, `1/0`, `yes/no` or `on/off`, ignoring case.
pub fn boolean(upstream: Option<Value>) -> Option<Value> {
    match upstream? {
        Value::Bool(b) => Some(Value::Bool(b)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

/// Strips surrounding whitespace from a string.
pub fn trim(upstream: Option<Value>) -> Option<Value> {
    match upstream? {
        Value::String(s) => Some(Value::String(s.trim().to_string())),
        other => Some(other),
    }
}

/// Deserializes a JSON string into an instance of `T`.
///
/// ```
/// use attune_settings::{Value, transform};
///
/// let value = transform::json::<Vec<String>>(Some(Value::from(r#"["a","b"]"#))).unwrap();
/// let hosts: Vec<String> = value.into_instance().unwrap();
/// assert_eq!(hosts, ["a", "b"]);
/// ```
pub fn json<T>(upstream: Option<Value>) -> Option<Value>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    match upstream? {
        Value::String(s) => match serde_json::from_str::<T>(&s) {
            Ok(parsed) => Some(Value::instance(parsed)),
            Err(err) => {
                tracing::debug!(
                    target_type = core::any::type_name::<T>(),
                    error = %err,
                    "json transform failed"
                );
                None
            }
        },
        other if other.is_instance_of(core::any::TypeId::of::<T>()) => Some(other),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_parses_and_passes_through() {
        assert_eq!(number(Some(Value::from(" 1.5 "))), Some(Value::Number(1.5)));
        assert_eq!(number(Some(Value::Number(2.0))), Some(Value::Number(2.0)));
        assert_eq!(number(Some(Value::from("abc"))), None);
        assert_eq!(number(None), None);
    }

    #[test]
    fn integer_rejects_fractions() {
        assert_eq!(integer(Some(Value::from("42"))), Some(Value::Number(42.0)));
        assert_eq!(integer(Some(Value::from("-7"))), Some(Value::Number(-7.0)));
        assert_eq!(integer(Some(Value::from("1.5"))), None);
        assert_eq!(integer(Some(Value::Number(1.5))), None);
    }

    #[test]
    fn boolean_accepts_common_spellings() {
        for raw in ["true", "TRUE", "1", "yes", "On"] {
            assert_eq!(boolean(Some(Value::from(raw))), Some(Value::Bool(true)), "{raw}");
        }
        for raw in ["false", "0", "No", "off"] {
            assert_eq!(boolean(Some(Value::from(raw))), Some(Value::Bool(false)), "{raw}");
        }
        assert_eq!(boolean(Some(Value::from("maybe"))), None);
    }

    #[test]
    fn trim_leaves_other_values_alone() {
        assert_eq!(trim(Some(Value::from("  x "))), Some(Value::from("x")));
        assert_eq!(trim(Some(Value::Bool(true))), Some(Value::Bool(true)));
        assert_eq!(trim(None), None);
    }

    #[test]
    fn json_builds_instances() {
        let value = json::<Vec<u16>>(Some(Value::from("[1, 2, 3]"))).unwrap();
        assert!(value.is_instance_of(core::any::TypeId::of::<Vec<u16>>()));
        assert_eq!(value.into_instance::<Vec<u16>>().unwrap(), [1, 2, 3]);

        assert!(json::<Vec<u16>>(Some(Value::from("not json"))).is_none());
    }
}
