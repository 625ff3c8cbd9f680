//! Environment lookup.
//!
//! The resolver treats the environment as an opaque, case-sensitive
//! `name -> string` lookup. Values are returned raw; parsing is the job of
//! transform declarations.

use std::collections::HashMap;

/// A source of environment variables.
pub trait Environment: Send + Sync {
    /// Returns the value of `name`, or `None` if it is unset.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn lookup(&self, name: &str) -> Option<String> {
        match std::env::var(name) {
            Ok(value) => Some(value),
            Err(std::env::VarError::NotPresent) => None,
            Err(std::env::VarError::NotUnicode(_)) => {
                tracing::warn!(variable = name, "ignoring non-unicode environment variable");
                None
            }
        }
    }
}

/// An in-memory environment.
///
/// # Example
///
/// ```
/// use attune_settings::{Environment, MapEnvironment};
///
/// let env = MapEnvironment::new().with("PORT", "8080");
/// assert_eq!(env.lookup("PORT").as_deref(), Some("8080"));
/// assert_eq!(env.lookup("port"), None);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
}

impl MapEnvironment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets `name` to `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Unsets `name`.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }
}

impl Environment for MapEnvironment {
    fn lookup(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for MapEnvironment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl Environment for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_environment_set_and_remove() {
        let mut env: MapEnvironment = [("A", "1")].into_iter().collect();
        assert_eq!(env.lookup("A").as_deref(), Some("1"));

        env.set("B", "2");
        assert_eq!(env.remove("A").as_deref(), Some("1"));
        assert_eq!(env.lookup("A"), None);
        assert_eq!(env.lookup("B").as_deref(), Some("2"));
    }

    #[test]
    fn process_environment_missing_variable_is_absent() {
        let env = ProcessEnvironment;
        assert_eq!(env.lookup("ATTUNE_SETTINGS_TEST_DEFINITELY_UNSET_0x5f3759df"), None);
    }
}
