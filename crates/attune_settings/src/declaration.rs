//! Source declarations and the per-field chains that hold them.
//!
//! A [`SourceDeclaration`] names one candidate origin for a field's value.
//! Declarations stack on a field in a [`DeclarationChain`], topmost first:
//! index `0` is the declaration written closest to the top of the field and
//! has the highest precedence.
//!
//! ```text
//! #[source(env = "FOO_OVERRIDE")]    chain[0]  wins when set
//! #[source(env = "FOO")]             chain[1]  fallback
//! foo: String,
//! ```

use crate::value::Value;
use core::fmt;
use std::borrow::Cow;
use std::sync::Arc;

/// Signature of a transform: maps the upstream value (absent as `None`) to a
/// new value, or to absent.
pub type TransformFn = dyn Fn(Option<Value>) -> Option<Value> + Send + Sync;

/// A shareable transform function.
#[derive(Clone)]
pub struct Transform {
    name: &'static str,
    func: Arc<TransformFn>,
}

impl Transform {
    /// Wraps a function as a transform.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Option<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            name: core::any::type_name::<F>(),
            func: Arc::new(func),
        }
    }

    /// Invokes the transform on `upstream`.
    ///
    /// Called for absent upstream values too; the function decides what
    /// absent input means.
    pub fn apply(&self, upstream: Option<Value>) -> Option<Value> {
        (self.func)(upstream)
    }

    /// Returns the type name of the wrapped function, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transform").field(&self.name).finish()
    }
}

/// One candidate origin for a field's value.
#[derive(Debug, Clone)]
pub enum SourceDeclaration {
    /// Read the named environment variable.
    Env(String),
    /// Apply a function to the value produced by the declarations below.
    Transform(Transform),
    /// Resolve the field's declared type as a nested settings type.
    Nested,
    /// A declaration handled by a user-registered
    /// [`SourceEvaluator`](crate::SourceEvaluator).
    Custom {
        /// Evaluator key.
        kind: Cow<'static, str>,
        /// Optional evaluator-specific argument.
        argument: Option<String>,
    },
}

impl SourceDeclaration {
    /// Kind key of [`SourceDeclaration::Env`].
    pub const ENV: &'static str = "env";
    /// Kind key of [`SourceDeclaration::Transform`].
    pub const TRANSFORM: &'static str = "transform";
    /// Kind key of [`SourceDeclaration::Nested`].
    pub const NESTED: &'static str = "nested";

    /// Creates an environment-variable declaration.
    pub fn env(name: impl Into<String>) -> Self {
        Self::Env(name.into())
    }

    /// Creates a transform declaration.
    pub fn transform<F>(func: F) -> Self
    where
        F: Fn(Option<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        Self::Transform(Transform::new(func))
    }

    /// Creates a nested-settings declaration.
    #[must_use]
    pub fn nested() -> Self {
        Self::Nested
    }

    /// Creates a declaration for a custom evaluator.
    pub fn custom(kind: impl Into<Cow<'static, str>>, argument: Option<String>) -> Self {
        Self::Custom {
            kind: kind.into(),
            argument,
        }
    }

    /// Returns the evaluator key for this declaration.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Env(_) => Self::ENV,
            Self::Transform(_) => Self::TRANSFORM,
            Self::Nested => Self::NESTED,
            Self::Custom { kind, .. } => kind,
        }
    }
}

/// The ordered declarations of one field on one settings type.
#[derive(Debug, Clone, Default)]
pub struct DeclarationChain {
    field: String,
    declarations: Vec<SourceDeclaration>,
}

impl DeclarationChain {
    /// Creates an empty chain for `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            declarations: Vec::new(),
        }
    }

    /// Creates a chain for `field` holding `declarations`, topmost first.
    pub fn with_declarations(
        field: impl Into<String>,
        declarations: impl IntoIterator<Item = SourceDeclaration>,
    ) -> Self {
        Self {
            field: field.into(),
            declarations: declarations.into_iter().collect(),
        }
    }

    /// Returns the field this chain belongs to.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Appends a declaration below the existing ones.
    pub fn push(&mut self, declaration: SourceDeclaration) {
        self.declarations.push(declaration);
    }

    /// Appends every declaration of `other` below the existing ones.
    pub fn extend(&mut self, other: &DeclarationChain) {
        self.declarations.extend(other.declarations.iter().cloned());
    }

    /// Returns the declarations, topmost first.
    #[must_use]
    pub fn declarations(&self) -> &[SourceDeclaration] {
        &self.declarations
    }

    /// Iterates the declarations, topmost first.
    pub fn iter(&self) -> core::slice::Iter<'_, SourceDeclaration> {
        self.declarations.iter()
    }

    /// Returns the number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Returns `true` if the chain has no declarations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl<'a> IntoIterator for &'a DeclarationChain {
    type Item = &'a SourceDeclaration;
    type IntoIter = core::slice::Iter<'a, SourceDeclaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(SourceDeclaration::env("A").kind(), "env");
        assert_eq!(SourceDeclaration::transform(|v| v).kind(), "transform");
        assert_eq!(SourceDeclaration::nested().kind(), "nested");
        assert_eq!(SourceDeclaration::custom("vault", None).kind(), "vault");
    }

    #[test]
    fn chain_keeps_declaration_order() {
        let mut chain = DeclarationChain::new("foo");
        chain.push(SourceDeclaration::env("FOO_OVERRIDE"));
        chain.push(SourceDeclaration::env("FOO"));

        let names: Vec<_> = chain
            .iter()
            .filter_map(|declaration| match declaration {
                SourceDeclaration::Env(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, ["FOO_OVERRIDE", "FOO"]);
        assert_eq!(chain.field(), "foo");
    }

    #[test]
    fn transform_receives_absent_upstream() {
        let transform = Transform::new(|upstream: Option<Value>| {
            Some(Value::Bool(upstream.is_none()))
        });
        assert_eq!(transform.apply(None), Some(Value::Bool(true)));
        assert_eq!(transform.apply(Some(Value::Null)), Some(Value::Bool(false)));
    }
}
