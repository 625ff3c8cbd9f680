//! The annotation store.
//!
//! [`SettingsRegistry`] maps `(settings type, field)` pairs to their
//! [`DeclarationChain`] and [`DeclaredType`], and records which type each
//! settings type extends. Lookups walk from the most-derived type up its
//! ancestry and the first type holding an entry wins, so a subclass entry
//! fully shadows its ancestors' entry for that field.
//!
//! # Lifecycle
//!
//! The registry is written while settings types are registered and read
//! while they are resolved. Registration happens once per type (on first
//! use, or explicitly via [`SettingsRegistry::register`]) and commits the
//! whole type under a single write lock; resolution only takes read locks.
//!
//! A process-wide instance is available through [`SettingsRegistry::global`].
//! Independent registries can be created for isolation, e.g. in tests.

use crate::declaration::{DeclarationChain, SourceDeclaration};
use crate::settings::Settings;
use crate::validate::DeclaredType;
use crate::value::Value;
use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};
use hashbrown::HashMap;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use std::borrow::Cow;
use std::sync::{Arc, LazyLock};

static GLOBAL: LazyLock<Arc<SettingsRegistry>> =
    LazyLock::new(|| Arc::new(SettingsRegistry::new()));

/// Identity of a settings type.
#[derive(Clone, Copy)]
pub struct ClassId {
    type_id: TypeId,
    name: &'static str,
}

impl ClassId {
    /// Creates the `ClassId` of `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ClassId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ClassId {}

impl Hash for ClassId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassId").field(&self.name).finish()
    }
}

/// Declarations attached to one field of one settings type.
#[derive(Debug, Clone, Default)]
struct FieldEntry {
    /// `Some` once the field is annotated on this type, even if empty.
    chain: Option<DeclarationChain>,
    declared_type: Option<DeclaredType>,
}

#[derive(Debug, Default)]
struct ClassEntry {
    parent: Option<ClassId>,
    fields: IndexMap<String, FieldEntry>,
}

type ClassMap = HashMap<ClassId, ClassEntry>;

/// Process-wide store of settings declarations, keyed by type identity.
#[derive(Default)]
pub struct SettingsRegistry {
    classes: RwLock<ClassMap>,
}

impl fmt::Debug for SettingsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let classes = self.classes.read();
        let names: Vec<_> = classes.keys().map(ClassId::name).collect();
        f.debug_struct("SettingsRegistry")
            .field("classes", &names)
            .finish()
    }
}

impl SettingsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            classes: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the process-wide registry.
    #[must_use]
    pub fn global() -> Arc<SettingsRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Registers `T` and, through [`ClassBuilder::extends`], its ancestors.
    ///
    /// Idempotent: a type already present is left untouched.
    pub fn register<T: Settings>(&self) {
        let class = ClassId::of::<T>();
        if self.is_declared(class) {
            return;
        }

        let mut builder = ClassBuilder::new(self, class);
        T::declare(&mut builder);
        builder.commit();
    }

    /// Introduces `class`, optionally extending `parent`.
    ///
    /// Re-declaring an existing class only updates its parent.
    pub fn declare_class(&self, class: ClassId, parent: Option<ClassId>) {
        let mut classes = self.classes.write();
        classes.entry(class).or_default().parent = parent;
    }

    /// Returns `true` if `class` is present in the registry.
    #[must_use]
    pub fn is_declared(&self, class: ClassId) -> bool {
        self.classes.read().contains_key(&class)
    }

    /// Returns the type `class` extends.
    #[must_use]
    pub fn parent(&self, class: ClassId) -> Option<ClassId> {
        self.classes.read().get(&class).and_then(|entry| entry.parent)
    }

    /// Appends `declaration` to the chain of `(class, field)`, creating the
    /// chain (and class) if absent.
    pub fn record(&self, class: ClassId, field: &str, declaration: SourceDeclaration) {
        let mut classes = self.classes.write();
        let entry = classes
            .entry(class)
            .or_default()
            .fields
            .entry(field.to_string())
            .or_default();
        entry
            .chain
            .get_or_insert_with(|| DeclarationChain::new(field))
            .push(declaration);
    }

    /// Substitutes the chain of `(class, field)` with `declarations`.
    ///
    /// An empty replacement leaves the field annotated but sourceless, so
    /// only the field's default applies and no ancestor chain is consulted.
    pub fn replace(
        &self,
        class: ClassId,
        field: &str,
        declarations: impl IntoIterator<Item = SourceDeclaration>,
    ) {
        let chain = DeclarationChain::with_declarations(field, declarations);
        let mut classes = self.classes.write();
        classes
            .entry(class)
            .or_default()
            .fields
            .entry(field.to_string())
            .or_default()
            .chain = Some(chain);
    }

    /// Attaches the declared type of `(class, field)`.
    pub fn set_declared_type(&self, class: ClassId, field: &str, declared_type: DeclaredType) {
        let mut classes = self.classes.write();
        classes
            .entry(class)
            .or_default()
            .fields
            .entry(field.to_string())
            .or_default()
            .declared_type = Some(declared_type);
    }

    /// Returns the most specific chain for `field`, walking from `class` up
    /// its ancestry.
    #[must_use]
    pub fn chain_for(&self, class: ClassId, field: &str) -> Option<DeclarationChain> {
        let classes = self.classes.read();
        chain_for(&classes, class, field).cloned()
    }

    /// Returns the most specific declared type for `field`, walking from
    /// `class` up its ancestry.
    #[must_use]
    pub fn declared_type(&self, class: ClassId, field: &str) -> Option<DeclaredType> {
        let classes = self.classes.read();
        ancestry(&classes, class).into_iter().find_map(|ancestor| {
            classes
                .get(&ancestor)?
                .fields
                .get(field)?
                .declared_type
                .clone()
        })
    }

    /// Returns every field annotated on `class` or an ancestor.
    ///
    /// Ancestors' fields come first, in declaration order.
    #[must_use]
    pub fn annotated_fields(&self, class: ClassId) -> Vec<String> {
        let classes = self.classes.read();
        let mut fields = IndexSet::new();
        for ancestor in ancestry(&classes, class).into_iter().rev() {
            let Some(entry) = classes.get(&ancestor) else {
                continue;
            };
            for (name, field) in &entry.fields {
                if field.chain.is_some() {
                    fields.insert(name.clone());
                }
            }
        }
        fields.into_iter().collect()
    }

    /// Returns `class` followed by its ancestors, nearest first.
    #[must_use]
    pub fn ancestry(&self, class: ClassId) -> Vec<ClassId> {
        ancestry(&self.classes.read(), class)
    }
}

fn ancestry(classes: &ClassMap, class: ClassId) -> Vec<ClassId> {
    let mut chain = vec![class];
    let mut current = class;
    while let Some(parent) = classes.get(&current).and_then(|entry| entry.parent) {
        if chain.contains(&parent) {
            tracing::warn!(class = class.name(), parent = parent.name(), "cyclic settings ancestry");
            break;
        }
        chain.push(parent);
        current = parent;
    }
    chain
}

fn chain_for<'a>(classes: &'a ClassMap, class: ClassId, field: &str) -> Option<&'a DeclarationChain> {
    ancestry(classes, class)
        .into_iter()
        .find_map(|ancestor| classes.get(&ancestor)?.fields.get(field)?.chain.as_ref())
}

// ─────────────────────────────────────────────────────────────────────────────
// ClassBuilder
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct PendingField {
    declared_type: DeclaredType,
    overwrite: bool,
    declarations: Vec<SourceDeclaration>,
}

/// Collects a settings type's declarations during
/// [`Settings::declare`], then commits them to the registry in one step.
///
/// Declaring sources for an inherited field places them above the
/// inherited chain; [`FieldBuilder::overwrite`] drops the inherited chain
/// instead.
pub struct ClassBuilder<'r> {
    registry: &'r SettingsRegistry,
    class: ClassId,
    parent: Option<ClassId>,
    fields: IndexMap<String, PendingField>,
}

impl<'r> ClassBuilder<'r> {
    fn new(registry: &'r SettingsRegistry, class: ClassId) -> Self {
        Self {
            registry,
            class,
            parent: None,
            fields: IndexMap::new(),
        }
    }

    /// Returns the type being declared.
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Makes this type extend `P`, registering `P` first if needed.
    pub fn extends<P: Settings>(&mut self) -> &mut Self {
        self.registry.register::<P>();
        self.parent = Some(ClassId::of::<P>());
        self
    }

    /// Starts (or continues) declaring `name`, with its declared type.
    pub fn field(&mut self, name: &str, declared_type: DeclaredType) -> FieldBuilder<'_> {
        let field = self
            .fields
            .entry(name.to_string())
            .and_modify(|field| field.declared_type = declared_type.clone())
            .or_insert_with(|| PendingField {
                declared_type,
                overwrite: false,
                declarations: Vec::new(),
            });
        FieldBuilder { field }
    }

    fn commit(self) {
        let mut classes = self.registry.classes.write();
        if classes.contains_key(&self.class) {
            return;
        }

        let mut fields = IndexMap::with_capacity(self.fields.len());
        for (name, pending) in self.fields {
            let mut chain = DeclarationChain::with_declarations(name.as_str(), pending.declarations);
            if !pending.overwrite
                && let Some(inherited) = self
                    .parent
                    .and_then(|parent| chain_for(&classes, parent, &name))
            {
                chain.extend(inherited);
            }

            fields.insert(
                name,
                FieldEntry {
                    chain: Some(chain),
                    declared_type: Some(pending.declared_type),
                },
            );
        }

        tracing::debug!(
            class = self.class.name(),
            parent = self.parent.map(|parent| parent.name()),
            fields = fields.len(),
            "registered settings type"
        );

        classes.insert(
            self.class,
            ClassEntry {
                parent: self.parent,
                fields,
            },
        );
    }
}

/// Declares the sources of one field. Calls read top to bottom: the first
/// declaration has the highest precedence.
pub struct FieldBuilder<'c> {
    field: &'c mut PendingField,
}

impl FieldBuilder<'_> {
    /// Adds an environment-variable declaration.
    pub fn env(self, name: impl Into<String>) -> Self {
        self.source(SourceDeclaration::env(name))
    }

    /// Adds a transform over the value produced by the declarations after
    /// it.
    pub fn transform<F>(self, func: F) -> Self
    where
        F: Fn(Option<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.source(SourceDeclaration::transform(func))
    }

    /// Adds a nested-settings declaration.
    pub fn nested(self) -> Self {
        self.source(SourceDeclaration::Nested)
    }

    /// Adds a declaration for a custom evaluator.
    pub fn custom(self, kind: impl Into<Cow<'static, str>>, argument: Option<String>) -> Self {
        self.source(SourceDeclaration::custom(kind, argument))
    }

    /// Adds an arbitrary declaration.
    pub fn source(self, declaration: SourceDeclaration) -> Self {
        self.field.declarations.push(declaration);
        self
    }

    /// Discards the inherited chain for this field.
    pub fn overwrite(self) -> Self {
        self.field.overwrite = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Base;
    struct Child;
    struct GrandChild;

    fn env_names(chain: &DeclarationChain) -> Vec<&str> {
        chain
            .iter()
            .filter_map(|declaration| match declaration {
                SourceDeclaration::Env(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    fn hierarchy() -> SettingsRegistry {
        let registry = SettingsRegistry::new();
        registry.declare_class(ClassId::of::<Base>(), None);
        registry.declare_class(ClassId::of::<Child>(), Some(ClassId::of::<Base>()));
        registry.declare_class(ClassId::of::<GrandChild>(), Some(ClassId::of::<Child>()));
        registry
    }

    #[test]
    fn record_appends_in_order() {
        let registry = SettingsRegistry::new();
        let class = ClassId::of::<Base>();
        registry.record(class, "foo", SourceDeclaration::env("FOO_OVERRIDE"));
        registry.record(class, "foo", SourceDeclaration::env("FOO"));

        let chain = registry.chain_for(class, "foo").unwrap();
        assert_eq!(env_names(&chain), ["FOO_OVERRIDE", "FOO"]);
        assert_eq!(registry.annotated_fields(class), ["foo"]);
    }

    #[test]
    fn chain_lookup_walks_ancestry() {
        let registry = hierarchy();
        registry.record(ClassId::of::<Base>(), "x", SourceDeclaration::env("X"));

        let chain = registry.chain_for(ClassId::of::<GrandChild>(), "x").unwrap();
        assert_eq!(env_names(&chain), ["X"]);
        assert!(registry.chain_for(ClassId::of::<GrandChild>(), "y").is_none());
    }

    #[test]
    fn replacement_shadows_ancestors_only_for_that_field() {
        let registry = hierarchy();
        let base = ClassId::of::<Base>();
        let child = ClassId::of::<Child>();
        registry.record(base, "x", SourceDeclaration::env("X"));
        registry.record(base, "y", SourceDeclaration::env("Y"));
        registry.replace(child, "x", []);

        assert!(registry.chain_for(child, "x").unwrap().is_empty());
        assert_eq!(env_names(&registry.chain_for(child, "y").unwrap()), ["Y"]);
        assert_eq!(env_names(&registry.chain_for(base, "x").unwrap()), ["X"]);
        assert!(
            registry
                .chain_for(ClassId::of::<GrandChild>(), "x")
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn annotated_fields_is_union_across_ancestry() {
        let registry = hierarchy();
        registry.record(ClassId::of::<Base>(), "a", SourceDeclaration::env("A"));
        registry.record(ClassId::of::<Child>(), "b", SourceDeclaration::env("B"));
        registry.replace(ClassId::of::<GrandChild>(), "a", []);
        registry.record(ClassId::of::<GrandChild>(), "c", SourceDeclaration::env("C"));

        assert_eq!(
            registry.annotated_fields(ClassId::of::<GrandChild>()),
            ["a", "b", "c"]
        );
        assert_eq!(registry.annotated_fields(ClassId::of::<Base>()), ["a"]);
    }

    #[test]
    fn declared_type_alone_does_not_annotate() {
        let registry = SettingsRegistry::new();
        let class = ClassId::of::<Base>();
        registry.set_declared_type(class, "port", DeclaredType::Number);

        assert!(registry.annotated_fields(class).is_empty());
        assert_eq!(
            registry.declared_type(class, "port"),
            Some(DeclaredType::Number)
        );
    }

    #[test]
    fn ancestry_is_nearest_first() {
        let registry = hierarchy();
        let names: Vec<_> = registry
            .ancestry(ClassId::of::<GrandChild>())
            .into_iter()
            .map(|class| class.name())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names[0].ends_with("GrandChild"));
        assert!(names[2].ends_with("Base"));
    }

    #[test]
    fn cyclic_ancestry_terminates() {
        let registry = SettingsRegistry::new();
        registry.declare_class(ClassId::of::<Base>(), Some(ClassId::of::<Child>()));
        registry.declare_class(ClassId::of::<Child>(), Some(ClassId::of::<Base>()));

        assert_eq!(registry.ancestry(ClassId::of::<Base>()).len(), 2);
    }
}
