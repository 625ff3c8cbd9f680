//! Property tests for declaration-chain precedence.
//!
//! Chains of up to six environment declarations are generated together with
//! a random subset of those variables being set. The resolved value must be
//! the value of the topmost variable that is set, or absent when none is.
//! A transform placed on top of such a chain must see exactly that value.

use std::sync::Arc;

use attune_settings::prelude::*;
use proptest::prelude::*;

/// Marker type the chains are recorded on.
struct Target;

/// Optional value for each of the chain's variables, topmost first.
fn arb_chain() -> impl Strategy<Value = Vec<Option<String>>> {
    prop::collection::vec(prop::option::of("[a-z0-9]{1,8}"), 1..=6usize)
}

fn variable(index: usize) -> String {
    format!("VAR_{index}")
}

fn setup(chain: &[Option<String>], wrap: bool) -> (Resolver, ClassId) {
    let registry = Arc::new(SettingsRegistry::new());
    let class = ClassId::of::<Target>();
    registry.declare_class(class, None);
    registry.set_declared_type(class, "field", DeclaredType::String);
    if wrap {
        registry.record(
            class,
            "field",
            SourceDeclaration::transform(|upstream| match upstream {
                Some(Value::String(s)) => Some(Value::String(format!("<{s}>"))),
                Some(other) => Some(other),
                None => Some(Value::from("<absent>")),
            }),
        );
    }
    for index in 0..chain.len() {
        registry.record(class, "field", SourceDeclaration::env(variable(index)));
    }

    let env: MapEnvironment = chain
        .iter()
        .enumerate()
        .filter_map(|(index, value)| Some((variable(index), value.clone()?)))
        .collect();

    let resolver = Resolver::new().with_registry(registry).with_environment(env);
    (resolver, class)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The topmost set variable wins; an unset chain leaves the field absent.
    #[test]
    fn prop_topmost_defined_declaration_wins(chain in arb_chain()) {
        let (resolver, class) = setup(&chain, false);
        let resolution = resolver.resolve_class(class).expect("resolution");

        let expected = chain.iter().flatten().next().cloned().map(Value::String);
        prop_assert_eq!(resolution.value("field").cloned(), expected);
    }

    /// A transform on top of the chain receives the chain's value, and is
    /// called even when that value is absent.
    #[test]
    fn prop_transform_wraps_chain_result(chain in arb_chain()) {
        let (resolver, class) = setup(&chain, true);
        let resolution = resolver.resolve_class(class).expect("resolution");

        let expected = match chain.iter().flatten().next() {
            Some(value) => format!("<{value}>"),
            None => "<absent>".to_string(),
        };
        prop_assert_eq!(resolution.value("field").cloned(), Some(Value::String(expected)));
    }
}
