//! Tests for `#[derive(Settings)]`.

use std::sync::Arc;

use attune_settings::prelude::*;

fn resolver(vars: &[(&str, &str)]) -> Resolver {
    Resolver::new()
        .with_registry(Arc::new(SettingsRegistry::new()))
        .with_environment(MapEnvironment::from_iter(vars.iter().copied()))
}

#[derive(Debug, Default, PartialEq, Settings)]
struct Listener {
    #[source(env = "HOST")]
    host: String,

    #[source(transform = transform::integer)]
    #[source(env = "PORT_OVERRIDE")]
    #[source(env = "PORT")]
    port: u16,

    #[source(transform = transform::boolean)]
    #[source(env = "TLS")]
    tls: bool,

    #[source(env = "CERT")]
    cert: Option<String>,

    #[source(transform = transform::json::<Vec<String>>)]
    #[source(env = "ALLOWED")]
    allowed: Vec<String>,
}

#[derive(Debug, Default, Settings)]
struct Common {
    #[source(env = "LOG")]
    log: String,

    #[source(env = "REGION")]
    region: String,
}

#[derive(Debug, Default, Settings)]
#[settings(extends = Common, on_resolved = Worker::finish)]
struct Worker {
    log: String,

    #[source(env = "WORKER_REGION")]
    #[settings(overwrite)]
    region: String,

    #[source(nested)]
    listener: Listener,

    #[settings(skip)]
    summary: String,
}

impl Worker {
    fn finish(&mut self) {
        self.summary = format!("{}:{}", self.listener.host, self.listener.port);
    }
}

#[derive(Debug, Default, Settings)]
struct Keyed {
    #[source(custom = "static", arg = "abc")]
    key: String,

    #[source(env = "TYPE")]
    r#type: String,
}

struct StaticEvaluator;

impl SourceEvaluator for StaticEvaluator {
    fn evaluate(
        &self,
        _ctx: &EvalContext<'_>,
        declaration: &SourceDeclaration,
        _upstream: Option<Value>,
    ) -> Result<Option<Value>, SettingsError> {
        match declaration {
            SourceDeclaration::Custom { argument, .. } => Ok(argument.clone().map(Value::from)),
            _ => Ok(None),
        }
    }
}

#[test]
fn derive_resolves_every_field_kind() {
    let listener = resolver(&[
        ("HOST", "0.0.0.0"),
        ("PORT", "8080"),
        ("TLS", "on"),
        ("CERT", "/etc/cert.pem"),
        ("ALLOWED", r#"["a.example", "b.example"]"#),
    ])
    .create::<Listener>()
    .unwrap();

    assert_eq!(
        listener,
        Listener {
            host: "0.0.0.0".into(),
            port: 8080,
            tls: true,
            cert: Some("/etc/cert.pem".into()),
            allowed: vec!["a.example".into(), "b.example".into()],
        }
    );
}

#[test]
fn derive_honours_declaration_order() {
    let listener = resolver(&[("PORT", "8080"), ("PORT_OVERRIDE", "9090")])
        .create::<Listener>()
        .unwrap();
    assert_eq!(listener.port, 9090);
}

#[test]
fn derive_keeps_defaults_for_absent_sources() {
    let listener = resolver(&[]).create::<Listener>().unwrap();
    assert_eq!(listener, Listener::default());
}

#[test]
fn derive_registers_declared_types() {
    let registry = Arc::new(SettingsRegistry::new());
    registry.register::<Listener>();
    let class = ClassId::of::<Listener>();

    assert_eq!(
        registry.annotated_fields(class),
        ["host", "port", "tls", "cert", "allowed"]
    );
    assert_eq!(registry.declared_type(class, "port"), Some(DeclaredType::Number));
    assert_eq!(
        registry.declared_type(class, "cert"),
        Some(DeclaredType::optional(DeclaredType::String))
    );
    assert_eq!(registry.chain_for(class, "port").unwrap().len(), 3);
}

#[test]
fn derive_supports_inheritance_nesting_and_hooks() {
    let worker = resolver(&[
        ("LOG", "debug"),
        ("REGION", "eu"),
        ("WORKER_REGION", "us"),
        ("HOST", "worker.local"),
        ("PORT", "7000"),
    ])
    .create::<Worker>()
    .unwrap();

    assert_eq!(worker.log, "debug");
    assert_eq!(worker.region, "us");
    assert_eq!(worker.listener.host, "worker.local");
    assert_eq!(worker.summary, "worker.local:7000");
}

#[test]
fn derive_overwrite_drops_parent_sources() {
    let worker = resolver(&[("REGION", "eu")]).create::<Worker>().unwrap();
    assert_eq!(worker.region, "");
}

#[test]
fn derive_skip_leaves_field_unregistered() {
    let registry = Arc::new(SettingsRegistry::new());
    registry.register::<Worker>();
    let fields = registry.annotated_fields(ClassId::of::<Worker>());

    assert!(fields.iter().all(|field| field != "summary"));
    assert!(fields.iter().any(|field| field == "listener"));
}

#[test]
fn derive_reports_nested_errors_under_outer_field() {
    let errors = resolver(&[("PORT", "eighty"), ("TLS", "maybe")])
        .query::<Worker>()
        .unwrap()
        .into_result()
        .unwrap_err();

    let mut fields = errors.fields();
    fields.sort_unstable();
    assert_eq!(fields, ["listener.port", "listener.tls"]);
}

#[test]
fn derive_custom_declarations_and_raw_identifiers() {
    let keyed = resolver(&[("TYPE", "primary")])
        .with_evaluator("static", StaticEvaluator)
        .create::<Keyed>()
        .unwrap();

    assert_eq!(keyed.key, "abc");
    assert_eq!(keyed.r#type, "primary");
}
