//! Example service configured with attune.
//!
//! Settings are split the way a real deployment usually splits them:
//!
//! ```text
//! BaseSettings            LOG_FILTER / RUST_LOG, LOG_FORMAT
//!   └── ServiceSettings   SERVICE_LOG_FILTER, HOST, PORT, ALLOWED_ORIGINS
//!         └── database    DATABASE_URL, DATABASE_POOL_SIZE   (nested)
//! ```
//!
//! `ServiceSettings` inherits the logging sources of `BaseSettings` and
//! layers a service-specific filter on top. Its bind address is derived
//! once every field has been resolved.

use attune::prelude::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Output format of the log subscriber.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-oriented output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

instance_value!(LogFormat);

impl LogFormat {
    /// Transform parsing `pretty`, `compact` or `json`.
    pub fn parse(upstream: Option<Value>) -> Option<Value> {
        let name = upstream?.as_str()?.trim().to_ascii_lowercase();
        let format = match name.as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            "json" => Self::Json,
            _ => return None,
        };
        Some(Value::instance(format))
    }
}

/// Settings shared by every service.
#[derive(Debug, Settings)]
pub struct BaseSettings {
    /// Log filter directives.
    #[source(env = "LOG_FILTER")]
    #[source(env = "RUST_LOG")]
    pub log_filter: String,

    /// Log output format.
    #[source(transform = LogFormat::parse)]
    #[source(env = "LOG_FORMAT")]
    pub log_format: LogFormat,
}

impl Default for BaseSettings {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

/// Connection settings for the service's database.
#[derive(Debug, Settings)]
pub struct DatabaseSettings {
    /// Connection string.
    #[source(transform = transform::trim)]
    #[source(env = "DATABASE_URL")]
    pub url: String,

    /// Maximum number of pooled connections.
    #[source(transform = transform::integer)]
    #[source(env = "DATABASE_POOL_SIZE")]
    pub pool_size: u32,

    /// Password, if the connection string does not carry one.
    #[source(env = "DATABASE_PASSWORD")]
    pub password: Option<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/service".to_string(),
            pool_size: 5,
            password: None,
        }
    }
}

/// Settings of the example service.
#[derive(Debug, Settings)]
#[settings(extends = BaseSettings, on_resolved = ServiceSettings::derive_bind_address)]
pub struct ServiceSettings {
    /// Log filter directives; `SERVICE_LOG_FILTER` wins over the inherited
    /// sources.
    #[source(env = "SERVICE_LOG_FILTER")]
    pub log_filter: String,

    /// Log output format, inherited unchanged.
    pub log_format: LogFormat,

    /// Interface to listen on.
    #[source(env = "HOST")]
    pub host: String,

    /// Port to listen on.
    #[source(transform = transform::integer)]
    #[source(env = "PORT")]
    pub port: u16,

    /// Origins allowed to call the service, as a JSON array.
    #[source(transform = transform::json::<Vec<String>>)]
    #[source(env = "ALLOWED_ORIGINS")]
    pub allowed_origins: Vec<String>,

    /// Whether requests are logged individually.
    #[source(transform = transform::boolean)]
    #[source(env = "ACCESS_LOG")]
    pub access_log: bool,

    /// Database connection.
    #[source(nested)]
    pub database: DatabaseSettings,

    /// `host:port`, set once resolution completes.
    #[settings(skip)]
    pub bind_address: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        let base = BaseSettings::default();
        Self {
            log_filter: base.log_filter,
            log_format: base.log_format,
            host: "127.0.0.1".to_string(),
            port: 8080,
            allowed_origins: Vec::new(),
            access_log: false,
            database: DatabaseSettings::default(),
            bind_address: String::new(),
        }
    }
}

impl ServiceSettings {
    fn derive_bind_address(&mut self) {
        self.bind_address = format!("{}:{}", self.host, self.port);
    }

    /// Installs a global `tracing` subscriber configured from these
    /// settings.
    ///
    /// An invalid filter falls back to `info`. Does nothing if a subscriber
    /// is already installed.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_new(&self.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

        match self.log_format {
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().pretty())
                    .try_init()
                    .ok();
            }
            LogFormat::Compact => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().compact())
                    .try_init()
                    .ok();
            }
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().json())
                    .try_init()
                    .ok();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn resolver(vars: &[(&str, &str)]) -> Resolver {
        Resolver::new()
            .with_registry(Arc::new(SettingsRegistry::new()))
            .with_environment(MapEnvironment::from_iter(vars.iter().copied()))
    }

    #[test]
    fn defaults_apply_without_environment() {
        let settings = resolver(&[]).create::<ServiceSettings>().unwrap();

        assert_eq!(settings.log_filter, "info");
        assert_eq!(settings.bind_address, "127.0.0.1:8080");
        assert_eq!(settings.database.pool_size, 5);
        assert!(settings.database.password.is_none());
    }

    #[test]
    fn service_filter_layers_over_inherited_sources() {
        let settings = resolver(&[("RUST_LOG", "warn"), ("LOG_FILTER", "debug")])
            .create::<ServiceSettings>()
            .unwrap();
        assert_eq!(settings.log_filter, "debug");

        let settings = resolver(&[("RUST_LOG", "warn"), ("SERVICE_LOG_FILTER", "trace")])
            .create::<ServiceSettings>()
            .unwrap();
        assert_eq!(settings.log_filter, "trace");
    }

    #[test]
    fn resolves_full_configuration() {
        let settings = resolver(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("LOG_FORMAT", "JSON"),
            ("ALLOWED_ORIGINS", r#"["https://app.example"]"#),
            ("ACCESS_LOG", "yes"),
            ("DATABASE_URL", " postgres://db/service "),
            ("DATABASE_POOL_SIZE", "20"),
            ("DATABASE_PASSWORD", "hunter2"),
        ])
        .create::<ServiceSettings>()
        .unwrap();

        assert_eq!(settings.bind_address, "0.0.0.0:9000");
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.allowed_origins, ["https://app.example"]);
        assert!(settings.access_log);
        assert_eq!(settings.database.url, "postgres://db/service");
        assert_eq!(settings.database.pool_size, 20);
        assert_eq!(settings.database.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn reports_every_invalid_field() {
        let err = resolver(&[
            ("PORT", "http"),
            ("LOG_FORMAT", "xml"),
            ("DATABASE_POOL_SIZE", "many"),
        ])
        .create::<ServiceSettings>()
        .unwrap_err();

        let mut fields = err.validation_errors().unwrap().fields();
        fields.sort_unstable();
        assert_eq!(fields, ["database.pool_size", "log_format", "port"]);
    }
}
