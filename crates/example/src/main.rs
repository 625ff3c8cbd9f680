//! Example service CLI.
//!
//! Resolves the service's settings from the environment (and `.env`, if
//! present), configures logging from them and reports what it resolved.
//!
//! # Usage
//!
//! ```bash
//! PORT=9000 LOG_FORMAT=compact DATABASE_POOL_SIZE=20 service
//! ```

use example::ServiceSettings;

fn main() {
    let _ = dotenvy::dotenv();

    let settings = match attune::create::<ServiceSettings>() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    settings.init_tracing();

    tracing::info!(
        bind_address = %settings.bind_address,
        log_format = ?settings.log_format,
        access_log = settings.access_log,
        allowed_origins = ?settings.allowed_origins,
        "service configured"
    );
    tracing::info!(
        pool_size = settings.database.pool_size,
        password_set = settings.database.password.is_some(),
        "database configured"
    );
}
