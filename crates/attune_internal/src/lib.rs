//! # Attune Internal Library
//!
//! Re-exports the core attune crates for convenience.

/// Settings declarations, registry and resolution engine.
pub use attune_settings;

/// Resolution entry points over the global registry and process environment.
pub use attune_settings::{create, query};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use attune_settings::prelude::*;
}
