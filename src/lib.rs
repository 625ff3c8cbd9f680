//! Declarative settings resolution for Rust.
//!
//! Settings types declare, field by field, where their values come from.
//! `attune` resolves those declarations against the environment, validates
//! the results and hands back a populated instance.
//!
//! ```
//! use attune::prelude::*;
//!
//! #[derive(Debug, Default, Settings)]
//! struct Server {
//!     #[source(transform = transform::integer)]
//!     #[source(env = "ATTUNE_DOC_PORT")]
//!     port: u16,
//! }
//!
//! let server = attune::create::<Server>().unwrap();
//! assert_eq!(server.port, 0);
//! ```

pub use attune_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use attune_internal::prelude::*;
}
