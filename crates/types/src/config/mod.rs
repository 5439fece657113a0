//! Configuration types for entkv.
//!
//! Configuration is usually deserialized from the host application's config files.
//! All config structs validate their values at construction time via fallible
//! builders. Post-deserialization validation is available via the `validate()`
//! method on each struct.

mod store;

use snafu::Snafu;
pub use store::*;

/// Configuration validation error.
///
/// Returned when a configuration value is outside its valid range or
/// violates a cross-field constraint.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}
