//! Error types for the bucket engine.

use snafu::Snafu;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during engine operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The named bucket has not been created.
    #[snafu(display("Bucket not found: {name}"))]
    BucketNotFound {
        /// The missing bucket name (lossy UTF-8).
        name: String,
    },

    /// Bucket names must be non-empty.
    #[snafu(display("Bucket name required"))]
    BucketNameRequired,

    /// Keys must be non-empty.
    #[snafu(display("Key required"))]
    KeyRequired,

    /// Key exceeds the configured maximum size.
    #[snafu(display("Key too large: {size} bytes (max {max})"))]
    KeyTooLarge {
        /// Actual size of the key in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },

    /// Value exceeds the configured maximum size.
    #[snafu(display("Value too large: {size} bytes (max {max})"))]
    ValueTooLarge {
        /// Actual size of the value in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },

    /// Internal lock was poisoned (another thread panicked while holding it).
    #[snafu(display("Internal lock poisoned"))]
    Poisoned,
}

impl Error {
    pub(crate) fn bucket_not_found(name: &[u8]) -> Self {
        Self::BucketNotFound { name: String::from_utf8_lossy(name).into_owned() }
    }
}
