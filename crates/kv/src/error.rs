//! Error types for entity store operations.
//!
//! Every [`KvError`] maps to an [`ErrorCode`] so callers can branch on "nothing
//! there" versus "malformed request" versus "the store is broken" without matching
//! on individual variants.

use core::fmt;

use entkv_types::{CodecError, Id};
use snafu::{IntoError, Location, Snafu};

/// Result type for entity store operations.
pub type Result<T, E = KvError> = std::result::Result<T, E>;

/// Machine-readable error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The requested key is absent.
    NotFound,
    /// The request was malformed or carried an insufficient key.
    Invalid,
    /// The write would violate a uniqueness constraint.
    Conflict,
    /// Serialization, decoding or storage failure.
    Internal,
}

impl ErrorCode {
    /// Returns the stable string form of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::Invalid => "invalid",
            Self::Conflict => "conflict",
            Self::Internal => "internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a caller-supplied key or body encoder.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EncodeError {
    /// A field the encoder needs is unset.
    #[snafu(display("{field} is required"))]
    Missing {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field could not be serialized.
    #[snafu(display("{field} could not be serialized: {source}"))]
    Serialize {
        /// Name of the field being serialized.
        field: &'static str,
        /// The underlying codec error.
        source: CodecError,
    },
}

impl EncodeError {
    /// Name of the field the encoder failed on.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Missing { field } | Self::Serialize { field, .. } => field,
        }
    }
}

/// Errors returned by entity store operations.
///
/// # Recovery Guide
///
/// | Variant                 | Code     | Recovery Action                                     |
/// | ----------------------- | -------- | --------------------------------------------------- |
/// | `NotFound`              | NotFound | Expected for first reads; create the entity first   |
/// | `MissingKey`            | Invalid  | Provide an id, or an organization and a name        |
/// | `InvalidKey`            | Invalid  | Fix the named field and resubmit                    |
/// | `Conflict`              | Conflict | Pick another name or update the owning entity       |
/// | `Encoding`              | Internal | Body type cannot be serialized; report as a bug     |
/// | `Decode`                | Internal | Stored bytes are corrupt or of an older schema      |
/// | `UnexpectedDecodeValue` | Internal | Index bytes are corrupt; rebuild the index          |
/// | `Storage`               | Internal | Inspect the engine error                            |
/// | `Callback`              | Internal | Inspect the message raised by the caller's callback |
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum KvError {
    /// No entry exists for the requested key.
    #[snafu(display("{resource} not found"))]
    NotFound {
        /// Resource the lookup was made against.
        resource: String,
    },

    /// The lookup entity carried neither an id nor an organization/name pair.
    #[snafu(display("no key was provided for {resource}"))]
    MissingKey {
        /// Resource the lookup was made against.
        resource: String,
    },

    /// A key or required field could not be encoded.
    #[snafu(display("provided {resource} {field} is invalid: {source}"))]
    InvalidKey {
        /// Resource being encoded.
        resource: String,
        /// Field the encoder rejected.
        field: &'static str,
        /// The encoder's failure.
        source: EncodeError,
    },

    /// The organization/name pair is already indexed to another entity.
    #[snafu(display("{resource} with name {name:?} already exists in organization {org_id}"))]
    Conflict {
        /// Resource being written.
        resource: String,
        /// Organization owning the name.
        org_id: Id,
        /// Name already in use.
        name: String,
        /// Entity currently holding the name.
        existing: Id,
    },

    /// The entity body could not be serialized.
    #[snafu(display("failed to encode {resource} body at {location}: {source}"))]
    Encoding {
        /// Resource being encoded.
        resource: String,
        /// The encoder's failure.
        source: EncodeError,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Stored bytes could not be deserialized.
    #[snafu(display("failed to decode {resource} at {location}: {source}"))]
    Decode {
        /// Resource being decoded.
        resource: String,
        /// The underlying codec error.
        source: CodecError,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// A decoded value did not have the shape the store expected.
    #[snafu(display("unexpected decode value for {resource}: expected {expected}"))]
    UnexpectedDecodeValue {
        /// Resource being decoded.
        resource: String,
        /// Description of the expected value.
        expected: &'static str,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// The underlying engine failed.
    #[snafu(display("storage error at {location}: {source}"))]
    Storage {
        /// The engine error.
        source: entkv_store::Error,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// A capture, filter or relation callback aborted the operation.
    #[snafu(display("{message}"))]
    Callback {
        /// Message supplied by the callback.
        message: String,
    },
}

impl From<entkv_store::Error> for KvError {
    #[track_caller]
    fn from(source: entkv_store::Error) -> Self {
        StorageSnafu.into_error(source)
    }
}

impl KvError {
    /// Returns the machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::MissingKey { .. } | Self::InvalidKey { .. } => ErrorCode::Invalid,
            Self::Conflict { .. } => ErrorCode::Conflict,
            Self::Encoding { .. }
            | Self::Decode { .. }
            | Self::UnexpectedDecodeValue { .. }
            | Self::Storage { .. }
            | Self::Callback { .. } => ErrorCode::Internal,
        }
    }

    /// Whether the error means the requested entry does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.code(), ErrorCode::NotFound)
    }

    /// Whether the error means the request itself was malformed.
    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        matches!(self.code(), ErrorCode::Invalid)
    }

    /// Wraps a caller-side failure raised from inside a callback.
    pub fn callback(message: impl fmt::Display) -> Self {
        Self::Callback { message: message.to_string() }
    }
}
