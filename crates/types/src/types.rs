//! Core type definitions for entkv.
//!
//! - [`Id`]: fixed-width identifier with an order-preserving byte encoding
//! - [`Entity`]: the `(id, org_id, name, body)` envelope used by every store

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Identifier Types
// ============================================================================

/// Width in bytes of an encoded [`Id`].
pub const ID_LEN: usize = 8;

/// Identifier for an entity or an owning organization.
///
/// Wraps a `u64`. The value `0` means "unset" and is never a valid identifier.
///
/// # Encoding
///
/// [`Id::to_bytes`] produces 8 big-endian bytes, so comparing encoded ids as raw bytes
/// gives the same order as comparing the numbers. Buckets keyed by encoded ids therefore
/// iterate in numeric order.
///
/// # Display
///
/// Formats as 16 lowercase hex digits: `0000000000002328`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id(u64);

impl Id {
    /// The unset identifier.
    pub const UNSET: Self = Self(0);

    /// Creates a new identifier from a raw value.
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw numeric value.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Whether this identifier is set.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Encodes the identifier as 8 big-endian bytes.
    #[inline]
    pub const fn to_bytes(self) -> [u8; ID_LEN] {
        self.0.to_be_bytes()
    }

    /// Decodes an identifier from exactly 8 big-endian bytes.
    ///
    /// Returns `None` if `bytes` is not exactly [`ID_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; ID_LEN] = bytes.try_into().ok()?;
        Some(Self(u64::from_be_bytes(raw)))
    }
}

impl From<u64> for Id {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Id> for u64 {
    #[inline]
    fn from(id: Id) -> Self {
        id.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::str::FromStr for Id {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(Self)
    }
}

// ============================================================================
// Entity
// ============================================================================

/// The canonical in-transit representation of a stored record.
///
/// Lookups set either `id` or `org_id` + `name` and leave `body` empty.
/// Writes additionally carry the `body` that the store serializes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity<B> {
    /// Primary identifier ([`Id::UNSET`] when unknown).
    pub id: Id,
    /// Owning organization ([`Id::UNSET`] when unknown).
    pub org_id: Id,
    /// Display name, unique within an organization. Empty when unknown.
    pub name: String,
    /// Record body; required only for writes.
    pub body: Option<B>,
}

impl<B> Entity<B> {
    /// Creates a fully populated entity ready to be written.
    pub fn new(id: Id, org_id: Id, name: impl Into<String>, body: B) -> Self {
        Self { id, org_id, name: name.into(), body: Some(body) }
    }

    /// Creates a lookup entity carrying only the primary identifier.
    pub fn with_id(id: Id) -> Self {
        Self { id, org_id: Id::UNSET, name: String::new(), body: None }
    }

    /// Creates a lookup entity addressed by organization and name.
    pub fn with_org_name(org_id: Id, name: impl Into<String>) -> Self {
        Self { id: Id::UNSET, org_id, name: name.into(), body: None }
    }

    /// Whether the entity carries any usable lookup key.
    pub fn has_key(&self) -> bool {
        self.id.is_valid() || self.org_id.is_valid() || !self.name.is_empty()
    }

}

impl<B> Default for Entity<B> {
    fn default() -> Self {
        Self { id: Id::UNSET, org_id: Id::UNSET, name: String::new(), body: None }
    }
}
