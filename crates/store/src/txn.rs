//! Transaction traits consumed by the entity stores.
//!
//! Read-only operations accept any [`ReadTxn`]; mutations require a [`WriteTxn`].
//! A write transaction is also a read transaction, so lookups performed while
//! coordinating a write happen in the same transaction as the write.

use tracing::Span;

use crate::{cursor::Cursor, error::Result};

/// Read access to named buckets within one transaction.
pub trait ReadTxn {
    /// Tracing span covering the lifetime of this transaction.
    ///
    /// Store operations open their own spans as children of this one.
    fn span(&self) -> &Span;

    /// Whether the bucket exists in this transaction's view.
    fn bucket_exists(&self, bucket: &[u8]) -> bool;

    /// Returns the value stored at `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BucketNotFound`](crate::Error::BucketNotFound) if the bucket
    /// does not exist.
    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Opens an ordered cursor over the bucket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BucketNotFound`](crate::Error::BucketNotFound) if the bucket
    /// does not exist.
    fn cursor(&self, bucket: &[u8]) -> Result<Cursor>;
}

/// Read-write access to named buckets within one transaction.
pub trait WriteTxn: ReadTxn {
    /// Creates the bucket unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BucketNameRequired`](crate::Error::BucketNameRequired) for an
    /// empty name.
    fn create_bucket_if_not_exists(&mut self, bucket: &[u8]) -> Result<()>;

    /// Inserts or overwrites a key-value pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket does not exist or the key/value violates the
    /// configured size limits.
    fn put(&mut self, bucket: &[u8], key: &[u8], value: &[u8]) -> Result<()>;

    /// Deletes a key, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BucketNotFound`](crate::Error::BucketNotFound) if the bucket
    /// does not exist.
    fn delete(&mut self, bucket: &[u8], key: &[u8]) -> Result<bool>;
}
