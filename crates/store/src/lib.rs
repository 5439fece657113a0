//! entkv-store: an in-memory transactional bucket engine.
//!
//! The engine exposes named, ordered byte-keyed buckets inside atomic read or
//! read-write transactions, which is everything the entity stores in `entkv` need:
//!
//! - **Named buckets**: created on demand inside a write transaction
//! - **Single writer**: one write transaction at a time, readers never block
//! - **Snapshot reads**: a read transaction sees the state committed when it began
//! - **Atomic commits**: all buckets touched by a write transaction publish together
//! - **Stable cursors**: cursors iterate a snapshot, so deleting while scanning is safe
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          ReadTxn / WriteTxn traits          │
//! │    (get, put, delete, cursor, buckets)      │
//! └────────────────┬────────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────────┐
//! │             Transaction Layer               │
//! │  (ReadTransaction: snapshot,                │
//! │   WriteTransaction: COW buckets + commit)   │
//! └────────────────┬────────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────────┐
//! │              Committed State                │
//! │   (ArcSwap of bucket name → ordered map)    │
//! └─────────────────────────────────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cursor;
pub mod db;
pub mod error;
pub mod txn;

// Re-export commonly used types
pub use cursor::{Cursor, Entry};
pub use db::{
    DEFAULT_MAX_KEY_SIZE, DEFAULT_MAX_VALUE_SIZE, Database, DatabaseConfig, DatabaseStats,
    ReadTransaction, WriteTransaction,
};
pub use error::{Error, Result};
pub use txn::{ReadTxn, WriteTxn};
