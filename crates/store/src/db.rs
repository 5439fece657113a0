//! Database and transaction management for entkv-store.
//!
//! Provides atomic transactions over any number of named buckets. Uses a
//! single-writer model: one [`WriteTransaction`] at a time, any number of
//! concurrent [`ReadTransaction`]s.
//!
//! # Example
//!
//! ```no_run
//! use entkv_store::{Database, ReadTxn, WriteTxn};
//!
//! let db = Database::open_in_memory();
//!
//! // Write transaction
//! {
//!     let mut txn = db.write()?;
//!     txn.create_bucket_if_not_exists(b"dashboards")?;
//!     txn.put(b"dashboards", b"key", b"value")?;
//!     txn.commit();
//! }
//!
//! // Read transaction
//! {
//!     let txn = db.read();
//!     let value = txn.get(b"dashboards", b"key")?;
//! }
//! # Ok::<(), entkv_store::Error>(())
//! ```

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use arc_swap::ArcSwap;
use tracing::Span;

use crate::{
    cursor::Cursor,
    error::{Error, Result},
    txn::{ReadTxn, WriteTxn},
};

/// Default maximum key size: 32 KiB.
pub const DEFAULT_MAX_KEY_SIZE: usize = 32 * 1024;

/// Default maximum value size: 1 MiB.
pub const DEFAULT_MAX_VALUE_SIZE: usize = 1024 * 1024;

/// Contents of one bucket, ordered by key bytes.
pub(crate) type BucketData = BTreeMap<Vec<u8>, Vec<u8>>;

type Buckets = HashMap<Vec<u8>, Arc<BucketData>>;

/// Database configuration options.
#[derive(Debug, Clone, bon::Builder)]
pub struct DatabaseConfig {
    /// Largest accepted key in bytes.
    #[builder(default = DEFAULT_MAX_KEY_SIZE)]
    pub max_key_size: usize,
    /// Largest accepted value in bytes.
    #[builder(default = DEFAULT_MAX_VALUE_SIZE)]
    pub max_value_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { max_key_size: DEFAULT_MAX_KEY_SIZE, max_value_size: DEFAULT_MAX_VALUE_SIZE }
    }
}

/// Committed view of every bucket. Readers capture it, writers replace it.
#[derive(Debug, Default)]
struct CommittedState {
    buckets: Buckets,
    version: u64,
}

/// The main database handle.
///
/// Thread-safe with interior mutability. Supports concurrent reads
/// and exclusive writes (single-writer model).
///
/// # Transaction Isolation (Copy-on-Write)
///
/// - Read transactions capture the committed state at start (no locks held)
/// - Write transactions clone bucket handles and copy a bucket on its first write
/// - Commit atomically swaps in the new state, making every bucket's changes visible at
///   once
///
/// Readers never block writers and writers don't block readers.
pub struct Database {
    /// Current committed state (atomically swapped on commit).
    committed: ArcSwap<CommittedState>,
    /// Configuration.
    config: DatabaseConfig,
    /// Ensures only one write transaction at a time.
    write_lock: Mutex<()>,
    commits: AtomicU64,
    aborts: AtomicU64,
}

impl Database {
    /// Creates an empty in-memory database with default limits.
    pub fn open_in_memory() -> Self {
        Self::open_in_memory_with_config(DatabaseConfig::default())
    }

    /// Creates an empty in-memory database with the given limits.
    pub fn open_in_memory_with_config(config: DatabaseConfig) -> Self {
        Self {
            committed: ArcSwap::from_pointee(CommittedState::default()),
            config,
            write_lock: Mutex::new(()),
            commits: AtomicU64::new(0),
            aborts: AtomicU64::new(0),
        }
    }

    /// Begins a read-only transaction over the latest committed state.
    pub fn read(&self) -> ReadTransaction {
        let snapshot = self.committed.load_full();
        let span = tracing::debug_span!("entkv.txn", kind = "read", version = snapshot.version);
        ReadTransaction { snapshot, span }
    }

    /// Begins a write transaction.
    ///
    /// Blocks until any other write transaction finishes. Read transactions run
    /// concurrently and do not observe uncommitted changes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Poisoned`] if the write lock is poisoned.
    pub fn write(&self) -> Result<WriteTransaction<'_>> {
        let write_guard = self.write_lock.lock().map_err(|_| Error::Poisoned)?;
        let current = self.committed.load_full();
        let span = tracing::debug_span!("entkv.txn", kind = "write", version = current.version);

        Ok(WriteTransaction {
            db: self,
            buckets: current.buckets.clone(),
            base_version: current.version,
            finished: false,
            span,
            _write_guard: write_guard,
        })
    }

    /// Runs `f` inside a read-only transaction.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns.
    pub fn view<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&ReadTransaction) -> std::result::Result<T, E>,
    {
        let txn = self.read();
        f(&txn)
    }

    /// Runs `f` inside a write transaction, committing if it returns `Ok` and
    /// discarding every change if it returns `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Poisoned`] (converted into `E`) if the write lock is poisoned,
    /// otherwise whatever `f` returns.
    pub fn update<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        E: From<Error>,
        F: FnOnce(&mut WriteTransaction<'_>) -> std::result::Result<T, E>,
    {
        let mut txn = self.write()?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit();
                Ok(value)
            },
            Err(err) => {
                txn.abort();
                Err(err)
            },
        }
    }

    /// Returns database statistics.
    pub fn stats(&self) -> DatabaseStats {
        let state = self.committed.load();
        DatabaseStats {
            version: state.version,
            buckets: state.buckets.len(),
            keys: state.buckets.values().map(|b| b.len()).sum(),
            commits: self.commits.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
        }
    }

    fn check_entry(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::KeyRequired);
        }
        if key.len() > self.config.max_key_size {
            return Err(Error::KeyTooLarge { size: key.len(), max: self.config.max_key_size });
        }
        if value.len() > self.config.max_value_size {
            return Err(Error::ValueTooLarge {
                size: value.len(),
                max: self.config.max_value_size,
            });
        }
        Ok(())
    }
}

/// Database statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Number of commits applied to the committed state.
    pub version: u64,
    /// Buckets in the committed state.
    pub buckets: usize,
    /// Keys across all committed buckets.
    pub keys: usize,
    /// Successful write transaction commits.
    pub commits: u64,
    /// Write transactions aborted or dropped without commit.
    pub aborts: u64,
}

/// A read-only transaction.
///
/// Holds the committed state captured at creation; later commits are not visible.
pub struct ReadTransaction {
    snapshot: Arc<CommittedState>,
    span: Span,
}

impl ReadTransaction {
    /// Committed version this transaction reads from.
    pub fn version(&self) -> u64 {
        self.snapshot.version
    }
}

impl ReadTxn for ReadTransaction {
    fn span(&self) -> &Span {
        &self.span
    }

    fn bucket_exists(&self, bucket: &[u8]) -> bool {
        self.snapshot.buckets.contains_key(bucket)
    }

    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>> {
        let data =
            self.snapshot.buckets.get(bucket).ok_or_else(|| Error::bucket_not_found(bucket))?;
        Ok(data.get(key).cloned())
    }

    fn cursor(&self, bucket: &[u8]) -> Result<Cursor> {
        let data =
            self.snapshot.buckets.get(bucket).ok_or_else(|| Error::bucket_not_found(bucket))?;
        Ok(Cursor::new(Arc::clone(data)))
    }
}

/// A write transaction.
///
/// Changes are buffered until [`commit`](Self::commit) and become visible to new
/// read transactions atomically, across every bucket touched.
///
/// **Drop behavior:** a `WriteTransaction` dropped without `commit()` discards all of
/// its changes; the committed state is left untouched.
pub struct WriteTransaction<'db> {
    db: &'db Database,
    /// Bucket handles; a bucket is copied the first time it is written.
    buckets: Buckets,
    base_version: u64,
    finished: bool,
    span: Span,
    /// Guard to ensure only one write transaction at a time.
    _write_guard: MutexGuard<'db, ()>,
}

impl WriteTransaction<'_> {
    /// Atomically publishes every change made in this transaction.
    pub fn commit(mut self) {
        let version = self.base_version + 1;
        let buckets = std::mem::take(&mut self.buckets);
        self.db.committed.store(Arc::new(CommittedState { buckets, version }));
        self.db.commits.fetch_add(1, Ordering::Relaxed);
        self.finished = true;
        tracing::trace!(parent: &self.span, version, "write transaction committed");
    }

    /// Discards every change made in this transaction.
    pub fn abort(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        if !self.finished {
            self.finished = true;
            self.buckets.clear();
            self.db.aborts.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(parent: &self.span, "write transaction discarded");
        }
    }

    fn bucket_mut(&mut self, bucket: &[u8]) -> Result<&mut BucketData> {
        let data = self.buckets.get_mut(bucket).ok_or_else(|| Error::bucket_not_found(bucket))?;
        Ok(Arc::make_mut(data))
    }
}

impl Drop for WriteTransaction<'_> {
    fn drop(&mut self) {
        self.discard();
    }
}

impl ReadTxn for WriteTransaction<'_> {
    fn span(&self) -> &Span {
        &self.span
    }

    fn bucket_exists(&self, bucket: &[u8]) -> bool {
        self.buckets.contains_key(bucket)
    }

    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>> {
        let data = self.buckets.get(bucket).ok_or_else(|| Error::bucket_not_found(bucket))?;
        Ok(data.get(key).cloned())
    }

    fn cursor(&self, bucket: &[u8]) -> Result<Cursor> {
        let data = self.buckets.get(bucket).ok_or_else(|| Error::bucket_not_found(bucket))?;
        Ok(Cursor::new(Arc::clone(data)))
    }
}

impl WriteTxn for WriteTransaction<'_> {
    fn create_bucket_if_not_exists(&mut self, bucket: &[u8]) -> Result<()> {
        if bucket.is_empty() {
            return Err(Error::BucketNameRequired);
        }
        self.buckets.entry(bucket.to_vec()).or_default();
        Ok(())
    }

    fn put(&mut self, bucket: &[u8], key: &[u8], value: &[u8]) -> Result<()> {
        self.db.check_entry(key, value)?;
        self.bucket_mut(bucket)?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, bucket: &[u8], key: &[u8]) -> Result<bool> {
        let data = self.buckets.get(bucket).ok_or_else(|| Error::bucket_not_found(bucket))?;
        // Leave the bucket shared when there is nothing to remove.
        if !data.contains_key(key) {
            return Ok(false);
        }
        Ok(self.bucket_mut(bucket)?.remove(key).is_some())
    }
}
