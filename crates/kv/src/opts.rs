//! Options for bulk reads and bulk deletes.

use crate::error::Result;

/// Predicate over a decoded `(key, value)` pair.
pub type FilterFn<'a, T> = Box<dyn Fn(&[u8], &T) -> bool + 'a>;

/// Side effect run inside the same write transaction after an entry is deleted.
pub type DeleteRelationFn<'a, W, T> = Box<dyn FnMut(&mut W, &[u8], &T) -> Result<()> + 'a>;

/// Options for [`EntStore::find`](crate::EntStore::find).
///
/// Entries are visited in key order (reversed when `descending`), restricted to
/// keys starting with `prefix`. The filter runs before pagination, so `offset`
/// and `limit` count matching entries only. A `limit` of zero means unlimited.
pub struct FindOpts<'a, T> {
    /// Only keys starting with these bytes are visited. Empty visits everything.
    pub prefix: Vec<u8>,
    /// Visit keys from greatest to least.
    pub descending: bool,
    /// Number of matching entries to skip.
    pub offset: usize,
    /// Maximum number of entries to capture; zero is unlimited.
    pub limit: usize,
    /// Entries for which this returns `false` are skipped.
    pub filter: Option<FilterFn<'a, T>>,
}

impl<'a, T> FindOpts<'a, T> {
    /// Options visiting every entry in ascending order.
    pub fn new() -> Self {
        Self { prefix: Vec::new(), descending: false, offset: 0, limit: 0, filter: None }
    }

    /// Restricts the scan to keys starting with `prefix`.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<Vec<u8>>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Visits keys in descending order.
    #[must_use]
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// Skips the first `offset` matching entries.
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Captures at most `limit` entries.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Skips entries for which `filter` returns `false`.
    #[must_use]
    pub fn filter(mut self, filter: impl Fn(&[u8], &T) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub(crate) fn admits(&self, key: &[u8], value: &T) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(key, value))
    }
}

impl<T> Default for FindOpts<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for [`EntStore::delete`](crate::EntStore::delete).
///
/// The filter is mandatory: there is no way to delete without stating which
/// entries should go. Use [`DeleteOpts::all`] to clear a bucket.
pub struct DeleteOpts<'a, W: ?Sized, T> {
    /// Entries for which this returns `true` are deleted.
    pub filter: FilterFn<'a, T>,
    /// Run in order for every deleted entry.
    pub relations: Vec<DeleteRelationFn<'a, W, T>>,
}

impl<'a, W: ?Sized, T> DeleteOpts<'a, W, T> {
    /// Deletes entries matching `filter`.
    pub fn new(filter: impl Fn(&[u8], &T) -> bool + 'a) -> Self {
        Self { filter: Box::new(filter), relations: Vec::new() }
    }

    /// Deletes every entry.
    pub fn all() -> Self {
        Self::new(|_, _| true)
    }

    /// Adds a relation run after each deleted entry.
    #[must_use]
    pub fn relation(
        mut self,
        relation: impl FnMut(&mut W, &[u8], &T) -> Result<()> + 'a,
    ) -> Self {
        self.relations.push(Box::new(relation));
        self
    }
}

/// Applies offset and limit to a stream of matching entries.
#[derive(Debug)]
pub(crate) struct Paginator {
    offset: usize,
    limit: usize,
    skipped: usize,
    taken: usize,
}

impl Paginator {
    pub(crate) fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit, skipped: 0, taken: 0 }
    }

    /// Records one matching entry, returning whether it should be captured.
    pub(crate) fn admit(&mut self) -> bool {
        if self.skipped < self.offset {
            self.skipped += 1;
            return false;
        }
        self.taken += 1;
        true
    }

    pub(crate) fn is_full(&self) -> bool {
        self.limit > 0 && self.taken >= self.limit
    }
}
