//! Ordered cursor over a single bucket.
//!
//! A cursor owns a snapshot of its bucket taken when it was opened. Writes made
//! through the transaction afterwards (including deletes of the entry under the
//! cursor) copy the bucket instead of mutating the snapshot, so iteration stays
//! stable while the caller mutates.

use std::{ops::Bound, sync::Arc};

use crate::db::BucketData;

/// A `(key, value)` pair yielded by a [`Cursor`].
pub type Entry = (Vec<u8>, Vec<u8>);

/// Bidirectional cursor over the keys of one bucket in lexicographic order.
#[derive(Debug, Clone)]
pub struct Cursor {
    data: Arc<BucketData>,
    /// Key the cursor is positioned on; `None` before positioning or once exhausted.
    position: Option<Vec<u8>>,
}

impl Cursor {
    pub(crate) fn new(data: Arc<BucketData>) -> Self {
        Self { data, position: None }
    }

    /// Moves to the first entry.
    pub fn first(&mut self) -> Option<Entry> {
        let entry = self.data.iter().next().map(clone_entry);
        self.track(entry)
    }

    /// Moves to the last entry.
    pub fn last(&mut self) -> Option<Entry> {
        let entry = self.data.iter().next_back().map(clone_entry);
        self.track(entry)
    }

    /// Moves to the first entry whose key is greater than or equal to `key`.
    pub fn seek(&mut self, key: &[u8]) -> Option<Entry> {
        let entry = self
            .data
            .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
            .next()
            .map(clone_entry);
        self.track(entry)
    }

    /// Moves to the entry after the current one.
    ///
    /// Returns `None` if the cursor is unpositioned or already past the end.
    pub fn next_entry(&mut self) -> Option<Entry> {
        let position = self.position.as_deref()?;
        let entry = self
            .data
            .range::<[u8], _>((Bound::Excluded(position), Bound::Unbounded))
            .next()
            .map(clone_entry);
        self.track(entry)
    }

    /// Moves to the entry before the current one.
    ///
    /// Returns `None` if the cursor is unpositioned or already before the start.
    pub fn prev_entry(&mut self) -> Option<Entry> {
        let position = self.position.as_deref()?;
        let entry = self
            .data
            .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(position)))
            .next_back()
            .map(clone_entry);
        self.track(entry)
    }

    fn track(&mut self, entry: Option<Entry>) -> Option<Entry> {
        self.position = entry.as_ref().map(|(key, _)| key.clone());
        entry
    }
}

fn clone_entry((key, value): (&Vec<u8>, &Vec<u8>)) -> Entry {
    (key.clone(), value.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn cursor(keys: &[&[u8]]) -> Cursor {
        let data: BucketData = keys.iter().map(|k| (k.to_vec(), k.to_vec())).collect();
        Cursor::new(Arc::new(data))
    }

    fn key(entry: Option<Entry>) -> Option<Vec<u8>> {
        entry.map(|(k, _)| k)
    }

    #[test]
    fn test_forward_iteration() {
        let mut cur = cursor(&[b"b", b"a", b"c"]);
        assert_eq!(key(cur.first()), Some(b"a".to_vec()));
        assert_eq!(key(cur.next_entry()), Some(b"b".to_vec()));
        assert_eq!(key(cur.next_entry()), Some(b"c".to_vec()));
        assert_eq!(key(cur.next_entry()), None);
        // Exhausted cursors stay exhausted.
        assert_eq!(key(cur.next_entry()), None);
    }

    #[test]
    fn test_reverse_iteration() {
        let mut cur = cursor(&[b"a", b"b", b"c"]);
        assert_eq!(key(cur.last()), Some(b"c".to_vec()));
        assert_eq!(key(cur.prev_entry()), Some(b"b".to_vec()));
        assert_eq!(key(cur.prev_entry()), Some(b"a".to_vec()));
        assert_eq!(key(cur.prev_entry()), None);
    }

    #[test]
    fn test_seek_lands_on_next_greater_key() {
        let mut cur = cursor(&[b"aa", b"ab", b"ba"]);
        assert_eq!(key(cur.seek(b"ab")), Some(b"ab".to_vec()));
        assert_eq!(key(cur.seek(b"b")), Some(b"ba".to_vec()));
        assert_eq!(key(cur.seek(b"c")), None);
    }

    #[test]
    fn test_unpositioned_cursor_yields_nothing() {
        let mut cur = cursor(&[b"a"]);
        assert_eq!(key(cur.next_entry()), None);
        assert_eq!(key(cur.prev_entry()), None);
    }

    #[test]
    fn test_empty_bucket() {
        let mut cur = cursor(&[]);
        assert_eq!(key(cur.first()), None);
        assert_eq!(key(cur.last()), None);
    }
}
