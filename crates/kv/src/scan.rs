//! Prefix-bounded cursor iteration in either direction.

use entkv_store::{Cursor, Entry};

/// Iterates the entries of a cursor whose keys start with a prefix.
///
/// Ascending scans seek to the prefix and walk forward. Descending scans seek to
/// the smallest key greater than every prefixed key and step back once. Iteration
/// ends at the first key outside the prefix.
#[derive(Debug)]
pub(crate) struct Scan {
    cursor: Cursor,
    prefix: Vec<u8>,
    descending: bool,
    started: bool,
    done: bool,
}

impl Scan {
    pub(crate) fn new(cursor: Cursor, prefix: &[u8], descending: bool) -> Self {
        Self { cursor, prefix: prefix.to_vec(), descending, started: false, done: false }
    }

    fn position(&mut self) -> Option<Entry> {
        if self.prefix.is_empty() {
            return if self.descending { self.cursor.last() } else { self.cursor.first() };
        }
        if !self.descending {
            return self.cursor.seek(&self.prefix);
        }
        match prefix_successor(&self.prefix) {
            Some(upper) => match self.cursor.seek(&upper) {
                Some(_) => self.cursor.prev_entry(),
                None => self.cursor.last(),
            },
            None => self.cursor.last(),
        }
    }
}

impl Iterator for Scan {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        if self.done {
            return None;
        }
        let entry = if !self.started {
            self.started = true;
            self.position()
        } else if self.descending {
            self.cursor.prev_entry()
        } else {
            self.cursor.next_entry()
        };

        let entry = entry.filter(|(key, _)| key.starts_with(&self.prefix));
        self.done = entry.is_none();
        entry
    }
}

/// Smallest byte string greater than every string starting with `prefix`.
///
/// `None` when the prefix is all `0xFF` bytes, in which case no such bound exists.
pub(crate) fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}
