//! The ordered key-value backend boundary.
//!
//! Any store satisfying these semantics can hold the entry space:
//!
//! - keys are opaque byte strings iterated in ascending byte order;
//! - prefix and range scans are forward-only, single-pass pull iterators;
//! - writes are batched through a [`BatchWriter`] and observable only after a
//!   successful close;
//! - a [`Snapshot`] is a closeable point-in-time view usable as a scan
//!   option.
//!
//! All three resource kinds release on drop; dropping an unclosed writer
//! discards whatever the backend has not already persisted.

use std::any::Any;
use std::sync::Arc;

use crate::error::StoreResult;

/// A key together with its value, as stored.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// A forward-only scan over key-value pairs in ascending key order.
///
/// Dropping the iterator releases its backend resources.
pub type ScanIter<'a> = Box<dyn Iterator<Item = StoreResult<KeyValue>> + Send + 'a>;

/// A half-open key range `[start, end)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
}

impl KeyRange {
    /// Create a range from its bounds.
    pub fn new(start: Vec<u8>, end: Vec<u8>) -> Self {
        Self { start, end }
    }

    /// Returns `true` if the range selects no keys.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A consistent point-in-time view of a backend.
///
/// A snapshot holds backend resources until dropped. Iterators opened under a
/// snapshot observe only writes committed before it was taken.
pub trait Snapshot: Send + Sync {
    /// Downcasting hook so a backend can recognize its own snapshots. A
    /// snapshot passed to a backend that did not create it is a `Backend`
    /// error.
    fn as_any(&self) -> &dyn Any;
}

/// Options altering the behavior of a scan.
#[derive(Clone, Copy, Default)]
pub struct ScanOptions<'a> {
    /// Hint that the scan will visit many entries; an implementation may
    /// disable read-ahead caching for the iterator.
    pub large_read: bool,

    /// Read as of this snapshot instead of the live state.
    pub snapshot: Option<&'a dyn Snapshot>,
}

impl<'a> ScanOptions<'a> {
    /// Options for a bulk scan, optionally pinned to a snapshot.
    pub fn large(snapshot: Option<&'a dyn Snapshot>) -> Self {
        Self {
            large_read: true,
            snapshot,
        }
    }
}

/// Batched write access to a backend.
///
/// Puts may be buffered; durability is observed only after [`close`] returns
/// successfully. Dropping a writer without closing it discards the batch (or
/// whatever part of it the backend has not persisted on its own).
///
/// [`close`]: BatchWriter::close
pub trait BatchWriter {
    /// Queue a key-value pair for writing.
    fn put(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Flush and release the writer. On failure the batch's durability is
    /// unspecified and the error must be surfaced.
    fn close(self: Box<Self>) -> StoreResult<()>;
}

/// An ordered byte-key / byte-value store.
pub trait KeyValueStore: Send + Sync {
    /// Scan every key-value pair whose key starts with `prefix`, in
    /// ascending key order.
    fn scan_prefix<'a>(
        &'a self,
        prefix: &[u8],
        options: ScanOptions<'a>,
    ) -> StoreResult<ScanIter<'a>>;

    /// Scan every key-value pair with key in `[range.start, range.end)`, in
    /// ascending key order.
    fn scan_range<'a>(
        &'a self,
        range: &KeyRange,
        options: ScanOptions<'a>,
    ) -> StoreResult<ScanIter<'a>>;

    /// Open a batched writer.
    fn writer(&self) -> StoreResult<Box<dyn BatchWriter + '_>>;

    /// Capture a consistent view of the current state.
    fn snapshot(&self) -> StoreResult<Box<dyn Snapshot>>;

    /// Release backend resources. Outstanding iterators, writers, and
    /// snapshots release independently on drop.
    fn close(&self) -> StoreResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn scan_prefix<'a>(
        &'a self,
        prefix: &[u8],
        options: ScanOptions<'a>,
    ) -> StoreResult<ScanIter<'a>> {
        (**self).scan_prefix(prefix, options)
    }

    fn scan_range<'a>(
        &'a self,
        range: &KeyRange,
        options: ScanOptions<'a>,
    ) -> StoreResult<ScanIter<'a>> {
        (**self).scan_range(range, options)
    }

    fn writer(&self) -> StoreResult<Box<dyn BatchWriter + '_>> {
        (**self).writer()
    }

    fn snapshot(&self) -> StoreResult<Box<dyn Snapshot>> {
        (**self).snapshot()
    }

    fn close(&self) -> StoreResult<()> {
        (**self).close()
    }
}

/// The smallest key strictly greater than every key starting with `prefix`,
/// or `None` if no such key exists (the prefix is all `0xff`).
pub(crate) fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(&last) = end.last() {
        if last < 0xff {
            *end.last_mut().expect("non-empty") = last + 1;
            return Some(end);
        }
        end.pop();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_range_emptiness() {
        assert!(KeyRange::new(b"b".to_vec(), b"a".to_vec()).is_empty());
        assert!(KeyRange::new(b"a".to_vec(), b"a".to_vec()).is_empty());
        assert!(!KeyRange::new(b"a".to_vec(), b"b".to_vec()).is_empty());
    }

    #[test]
    fn prefix_successor_increments_last_byte() {
        assert_eq!(prefix_successor(b"entry:"), Some(b"entry;".to_vec()));
        assert_eq!(prefix_successor(b"a"), Some(b"b".to_vec()));
    }

    #[test]
    fn prefix_successor_carries_past_ff() {
        assert_eq!(prefix_successor(b"a\xff"), Some(b"b".to_vec()));
        assert_eq!(prefix_successor(b"a\xff\xff"), Some(b"b".to_vec()));
    }

    #[test]
    fn prefix_successor_of_all_ff_is_unbounded() {
        assert_eq!(prefix_successor(b"\xff\xff"), None);
        assert_eq!(prefix_successor(b""), None);
    }
}
