use std::any::Any;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, RwLock};

use crate::backend::{
    prefix_successor, BatchWriter, KeyRange, KeyValue, KeyValueStore, ScanIter, ScanOptions,
    Snapshot,
};
use crate::error::{StoreError, StoreResult};

type KeyMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory, `BTreeMap`-based key-value backend.
///
/// Intended for tests and embedding. Scans are cursor-based: each step takes
/// the read lock, seeks the first key past the cursor, and clones the pair,
/// so a live iterator never holds the lock between items and observes the
/// live map as it goes. A [`snapshot`] pins a point-in-time copy of the map;
/// iterators opened under it walk the copy instead. The `large_read` hint is
/// a no-op here.
///
/// [`snapshot`]: KeyValueStore::snapshot
pub struct InMemoryKeyValueStore {
    entries: RwLock<KeyMap>,
}

impl InMemoryKeyValueStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryKeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKeyValueStore")
            .field("key_count", &self.len())
            .finish()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn scan_prefix<'a>(
        &'a self,
        prefix: &[u8],
        options: ScanOptions<'a>,
    ) -> StoreResult<ScanIter<'a>> {
        self.iter(prefix.to_vec(), prefix_successor(prefix), options)
    }

    fn scan_range<'a>(
        &'a self,
        range: &KeyRange,
        options: ScanOptions<'a>,
    ) -> StoreResult<ScanIter<'a>> {
        if range.is_empty() {
            return Ok(Box::new(std::iter::empty()));
        }
        self.iter(range.start.clone(), Some(range.end.clone()), options)
    }

    fn writer(&self) -> StoreResult<Box<dyn BatchWriter + '_>> {
        Ok(Box::new(MemoryWriter {
            entries: &self.entries,
            pending: Vec::new(),
        }))
    }

    fn snapshot(&self) -> StoreResult<Box<dyn Snapshot>> {
        let view = self.entries.read().expect("lock poisoned").clone();
        Ok(Box::new(MemorySnapshot {
            view: Arc::new(view),
        }))
    }

    fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

impl InMemoryKeyValueStore {
    fn iter<'a>(
        &'a self,
        start: Vec<u8>,
        end: Option<Vec<u8>>,
        options: ScanOptions<'a>,
    ) -> StoreResult<ScanIter<'a>> {
        let view = match options.snapshot {
            Some(snapshot) => {
                let pinned = snapshot
                    .as_any()
                    .downcast_ref::<MemorySnapshot>()
                    .ok_or_else(|| {
                        StoreError::Backend("snapshot was not created by this backend".into())
                    })?;
                View::Pinned(Arc::clone(&pinned.view))
            }
            None => View::Live(&self.entries),
        };
        Ok(Box::new(MemoryIter {
            view,
            cursor: None,
            start,
            end,
        }))
    }
}

/// Point-in-time copy of the key map.
struct MemorySnapshot {
    view: Arc<KeyMap>,
}

impl Snapshot for MemorySnapshot {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

enum View<'a> {
    Live(&'a RwLock<KeyMap>),
    Pinned(Arc<KeyMap>),
}

/// Cursor-based iterator: each step re-seeks the first key past the cursor.
/// O(log n) per item, no lock held between items.
struct MemoryIter<'a> {
    view: View<'a>,
    /// Last yielded key, if any; iteration resumes strictly after it.
    cursor: Option<Vec<u8>>,
    start: Vec<u8>,
    end: Option<Vec<u8>>,
}

impl MemoryIter<'_> {
    fn seek(&self, map: &KeyMap) -> Option<KeyValue> {
        let lower = match &self.cursor {
            Some(key) => Bound::Excluded(key.as_slice()),
            None => Bound::Included(self.start.as_slice()),
        };
        let upper = match &self.end {
            Some(end) => Bound::Excluded(end.as_slice()),
            None => Bound::Unbounded,
        };
        map.range::<[u8], _>((lower, upper))
            .next()
            .map(|(k, v)| (k.clone(), v.clone()))
    }
}

impl Iterator for MemoryIter<'_> {
    type Item = StoreResult<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        let found = match &self.view {
            View::Live(entries) => {
                let map = entries.read().expect("lock poisoned");
                self.seek(&map)
            }
            View::Pinned(map) => self.seek(map),
        };
        let (key, value) = found?;
        self.cursor = Some(key.clone());
        Some(Ok((key, value)))
    }
}

/// Buffers puts and applies them atomically on close.
struct MemoryWriter<'a> {
    entries: &'a RwLock<KeyMap>,
    pending: Vec<KeyValue>,
}

impl BatchWriter for MemoryWriter<'_> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.pending.push((key.to_vec(), value.to_vec()));
        Ok(())
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        for (key, value) in self.pending {
            map.insert(key, value);
        }
        Ok(())
    }
}
