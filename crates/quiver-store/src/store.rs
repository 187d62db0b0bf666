use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use quiver_types::Entry;

use crate::backend::{BatchWriter, KeyValueStore, ScanIter, ScanOptions};
use crate::error::{StoreError, StoreResult};
use crate::key;
use crate::request::{ReadRequest, ScanRequest, ShardRequest, WriteRequest};
use crate::shard::{self, ShardTable};

/// Consumer verdict after each streamed entry.
///
/// Returning [`Flow::Halt`] terminates the stream cleanly; it is not an
/// error. Errors propagate through the callback's `Result` instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

/// The entry store: graph facts over an ordered key-value backend.
///
/// All operations are safe to invoke from multiple threads. Reads and scans
/// stream entries in canonical order through a callback; `shard` streams
/// under the snapshot its table was planned against.
pub struct GraphStore<D: KeyValueStore> {
    db: D,
    /// Shard tables planned so far, one per requested shard count. Planned
    /// lazily under the lock on first request, then reused; published tables
    /// are immutable.
    shard_tables: Mutex<HashMap<u64, Arc<ShardTable>>>,
}

impl<D: KeyValueStore> GraphStore<D> {
    /// Create a store over the given backend.
    pub fn new(db: D) -> Self {
        Self {
            db,
            shard_tables: Mutex::new(HashMap::new()),
        }
    }

    /// Stream every entry of the request's source, optionally narrowed to
    /// one edge kind, in canonical order.
    pub fn read(
        &self,
        request: &ReadRequest,
        f: impl FnMut(Entry) -> StoreResult<Flow>,
    ) -> StoreResult<()> {
        let prefix = key::key_prefix(&request.source, request.edge_kind.as_deref())?;
        let iter = self.db.scan_prefix(&prefix, ScanOptions::default())?;
        stream_entries(iter, f)
    }

    /// Apply a batch of updates through one backend writer.
    ///
    /// Any encoding error aborts the batch before the writer is closed;
    /// whether earlier puts are then durable is backend-defined. A failed
    /// writer close surfaces as [`StoreError::WriterCloseFailed`].
    pub fn write(&self, request: &WriteRequest) -> StoreResult<()> {
        let mut writer = self.db.writer()?;
        for update in &request.updates {
            if update.fact_name.is_empty() {
                return Err(StoreError::MissingFactName);
            }
            let entry_key = key::encode_key(
                &update.source,
                &update.fact_name,
                update.edge_kind.as_deref(),
                update.target.as_ref(),
            )?;
            writer.put(&entry_key, &update.value)?;
        }
        writer
            .close()
            .map_err(|e| StoreError::WriterCloseFailed(e.to_string()))
    }

    /// Stream every entry matching the scan filter, in canonical order.
    pub fn scan(
        &self,
        request: &ScanRequest,
        mut f: impl FnMut(Entry) -> StoreResult<Flow>,
    ) -> StoreResult<()> {
        let iter = self
            .db
            .scan_prefix(key::ENTRY_KEY_PREFIX, ScanOptions::large(None))?;
        stream_entries(iter, |entry| {
            if request.matches(&entry) {
                f(entry)
            } else {
                Ok(Flow::Continue)
            }
        })
    }

    /// The number of entries in the requested shard, as of the snapshot its
    /// table was planned against.
    pub fn count(&self, request: &ShardRequest) -> StoreResult<u64> {
        check_shard_request(request)?;
        let table = self.shard_table(request.shards)?;
        Ok(table.shards[request.index as usize].count as u64)
    }

    /// Stream the requested shard's entries under the snapshot its table was
    /// planned against, in canonical order.
    pub fn shard(
        &self,
        request: &ShardRequest,
        f: impl FnMut(Entry) -> StoreResult<Flow>,
    ) -> StoreResult<()> {
        check_shard_request(request)?;
        let table = self.shard_table(request.shards)?;
        let shard = &table.shards[request.index as usize];
        if shard.count == 0 {
            return Ok(());
        }
        let iter = self
            .db
            .scan_range(&shard.range, ScanOptions::large(Some(table.snapshot.as_ref())))?;
        stream_entries(iter, f)
    }

    /// Release the backend and every pinned shard snapshot.
    pub fn close(self) -> StoreResult<()> {
        self.db.close()
    }

    /// Look up or plan the shard table for `shards`.
    ///
    /// The lock is held for the lookup or the planning, never while a shard
    /// streams; published tables are read through the returned `Arc`.
    fn shard_table(&self, shards: u64) -> StoreResult<Arc<ShardTable>> {
        let mut tables = self.shard_tables.lock().expect("lock poisoned");
        if let Some(table) = tables.get(&shards) {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(shard::plan(&self.db, shards)?);
        tables.insert(shards, Arc::clone(&table));
        Ok(table)
    }
}

impl<D: KeyValueStore> std::fmt::Debug for GraphStore<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let planned = self.shard_tables.lock().expect("lock poisoned").len();
        f.debug_struct("GraphStore")
            .field("planned_shard_tables", &planned)
            .finish_non_exhaustive()
    }
}

fn check_shard_request(request: &ShardRequest) -> StoreResult<()> {
    if request.shards < 1 || request.index >= request.shards {
        return Err(StoreError::InvalidShardParameters {
            shards: request.shards,
            index: request.index,
        });
    }
    Ok(())
}

/// Decode and deliver entries until the iterator drains or the consumer
/// halts.
fn stream_entries(
    iter: ScanIter<'_>,
    mut f: impl FnMut(Entry) -> StoreResult<Flow>,
) -> StoreResult<()> {
    for kv in iter {
        let (entry_key, value) = kv?;
        let entry = key::parse_entry(&entry_key, value)?;
        if f(entry)? == Flow::Halt {
            return Ok(());
        }
    }
    Ok(())
}
