//! The Quiver entry store: a graph fact store over any ordered key-value
//! backend.
//!
//! Every fact in the graph is a single `(source, edge-kind, fact-name,
//! target, value)` entry, persisted under a canonical byte key whose
//! lexicographic order realizes the canonical entry order: grouped by source,
//! then edge kind (node facts before any edge), then fact name, then target.
//!
//! # Layers
//!
//! - [`key`] — the canonical entry key codec and the entry key space bounds
//! - [`KeyValueStore`] — the backend trait: prefix/range scans, batched
//!   writes, point-in-time snapshots
//! - [`InMemoryKeyValueStore`] — a `BTreeMap`-backed backend for tests and
//!   embedding
//! - [`GraphStore`] — the entry store proper: `read`, `write`, `scan`,
//!   `count`, `shard`, `close`
//!
//! # Design Rules
//!
//! 1. Byte order of encoded keys is the sole external ordering guarantee.
//! 2. Iterators, writers, and snapshots release their resources on drop; a
//!    writer's batch is durable only after a successful close.
//! 3. Shard tables are planned once per shard count, pinned to a snapshot,
//!    and never mutated after publication.
//! 4. All backend errors are propagated, never silently ignored.

pub mod backend;
pub mod error;
pub mod key;
pub mod memory;
pub mod request;
pub mod shard;
pub mod store;

pub use backend::{BatchWriter, KeyRange, KeyValue, KeyValueStore, ScanIter, ScanOptions, Snapshot};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryKeyValueStore;
pub use request::{ReadRequest, ScanRequest, ShardRequest, Update, WriteRequest};
pub use store::{Flow, GraphStore};
