//! File tree views over the Quiver graph store.
//!
//! File nodes in the graph (entries with the `/kind` node fact valued
//! `file`) induce a directory tree per `(corpus, root)`. This crate provides
//! two views of it:
//!
//! - [`FileTree`] — an in-memory index built by scanning the store, answering
//!   directory and corpus-root lookups;
//! - [`DirectoryTable`] — the same answers served from a static lookup table
//!   persisted in the backend under its own `dirs:` key prefix, disjoint from
//!   the entry key space.

pub mod error;
pub mod table;
pub mod tree;

pub use error::{FileTreeError, FileTreeResult};
pub use table::{dir_key, DirectoryRecord, DirectoryTable, CORPUS_ROOTS_KEY, DIR_TABLE_PREFIX};
pub use tree::{DirKey, Directory, FileTree, FILE_KIND, NODE_KIND_FACT};
