//! Static directory lookup table, served from the backend itself.
//!
//! Table layout, under a prefix disjoint from the entry key space:
//!
//! ```text
//! dirs:<corpus>\n<root>\n<path> -> DirectoryRecord (JSON)
//! dirs:corpusRoots              -> corpus → roots map (JSON)
//! ```

use std::collections::{BTreeMap, BTreeSet};

use quiver_store::{BatchWriter, KeyValueStore, ScanOptions};
use quiver_types::VName;
use serde::{Deserialize, Serialize};

use crate::error::{FileTreeError, FileTreeResult};
use crate::tree::FileTree;

/// Key prefix reserving the directory table's key space.
pub const DIR_TABLE_PREFIX: &[u8] = b"dirs:";

/// Separates the corpus, root, and path within a directory key.
const DIR_KEY_SEP: u8 = b'\n';

/// The table key holding the corpus-roots record.
pub const CORPUS_ROOTS_KEY: &[u8] = b"dirs:corpusRoots";

/// The lookup key for the directory at `corpus`/`root`/`path`.
pub fn dir_key(corpus: &str, root: &str, path: &str) -> Vec<u8> {
    let mut key =
        Vec::with_capacity(DIR_TABLE_PREFIX.len() + corpus.len() + root.len() + path.len() + 2);
    key.extend_from_slice(DIR_TABLE_PREFIX);
    key.extend_from_slice(corpus.as_bytes());
    key.push(DIR_KEY_SEP);
    key.extend_from_slice(root.as_bytes());
    key.push(DIR_KEY_SEP);
    key.extend_from_slice(path.as_bytes());
    key
}

/// Persisted contents of one directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub subdirectories: Vec<String>,
    pub files: Vec<VName>,
}

/// Directory lookups served from a static table in the backend.
///
/// The table is written once from a populated [`FileTree`] and read with
/// point lookups; it shares the backend with the entry store under its own
/// key prefix.
pub struct DirectoryTable<D: KeyValueStore> {
    db: D,
}

impl<D: KeyValueStore> DirectoryTable<D> {
    /// Open a table over the given backend.
    pub fn new(db: D) -> Self {
        Self { db }
    }

    /// Persist every directory of `tree`, plus its corpus-roots record,
    /// through one batched writer.
    pub fn write_tree(&self, tree: &FileTree) -> FileTreeResult<()> {
        let mut writer = self.db.writer().map_err(FileTreeError::Store)?;
        for (key, directory) in tree.iter() {
            let record = DirectoryRecord {
                subdirectories: directory.subdirectories.iter().cloned().collect(),
                files: directory.files.iter().cloned().collect(),
            };
            let bytes = serde_json::to_vec(&record)
                .map_err(|e| FileTreeError::Serialization(e.to_string()))?;
            writer
                .put(&dir_key(&key.corpus, &key.root, &key.path), &bytes)
                .map_err(FileTreeError::Store)?;
        }

        let roots = tree.corpus_roots();
        let bytes =
            serde_json::to_vec(&roots).map_err(|e| FileTreeError::Serialization(e.to_string()))?;
        writer
            .put(CORPUS_ROOTS_KEY, &bytes)
            .map_err(FileTreeError::Store)?;
        writer.close().map_err(FileTreeError::Store)
    }

    /// Look up the directory at `corpus`/`root`/`path`.
    pub fn directory(
        &self,
        corpus: &str,
        root: &str,
        path: &str,
    ) -> FileTreeResult<Option<DirectoryRecord>> {
        match self.lookup(&dir_key(corpus, root, &crate::tree::clean_path(path)))? {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .map_err(|e| FileTreeError::Serialization(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Every corpus in the table mapped to its roots.
    pub fn corpus_roots(&self) -> FileTreeResult<BTreeMap<String, BTreeSet<String>>> {
        let bytes = self
            .lookup(CORPUS_ROOTS_KEY)?
            .ok_or(FileTreeError::MissingCorpusRoots)?;
        serde_json::from_slice(&bytes).map_err(|e| FileTreeError::Serialization(e.to_string()))
    }

    /// Exact-key point read via a prefix scan: the first scanned key either
    /// equals the key or the key is absent.
    fn lookup(&self, key: &[u8]) -> FileTreeResult<Option<Vec<u8>>> {
        let mut iter = self
            .db
            .scan_prefix(key, ScanOptions::default())
            .map_err(FileTreeError::Store)?;
        match iter.next().transpose().map_err(FileTreeError::Store)? {
            Some((found, value)) if found == key => Ok(Some(value)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use quiver_store::{Flow, GraphStore, InMemoryKeyValueStore, ScanRequest, WriteRequest};
    use quiver_types::Entry;

    use crate::tree::{FILE_KIND, NODE_KIND_FACT};

    fn file_vname(corpus: &str, root: &str, path: &str) -> VName {
        VName::new("", corpus, root, path, "")
    }

    fn populated_tree() -> FileTree {
        let mut tree = FileTree::new();
        tree.add_file(&file_vname("c", "r", "src/a.rs"));
        tree.add_file(&file_vname("c", "r", "src/sub/b.rs"));
        tree.add_file(&file_vname("c2", "", "main.rs"));
        tree
    }

    #[test]
    fn write_and_lookup_directory() {
        let table = DirectoryTable::new(InMemoryKeyValueStore::new());
        table.write_tree(&populated_tree()).unwrap();

        let dir = table.directory("c", "r", "/src").unwrap().unwrap();
        assert_eq!(dir.subdirectories, vec!["/src/sub".to_owned()]);
        assert_eq!(dir.files, vec![file_vname("c", "r", "src/a.rs")]);

        assert!(table.directory("c", "r", "/nope").unwrap().is_none());
    }

    #[test]
    fn lookup_requires_exact_key() {
        // "/src" must not match the record stored under "/src/sub".
        let table = DirectoryTable::new(InMemoryKeyValueStore::new());
        let mut tree = FileTree::new();
        tree.add_file(&file_vname("c", "r", "src/sub/b.rs"));
        table.write_tree(&tree).unwrap();

        let sub = table.directory("c", "r", "/src/sub").unwrap().unwrap();
        assert_eq!(sub.files.len(), 1);
        let src = table.directory("c", "r", "/src").unwrap().unwrap();
        assert!(src.files.is_empty());
    }

    #[test]
    fn corpus_roots_roundtrip() {
        let table = DirectoryTable::new(InMemoryKeyValueStore::new());
        table.write_tree(&populated_tree()).unwrap();

        let roots = table.corpus_roots().unwrap();
        assert_eq!(roots.len(), 2);
        assert!(roots["c"].contains("r"));
        assert!(roots["c2"].contains(""));
    }

    #[test]
    fn missing_corpus_roots_is_an_error() {
        let table = DirectoryTable::new(InMemoryKeyValueStore::new());
        assert!(matches!(
            table.corpus_roots(),
            Err(FileTreeError::MissingCorpusRoots)
        ));
    }

    #[test]
    fn table_coexists_with_entry_store() {
        // The dirs: prefix is disjoint from the entry key space, so the
        // serving table and the entry store can share one backend.
        let backend = Arc::new(InMemoryKeyValueStore::new());
        let store = GraphStore::new(Arc::clone(&backend));
        let file = file_vname("c", "r", "src/a.rs");
        store
            .write(&WriteRequest::from_entries([Entry::node_fact(
                file.clone(),
                NODE_KIND_FACT,
                FILE_KIND.as_bytes().to_vec(),
            )]))
            .unwrap();

        let mut tree = FileTree::new();
        tree.populate(&store).unwrap();
        let table = DirectoryTable::new(Arc::clone(&backend));
        table.write_tree(&tree).unwrap();

        // The entry store still sees exactly its one entry.
        let mut entries = 0;
        store
            .scan(&ScanRequest::default(), |_| {
                entries += 1;
                Ok(Flow::Continue)
            })
            .unwrap();
        assert_eq!(entries, 1);

        // And the table serves the directory.
        let dir = table.directory("c", "r", "/src").unwrap().unwrap();
        assert_eq!(dir.files, vec![file]);
    }
}
