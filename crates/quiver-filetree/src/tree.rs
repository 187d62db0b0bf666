use std::collections::{BTreeMap, BTreeSet, HashMap};

use quiver_store::{Flow, GraphStore, KeyValueStore, ScanRequest};
use quiver_types::VName;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::FileTreeResult;

/// The node fact naming a node's kind.
pub const NODE_KIND_FACT: &str = "/kind";

/// The kind value identifying file nodes.
pub const FILE_KIND: &str = "file";

/// Addresses one directory: a corpus, a root within it, and a normalized
/// absolute path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirKey {
    pub corpus: String,
    pub root: String,
    pub path: String,
}

impl DirKey {
    pub fn new(
        corpus: impl Into<String>,
        root: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            corpus: corpus.into(),
            root: root.into(),
            path: path.into(),
        }
    }
}

/// The contents of one directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    /// Absolute paths of immediate subdirectories.
    pub subdirectories: BTreeSet<String>,
    /// Identifiers of the files directly in this directory.
    pub files: BTreeSet<VName>,
}

/// In-memory file tree index.
///
/// Directories are held in one flat map from `(corpus, root, path)` to their
/// contents; the parent chain of every inserted directory is materialized at
/// insertion time, so lookups never walk paths.
#[derive(Debug, Default)]
pub struct FileTree {
    dirs: HashMap<DirKey, Directory>,
}

impl FileTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every file node in the store.
    ///
    /// Scans for `/kind` node facts and adds each source whose kind is
    /// `file`. Returns the number of files indexed.
    pub fn populate<D: KeyValueStore>(&mut self, store: &GraphStore<D>) -> FileTreeResult<usize> {
        let filter = ScanRequest {
            fact_prefix: Some(NODE_KIND_FACT.to_owned()),
            ..Default::default()
        };
        let mut total = 0usize;
        store.scan(&filter, |entry| {
            if entry.fact_name == NODE_KIND_FACT && entry.value == FILE_KIND.as_bytes() {
                self.add_file(&entry.source);
                total += 1;
            }
            Ok(Flow::Continue)
        })?;
        info!(files = total, "populated in-memory file tree");
        Ok(total)
    }

    /// Add one file identifier to the tree, materializing its directory
    /// chain.
    pub fn add_file(&mut self, file: &VName) {
        let path = clean_path(&file.path);
        let dir = parent_dir(&path);
        self.ensure_dir(&file.corpus, &file.root, dir.clone());
        self.dirs
            .entry(DirKey::new(&file.corpus, &file.root, dir))
            .or_default()
            .files
            .insert(file.clone());
    }

    /// The contents of the directory at `corpus`/`root`/`path`, if known.
    pub fn directory(&self, corpus: &str, root: &str, path: &str) -> Option<&Directory> {
        self.dirs
            .get(&DirKey::new(corpus, root, clean_path(path)))
    }

    /// Every known corpus mapped to its known roots.
    pub fn corpus_roots(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for key in self.dirs.keys() {
            out.entry(key.corpus.clone())
                .or_default()
                .insert(key.root.clone());
        }
        out
    }

    /// Iterate every directory in the tree.
    pub fn iter(&self) -> impl Iterator<Item = (&DirKey, &Directory)> {
        self.dirs.iter()
    }

    /// Number of known directories.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Returns `true` if no directories are known.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Insert `path` and walk up its ancestors, linking each directory into
    /// its parent.
    ///
    /// The walk stops at the root, or at the first ancestor that already
    /// existed: an existing directory's own chain was linked when it was
    /// created.
    fn ensure_dir(&mut self, corpus: &str, root: &str, path: String) {
        let mut path = path;
        self.dirs
            .entry(DirKey::new(corpus, root, path.clone()))
            .or_default();
        while path != "/" {
            let parent = parent_dir(&path);
            let parent_key = DirKey::new(corpus, root, parent.clone());
            let parent_existed = self.dirs.contains_key(&parent_key);
            self.dirs
                .entry(parent_key)
                .or_default()
                .subdirectories
                .insert(path.clone());
            if parent_existed {
                break;
            }
            path = parent;
        }
    }
}

/// Normalize a file or directory path to an absolute form with no trailing
/// slash (except the root itself).
pub(crate) fn clean_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    out.push('/');
    for part in path.split('/').filter(|p| !p.is_empty() && *p != ".") {
        if !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(part);
    }
    out
}

/// The parent directory of a normalized absolute path; the root is its own
/// parent.
pub(crate) fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_owned(),
        Some(idx) => path[..idx].to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_store::{InMemoryKeyValueStore, WriteRequest};
    use quiver_types::Entry;

    fn file_vname(corpus: &str, root: &str, path: &str) -> VName {
        VName::new("", corpus, root, path, "")
    }

    // -----------------------------------------------------------------------
    // Path helpers
    // -----------------------------------------------------------------------

    #[test]
    fn clean_path_normalizes() {
        assert_eq!(clean_path("a/b/c.rs"), "/a/b/c.rs");
        assert_eq!(clean_path("/a/b"), "/a/b");
        assert_eq!(clean_path("a//b/./c"), "/a/b/c");
        assert_eq!(clean_path(""), "/");
    }

    #[test]
    fn parent_dir_walks_up() {
        assert_eq!(parent_dir("/a/b/c.rs"), "/a/b");
        assert_eq!(parent_dir("/a"), "/");
        assert_eq!(parent_dir("/"), "/");
    }

    // -----------------------------------------------------------------------
    // Insertion and lookup
    // -----------------------------------------------------------------------

    #[test]
    fn add_file_builds_parent_chain() {
        let mut tree = FileTree::new();
        let file = file_vname("c", "r", "src/lib/util.rs");
        tree.add_file(&file);

        let dir = tree.directory("c", "r", "/src/lib").unwrap();
        assert!(dir.files.contains(&file));

        let src = tree.directory("c", "r", "/src").unwrap();
        assert!(src.subdirectories.contains("/src/lib"));

        let root = tree.directory("c", "r", "/").unwrap();
        assert!(root.subdirectories.contains("/src"));
    }

    #[test]
    fn sibling_files_share_a_directory() {
        let mut tree = FileTree::new();
        tree.add_file(&file_vname("c", "r", "src/a.rs"));
        tree.add_file(&file_vname("c", "r", "src/b.rs"));

        let dir = tree.directory("c", "r", "/src").unwrap();
        assert_eq!(dir.files.len(), 2);

        // The parent link is not duplicated.
        let root = tree.directory("c", "r", "/").unwrap();
        assert_eq!(root.subdirectories.len(), 1);
    }

    #[test]
    fn duplicate_adds_are_idempotent() {
        let mut tree = FileTree::new();
        let file = file_vname("c", "r", "src/a.rs");
        tree.add_file(&file);
        let dirs_before = tree.len();
        tree.add_file(&file);
        assert_eq!(tree.len(), dirs_before);
        assert_eq!(tree.directory("c", "r", "/src").unwrap().files.len(), 1);
    }

    #[test]
    fn file_at_root() {
        let mut tree = FileTree::new();
        tree.add_file(&file_vname("c", "r", "README.md"));
        let root = tree.directory("c", "r", "/").unwrap();
        assert_eq!(root.files.len(), 1);
        assert!(root.subdirectories.is_empty());
    }

    #[test]
    fn unknown_directory_is_none() {
        let tree = FileTree::new();
        assert!(tree.directory("c", "r", "/nope").is_none());
    }

    #[test]
    fn corpus_roots_are_collected() {
        let mut tree = FileTree::new();
        tree.add_file(&file_vname("c1", "", "a.rs"));
        tree.add_file(&file_vname("c1", "gen", "b.rs"));
        tree.add_file(&file_vname("c2", "", "c.rs"));

        let roots = tree.corpus_roots();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots["c1"].len(), 2);
        assert!(roots["c2"].contains(""));
    }

    // -----------------------------------------------------------------------
    // Population from a store
    // -----------------------------------------------------------------------

    #[test]
    fn populate_indexes_file_nodes_only() {
        let store = GraphStore::new(InMemoryKeyValueStore::new());
        let file_a = file_vname("c", "r", "src/a.rs");
        let file_b = file_vname("c", "r", "src/sub/b.rs");
        let record = VName::new("sig", "c", "r", "", "rust");
        store
            .write(&WriteRequest::from_entries([
                Entry::node_fact(file_a.clone(), NODE_KIND_FACT, FILE_KIND.as_bytes().to_vec()),
                Entry::node_fact(file_b.clone(), NODE_KIND_FACT, FILE_KIND.as_bytes().to_vec()),
                // A non-file node and a non-kind fact must be ignored.
                Entry::node_fact(record.clone(), NODE_KIND_FACT, b"record".to_vec()),
                Entry::node_fact(file_a.clone(), "/kindred", b"decoy".to_vec()),
            ]))
            .unwrap();

        let mut tree = FileTree::new();
        let total = tree.populate(&store).unwrap();
        assert_eq!(total, 2);

        assert!(tree
            .directory("c", "r", "/src")
            .unwrap()
            .files
            .contains(&file_a));
        assert!(tree
            .directory("c", "r", "/src/sub")
            .unwrap()
            .files
            .contains(&file_b));
        assert!(tree
            .directory("c", "r", "/src")
            .unwrap()
            .subdirectories
            .contains("/src/sub"));
    }
}
