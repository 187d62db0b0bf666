//! Request shapes for the public store operations.
//!
//! These are the boundary types a transport layer (JSON, protobuf, RPC)
//! would carry; all of them derive serde traits. An absent optional field
//! always means "unconstrained".

use quiver_types::{Entry, VName};
use serde::{Deserialize, Serialize};

/// Selects the entries of one source, optionally narrowed to one edge kind.
///
/// An `edge_kind` of `None` (or the literal `"*"` wildcard) matches every
/// kind; `Some("")` matches node facts only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRequest {
    pub source: VName,
    #[serde(default)]
    pub edge_kind: Option<String>,
}

impl ReadRequest {
    /// Read every entry of `source`, regardless of edge kind.
    pub fn all(source: VName) -> Self {
        Self {
            source,
            edge_kind: None,
        }
    }

    /// Read the entries of `source` with exactly this edge kind.
    pub fn with_kind(source: VName, edge_kind: impl Into<String>) -> Self {
        Self {
            source,
            edge_kind: Some(edge_kind.into()),
        }
    }
}

/// A single fact to persist: the flat form of an [`Entry`], with the edge
/// half optional.
///
/// `edge_kind` and `target` must be jointly present or jointly absent; the
/// write path rejects a mismatch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub source: VName,
    pub fact_name: String,
    #[serde(default)]
    pub edge_kind: Option<String>,
    #[serde(default)]
    pub target: Option<VName>,
    pub value: Vec<u8>,
}

impl From<Entry> for Update {
    fn from(entry: Entry) -> Self {
        let (edge_kind, target) = match entry.edge {
            Some(edge) => (Some(edge.kind), Some(edge.target)),
            None => (None, None),
        };
        Self {
            source: entry.source,
            fact_name: entry.fact_name,
            edge_kind,
            target,
            value: entry.value,
        }
    }
}

/// A batch of updates applied through one backend writer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub updates: Vec<Update>,
}

impl WriteRequest {
    pub fn new(updates: Vec<Update>) -> Self {
        Self { updates }
    }

    /// Build a write request from entries.
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        Self {
            updates: entries.into_iter().map(Update::from).collect(),
        }
    }
}

/// Optional constraints applied to every entry of a full scan.
///
/// All constraints are conjunctive; an absent constraint matches anything,
/// as does an `edge_kind` of `"*"`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub source: Option<VName>,
    #[serde(default)]
    pub target: Option<VName>,
    #[serde(default)]
    pub edge_kind: Option<String>,
    #[serde(default)]
    pub fact_prefix: Option<String>,
}

impl ScanRequest {
    /// Evaluate this filter against a decoded entry.
    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(source) = &self.source {
            if entry.source != *source {
                return false;
            }
        }
        if let Some(target) = &self.target {
            if entry.target() != Some(target) {
                return false;
            }
        }
        if let Some(kind) = &self.edge_kind {
            if kind != "*" && entry.edge_kind() != kind {
                return false;
            }
        }
        if let Some(prefix) = &self.fact_prefix {
            if !entry.fact_name.starts_with(prefix.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Addresses one shard of an `N`-way split of the entry key space. Used by
/// both `count` and `shard`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRequest {
    /// Total number of shards; must be at least 1.
    pub shards: u64,
    /// Shard index in `[0, shards)`.
    pub index: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vname(signature: &str) -> VName {
        VName::new(signature, "corpus", "", "", "")
    }

    fn edge_entry() -> Entry {
        Entry::edge_fact(vname("A"), "/ref", vname("B"), "/loc", b"r".to_vec())
    }

    fn node_entry() -> Entry {
        Entry::node_fact(vname("A"), "/kind", b"file".to_vec())
    }

    // -----------------------------------------------------------------------
    // Filter evaluation
    // -----------------------------------------------------------------------

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = ScanRequest::default();
        assert!(filter.matches(&node_entry()));
        assert!(filter.matches(&edge_entry()));
    }

    #[test]
    fn source_constraint() {
        let filter = ScanRequest {
            source: Some(vname("A")),
            ..Default::default()
        };
        assert!(filter.matches(&node_entry()));

        let filter = ScanRequest {
            source: Some(vname("Z")),
            ..Default::default()
        };
        assert!(!filter.matches(&node_entry()));
    }

    #[test]
    fn target_constraint() {
        let filter = ScanRequest {
            target: Some(vname("B")),
            ..Default::default()
        };
        assert!(filter.matches(&edge_entry()));
        // Node facts have no target to match.
        assert!(!filter.matches(&node_entry()));
    }

    #[test]
    fn edge_kind_constraint_and_wildcard() {
        let exact = ScanRequest {
            edge_kind: Some("/ref".into()),
            ..Default::default()
        };
        assert!(exact.matches(&edge_entry()));
        assert!(!exact.matches(&node_entry()));

        let wildcard = ScanRequest {
            edge_kind: Some("*".into()),
            ..Default::default()
        };
        assert!(wildcard.matches(&edge_entry()));
        assert!(wildcard.matches(&node_entry()));

        let node_only = ScanRequest {
            edge_kind: Some(String::new()),
            ..Default::default()
        };
        assert!(node_only.matches(&node_entry()));
        assert!(!node_only.matches(&edge_entry()));
    }

    #[test]
    fn fact_prefix_constraint() {
        let filter = ScanRequest {
            fact_prefix: Some("/k".into()),
            ..Default::default()
        };
        assert!(filter.matches(&node_entry()));
        assert!(!filter.matches(&edge_entry()));
    }

    #[test]
    fn constraints_are_conjunctive() {
        let filter = ScanRequest {
            source: Some(vname("A")),
            target: Some(vname("B")),
            edge_kind: Some("/ref".into()),
            fact_prefix: Some("/l".into()),
        };
        assert!(filter.matches(&edge_entry()));

        // Flip any one constraint and the entry is rejected.
        let mut wrong_fact = filter.clone();
        wrong_fact.fact_prefix = Some("/z".into());
        assert!(!wrong_fact.matches(&edge_entry()));

        let mut wrong_target = filter;
        wrong_target.target = Some(vname("C"));
        assert!(!wrong_target.matches(&edge_entry()));
    }

    // -----------------------------------------------------------------------
    // Update conversion
    // -----------------------------------------------------------------------

    #[test]
    fn update_from_entry_preserves_shape() {
        let update = Update::from(edge_entry());
        assert_eq!(update.edge_kind.as_deref(), Some("/ref"));
        assert_eq!(update.target, Some(vname("B")));

        let update = Update::from(node_entry());
        assert_eq!(update.edge_kind, None);
        assert_eq!(update.target, None);
    }
}
