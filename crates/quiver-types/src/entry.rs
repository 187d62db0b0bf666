use serde::{Deserialize, Serialize};

use crate::vname::VName;

/// The edge half of an edge fact: a non-empty kind and a target identifier.
///
/// The two are jointly present by construction; a node fact simply has no
/// `Edge` at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// The edge kind, e.g. `/ref`. Never empty for a persisted entry.
    pub kind: String,
    /// The identifier of the edge's target node.
    pub target: VName,
}

/// A single persisted fact about the graph.
///
/// An entry is either a **node fact** (`edge == None`): an opaque value
/// attached to a source node under a fact name; or an **edge fact**
/// (`edge == Some`): the same, scoped to an outgoing edge of the source.
///
/// `fact_name` is never empty for a persisted entry; the entry store rejects
/// writes that omit it. `value` is opaque bytes that the store never
/// interprets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The node this fact is about.
    pub source: VName,
    /// The edge this fact is scoped to, if any.
    pub edge: Option<Edge>,
    /// The name of the fact, e.g. `/kind`.
    pub fact_name: String,
    /// The opaque fact value.
    pub value: Vec<u8>,
}

impl Entry {
    /// Create a node fact.
    pub fn node_fact(
        source: VName,
        fact_name: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            source,
            edge: None,
            fact_name: fact_name.into(),
            value: value.into(),
        }
    }

    /// Create an edge fact.
    pub fn edge_fact(
        source: VName,
        kind: impl Into<String>,
        target: VName,
        fact_name: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            source,
            edge: Some(Edge {
                kind: kind.into(),
                target,
            }),
            fact_name: fact_name.into(),
            value: value.into(),
        }
    }

    /// Returns `true` if this entry is a node fact.
    pub fn is_node_fact(&self) -> bool {
        self.edge.is_none()
    }

    /// Returns `true` if this entry is an edge fact.
    pub fn is_edge_fact(&self) -> bool {
        self.edge.is_some()
    }

    /// The edge kind, or the empty string for a node fact.
    pub fn edge_kind(&self) -> &str {
        self.edge.as_ref().map_or("", |e| e.kind.as_str())
    }

    /// The edge target, if this entry is an edge fact.
    pub fn target(&self) -> Option<&VName> {
        self.edge.as_ref().map(|e| &e.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vname(signature: &str) -> VName {
        VName::new(signature, "corpus", "", "", "")
    }

    #[test]
    fn node_fact_shape() {
        let e = Entry::node_fact(vname("A"), "/kind", b"file".to_vec());
        assert!(e.is_node_fact());
        assert!(!e.is_edge_fact());
        assert_eq!(e.edge_kind(), "");
        assert_eq!(e.target(), None);
    }

    #[test]
    fn edge_fact_shape() {
        let e = Entry::edge_fact(vname("A"), "/ref", vname("B"), "/loc", b"r".to_vec());
        assert!(e.is_edge_fact());
        assert_eq!(e.edge_kind(), "/ref");
        assert_eq!(e.target(), Some(&vname("B")));
    }

    #[test]
    fn equality_includes_value() {
        let a = Entry::node_fact(vname("A"), "/kind", b"x".to_vec());
        let b = Entry::node_fact(vname("A"), "/kind", b"y".to_vec());
        assert_ne!(a, b);
    }
}
