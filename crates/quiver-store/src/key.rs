//! The canonical entry key codec.
//!
//! Entry keys have the layout:
//!
//! ```text
//! entry:<source>\n<edge-kind>\n<fact-name>\n<target>
//! ```
//!
//! where `<source>` and `<target>` are canonical identifier encodings (NUL
//! separated fields) and `\n` is the entry key separator. For a node fact the
//! edge kind and target are empty, but all three separator positions are
//! still present, so every key splits into exactly four parts.
//!
//! Because the separator sorts below every byte permitted in the payload
//! positions it delimits, plain byte order over these keys groups entries by
//! source, then edge kind (node facts first), then fact name, then target:
//! the canonical entry order.

use quiver_types::{Edge, Entry, VName};

use crate::backend::KeyRange;
use crate::error::{StoreError, StoreResult};

/// Fixed prefix reserving the entry key space. Other prefixes are free for
/// auxiliary tables.
pub const ENTRY_KEY_PREFIX: &[u8] = b"entry:";

/// Separates the source, edge kind, fact name, and target within a key.
/// Distinct from the identifier field separator.
pub const ENTRY_KEY_SEP: u8 = b'\n';

/// The full entry key space `[entry:, entry;)`: the exclusive end is the
/// prefix with its final byte incremented.
pub fn entry_key_space() -> KeyRange {
    KeyRange::new(ENTRY_KEY_PREFIX.to_vec(), entry_key_space_end())
}

/// The key immediately after the entry key space.
pub fn entry_key_space_end() -> Vec<u8> {
    let mut end = ENTRY_KEY_PREFIX.to_vec();
    if let Some(last) = end.last_mut() {
        *last += 1;
    }
    end
}

/// Encode the canonical key for an entry given as its parts.
///
/// `edge_kind` and `target` must be jointly present (edge fact) or jointly
/// absent (node fact); an empty kind counts as absent. Fails with
/// [`StoreError::SeparatorInField`] if the kind, the fact name, or either
/// encoded identifier contains the entry key separator.
pub fn encode_key(
    source: &VName,
    fact_name: &str,
    edge_kind: Option<&str>,
    target: Option<&VName>,
) -> StoreResult<Vec<u8>> {
    let kind = edge_kind.unwrap_or("");
    if kind.is_empty() != target.is_none() {
        return Err(StoreError::KindTargetMismatch);
    }
    if kind.as_bytes().contains(&ENTRY_KEY_SEP) {
        return Err(StoreError::SeparatorInField("edge kind"));
    }
    if fact_name.as_bytes().contains(&ENTRY_KEY_SEP) {
        return Err(StoreError::SeparatorInField("fact name"));
    }

    let source_encoding = source.encode()?;
    if source_encoding.contains(&ENTRY_KEY_SEP) {
        return Err(StoreError::SeparatorInField("source identifier"));
    }
    let target_encoding = match target {
        Some(t) => {
            let encoding = t.encode()?;
            if encoding.contains(&ENTRY_KEY_SEP) {
                return Err(StoreError::SeparatorInField("target identifier"));
            }
            encoding
        }
        None => Vec::new(),
    };

    let mut key = Vec::with_capacity(
        ENTRY_KEY_PREFIX.len()
            + source_encoding.len()
            + kind.len()
            + fact_name.len()
            + target_encoding.len()
            + 3,
    );
    key.extend_from_slice(ENTRY_KEY_PREFIX);
    key.extend_from_slice(&source_encoding);
    key.push(ENTRY_KEY_SEP);
    key.extend_from_slice(kind.as_bytes());
    key.push(ENTRY_KEY_SEP);
    key.extend_from_slice(fact_name.as_bytes());
    key.push(ENTRY_KEY_SEP);
    key.extend_from_slice(&target_encoding);
    Ok(key)
}

/// Encode the canonical key for an [`Entry`].
pub fn entry_key(entry: &Entry) -> StoreResult<Vec<u8>> {
    encode_key(
        &entry.source,
        &entry.fact_name,
        entry.edge.as_ref().map(|e| e.kind.as_str()),
        entry.target(),
    )
}

/// A prefix selecting every entry of `source`, optionally narrowed to one
/// edge kind.
///
/// With `edge_kind` of `None` (or the `"*"` wildcard) the prefix covers all
/// of the source's entries; `Some("")` selects its node facts; any other kind
/// selects that edge kind exactly.
pub fn key_prefix(source: &VName, edge_kind: Option<&str>) -> StoreResult<Vec<u8>> {
    let source_encoding = source.encode()?;
    if source_encoding.contains(&ENTRY_KEY_SEP) {
        return Err(StoreError::SeparatorInField("source identifier"));
    }

    let mut prefix = Vec::with_capacity(ENTRY_KEY_PREFIX.len() + source_encoding.len() + 2);
    prefix.extend_from_slice(ENTRY_KEY_PREFIX);
    prefix.extend_from_slice(&source_encoding);
    prefix.push(ENTRY_KEY_SEP);

    match edge_kind {
        None | Some("*") => Ok(prefix),
        Some(kind) => {
            if kind.as_bytes().contains(&ENTRY_KEY_SEP) {
                return Err(StoreError::SeparatorInField("edge kind"));
            }
            prefix.extend_from_slice(kind.as_bytes());
            prefix.push(ENTRY_KEY_SEP);
            Ok(prefix)
        }
    }
}

/// Parse an encoded key back into an [`Entry`], attaching the given value.
///
/// Any deviation from the canonical layout (wrong prefix, wrong part count,
/// undecodable identifiers, a kind/target mismatch) is a
/// [`StoreError::MalformedKey`]: it means the backend holds keys this store
/// did not write.
pub fn parse_entry(key: &[u8], value: Vec<u8>) -> StoreResult<Entry> {
    let suffix = key
        .strip_prefix(ENTRY_KEY_PREFIX)
        .ok_or_else(|| StoreError::MalformedKey("missing entry prefix".into()))?;

    let parts: Vec<&[u8]> = suffix.splitn(4, |&b| b == ENTRY_KEY_SEP).collect();
    if parts.len() != 4 {
        return Err(StoreError::MalformedKey(format!(
            "expected 4 key parts, got {}",
            parts.len()
        )));
    }

    let source = VName::decode(parts[0])
        .map_err(|e| StoreError::MalformedKey(format!("source: {e}")))?
        .ok_or_else(|| StoreError::MalformedKey("missing source".into()))?;
    let kind = std::str::from_utf8(parts[1])
        .map_err(|e| StoreError::MalformedKey(format!("edge kind: {e}")))?;
    let fact_name = std::str::from_utf8(parts[2])
        .map_err(|e| StoreError::MalformedKey(format!("fact name: {e}")))?;
    let target =
        VName::decode(parts[3]).map_err(|e| StoreError::MalformedKey(format!("target: {e}")))?;

    let edge = match (kind.is_empty(), target) {
        (true, None) => None,
        (false, Some(target)) => Some(Edge {
            kind: kind.to_owned(),
            target,
        }),
        _ => {
            return Err(StoreError::MalformedKey(
                "edge kind and target must be jointly present or absent".into(),
            ));
        }
    };

    Ok(Entry {
        source,
        edge,
        fact_name: fact_name.to_owned(),
        value,
    })
}

/// The `(source, edge-kind)` group prefix of a key: everything up to and
/// including the second separator.
pub(crate) fn group_prefix(key: &[u8]) -> StoreResult<&[u8]> {
    let mut seps = key
        .iter()
        .enumerate()
        .filter(|(_, &b)| b == ENTRY_KEY_SEP)
        .map(|(i, _)| i);
    let _first = seps
        .next()
        .ok_or_else(|| StoreError::MalformedKey("key has no separators".into()))?;
    let second = seps
        .next()
        .ok_or_else(|| StoreError::MalformedKey("key has a single separator".into()))?;
    Ok(&key[..=second])
}
