use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VNameError;

/// The byte separating the five fields of an encoded identifier.
///
/// No identifier field may contain this byte; [`VName::encode`] rejects any
/// that does.
pub const FIELD_SEPARATOR: u8 = 0x00;

/// The 5-field identifier of a graph node or file.
///
/// Any field may be empty. Two identifiers are equal iff all fields are
/// byte-equal. The derived ordering compares fields in declaration order and
/// exists for use in sorted collections; the canonical on-disk ordering of
/// entries is defined by the encoded entry key, not by this type.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct VName {
    pub signature: String,
    pub corpus: String,
    pub root: String,
    pub path: String,
    pub language: String,
}

impl VName {
    /// Create an identifier from its five fields.
    pub fn new(
        signature: impl Into<String>,
        corpus: impl Into<String>,
        root: impl Into<String>,
        path: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            signature: signature.into(),
            corpus: corpus.into(),
            root: root.into(),
            path: path.into(),
            language: language.into(),
        }
    }

    /// Returns `true` if every field is empty.
    ///
    /// Note that the empty identifier is still a present identifier; it is
    /// distinct from an absent one, and its encoding is non-empty.
    pub fn is_empty(&self) -> bool {
        self.signature.is_empty()
            && self.corpus.is_empty()
            && self.root.is_empty()
            && self.path.is_empty()
            && self.language.is_empty()
    }

    /// Canonical byte encoding: the five fields joined by
    /// [`FIELD_SEPARATOR`].
    ///
    /// Fails with [`VNameError::InvalidIdentifier`] if any field contains the
    /// separator byte, which would make the encoding ambiguous.
    pub fn encode(&self) -> Result<Vec<u8>, VNameError> {
        let fields = [
            &self.signature,
            &self.corpus,
            &self.root,
            &self.path,
            &self.language,
        ];
        if fields
            .iter()
            .any(|f| f.as_bytes().contains(&FIELD_SEPARATOR))
        {
            return Err(VNameError::InvalidIdentifier);
        }

        let len = fields.iter().map(|f| f.len()).sum::<usize>() + 4;
        let mut out = Vec::with_capacity(len);
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push(FIELD_SEPARATOR);
            }
            out.extend_from_slice(field.as_bytes());
        }
        Ok(out)
    }

    /// Decode a canonical byte encoding.
    ///
    /// Empty input decodes to the absent identifier (`None`). Any other input
    /// must split into exactly five UTF-8 fields.
    pub fn decode(data: &[u8]) -> Result<Option<Self>, VNameError> {
        if data.is_empty() {
            return Ok(None);
        }
        let parts: Vec<&[u8]> = data.split(|&b| b == FIELD_SEPARATOR).collect();
        let [signature, corpus, root, path, language]: [&[u8]; 5] =
            parts.try_into().map_err(|parts: Vec<&[u8]>| {
                VNameError::MalformedIdentifier(format!("expected 5 fields, got {}", parts.len()))
            })?;
        let field = |bytes: &[u8]| {
            std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| VNameError::MalformedIdentifier(format!("invalid UTF-8: {e}")))
        };
        Ok(Some(Self {
            signature: field(signature)?,
            corpus: field(corpus)?,
            root: field(root)?,
            path: field(path)?,
            language: field(language)?,
        }))
    }
}

impl fmt::Display for VName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.signature, self.corpus, self.root, self.path, self.language
        )
    }
}
