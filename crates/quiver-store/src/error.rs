use quiver_types::VNameError;

/// Errors from entry store and backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An identifier could not be encoded or decoded.
    #[error("identifier error: {0}")]
    Identifier(#[from] VNameError),

    /// Exactly one of edge kind and target was supplied; they must be
    /// jointly present (edge fact) or jointly absent (node fact).
    #[error("edge kind and target must be both present or both absent")]
    KindTargetMismatch,

    /// A key component contains the reserved entry key separator.
    #[error("{0} contains the entry key separator")]
    SeparatorInField(&'static str),

    /// An update carries an empty fact name.
    #[error("update is missing a fact name")]
    MissingFactName,

    /// A stored key could not be parsed back into an entry. Indicates
    /// backend corruption or a foreign writer.
    #[error("malformed entry key: {0}")]
    MalformedKey(String),

    /// Shard parameters out of range: the shard count must be at least 1 and
    /// the index must be within it.
    #[error("invalid shard parameters: index {index} of {shards} shards")]
    InvalidShardParameters { shards: u64, index: u64 },

    /// Closing a batch writer failed; durability of the batch is
    /// unspecified.
    #[error("writer close failed: {0}")]
    WriterCloseFailed(String),

    /// An error surfaced by the underlying key-value backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error from a disk-backed backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
