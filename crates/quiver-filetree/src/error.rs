use quiver_store::StoreError;

/// Errors from file tree construction and lookup.
#[derive(Debug, thiserror::Error)]
pub enum FileTreeError {
    /// An underlying store or backend operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A table record could not be serialized or deserialized.
    #[error("record serialization error: {0}")]
    Serialization(String),

    /// The serving table is missing its corpus-roots record.
    #[error("missing corpus roots record in directory table")]
    MissingCorpusRoots,
}

/// Result alias for file tree operations.
pub type FileTreeResult<T> = Result<T, FileTreeError>;
