use thiserror::Error;

/// Errors from rewrite rule parsing.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// A rule's pattern is not a valid regular expression.
    #[error("invalid rule pattern: {0}")]
    InvalidPattern(String),

    /// A rules file could not be parsed.
    #[error("invalid rules file: {0}")]
    InvalidRules(#[from] serde_json::Error),
}

/// Result alias for rewrite operations.
pub type RewriteResult<T> = Result<T, RewriteError>;
