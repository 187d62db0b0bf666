use thiserror::Error;

/// Errors produced by identifier encoding and decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VNameError {
    /// A field of the identifier contains the reserved field separator.
    #[error("identifier field contains reserved separator byte")]
    InvalidIdentifier,

    /// A byte encoding could not be decoded back into an identifier.
    #[error("malformed identifier encoding: {0}")]
    MalformedIdentifier(String),
}
