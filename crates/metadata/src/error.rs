//! Metadata Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, following the same shape as every other crate in this
//! workspace.

use derive_more::{Display, Error};

/// A metadata error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for metadata store operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A record field could not be represented by the backing store.
    #[display("invalid {_0} in metadata record")]
    InvalidData(#[error(not(source))] &'static str),
    /// The view referenced by an operation is not known to the store.
    #[display("no view with id {_0}")]
    UnknownView(#[error(not(source))] i64),
    /// Backing store failure (connection, transaction, corruption).
    #[display("metadata store error: {_0}")]
    Store(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
