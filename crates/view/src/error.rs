//! View Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Operation submodules carry their own finer-grained
//! kinds which are wrapped into these before crossing the crate boundary.

use derive_more::{Display, Error};

/// A view error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for view operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The operation targeted a view that does not exist (never configured,
    /// or invalidated by a prior removal). Fails fast, before any mutation.
    #[display("view does not exist")]
    ViewNotFound,
    /// Malformed naming template or unresolvable token. Reported before
    /// any filesystem mutation.
    #[display("invalid naming template: {_0}")]
    Template(#[error(not(source))] String),
    /// The reconciliation pass could not complete.
    #[display("view reconciliation failed")]
    Reconcile,
    /// The checkout pass failed after best-effort completion and
    /// finalization.
    #[display("view checkout failed")]
    Checkout,
    /// The removal pass failed.
    #[display("view removal failed")]
    Remove,
    /// The metadata store refused a ledger operation.
    #[display("metadata store failure")]
    Metadata,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Checkout and removal are convergent: a re-run after a transient
        // filesystem error picks up where the last pass stopped.
        matches!(self, Self::Checkout | Self::Remove | Self::Metadata)
    }
}
