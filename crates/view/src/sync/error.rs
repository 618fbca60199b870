//! Error types for the [`sync`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree
//! construction. These kinds stay inside the crate; public APIs wrap them
//! into [`crate::error::ErrorKind`] variants.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A sync error with automatic location tracking via [`exn::Exn`].
pub(crate) type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync internals.
pub(crate) type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a reconciliation/checkout/removal failure.
#[derive(Debug, Display, Error)]
pub(crate) enum ErrorKind {
    /// A metadata store operation (listing, ledger mutation, commit) failed.
    #[display("metadata store operation failed")]
    Metadata,
    /// Walking the view directory tree failed.
    #[display("cannot walk view tree at {}", _0.display())]
    Walk(#[error(not(source))] PathBuf),
    /// Creating a hardlink (or its parent directories) failed.
    #[display("cannot link {}", _0.display())]
    Link(#[error(not(source))] PathBuf),
    /// Removing a managed link failed.
    #[display("cannot unlink {}", _0.display())]
    Unlink(#[error(not(source))] PathBuf),
    /// The content store could not be inspected.
    #[display("content store inspection failed")]
    Store,
}
