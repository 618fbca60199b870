//! Projection Error Types
//!
//! Mirrors the errno-style conditions a virtual-filesystem host expects:
//! each kind maps onto one POSIX error (`ENOENT`, `ENOTDIR`, `EISDIR`,
//! `EBADF`, `ENOTSUP`) via [`ErrorKind::errno_name`].

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A projection error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for projection operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A path segment did not resolve to any node.
    #[display("no such file or directory: {_0}")]
    NotFound(#[error(not(source))] String),
    /// A directory operation hit a file node.
    #[display("not a directory: {_0}")]
    NotADirectory(#[error(not(source))] String),
    /// A file operation hit a directory node.
    #[display("is a directory: {_0}")]
    IsADirectory(#[error(not(source))] String),
    /// The file handle is unknown (never opened, or already released).
    #[display("bad file handle {_0}")]
    BadHandle(#[error(not(source))] u64),
    /// The projection is read-only; mutating operations always land here.
    #[display("operation not supported: {_0}")]
    NotSupported(#[error(not(source))] &'static str),
    /// Malformed naming template; surfaces at build time, never during
    /// operation.
    #[display("invalid naming template")]
    Template,
    /// The metadata store could not be read at build time.
    #[display("metadata store failure")]
    Metadata,
    /// I/O against the underlying cache file failed.
    #[display("cache file access failed")]
    Io(IoError),
}

impl ErrorKind {
    /// The POSIX errno constant a filesystem host should report for this
    /// condition.
    pub fn errno_name(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "ENOENT",
            Self::NotADirectory(_) => "ENOTDIR",
            Self::IsADirectory(_) => "EISDIR",
            Self::BadHandle(_) => "EBADF",
            Self::NotSupported(_) => "ENOTSUP",
            Self::Template | Self::Metadata | Self::Io(_) => "EIO",
        }
    }
}

impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}
