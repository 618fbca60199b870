//! Configuration Error Types

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The merged configuration sources could not be extracted into
    /// [`Settings`](crate::Settings).
    #[display("cannot load configuration")]
    Extract(figment::Error),
    /// A required setting is absent and has no derivable default.
    #[display("missing required setting `{_0}`")]
    Missing(#[error(not(source))] &'static str),
    /// The metadata store refused a view bootstrap operation.
    #[display("metadata store failure")]
    Metadata,
}
