//! Relative-path validation for templated view paths.
//!
//! Every path the template formatter produces is joined under the view
//! root before any filesystem mutation. Escaping guarantees individual
//! tokens contain no separator, but template *literals* are user
//! configuration and could smuggle in `..` or absolute components, so the
//! assembled path is validated as a whole before use.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Validates a template-rendered relative path.
///
/// Normalizes away empty and `.` components (a template like
/// `"{path}/{name}.{ext}"` legitimately renders a doubled separator when
/// the folder sequence is empty) and rejects anything that could place a
/// link outside the view root: parent references, absolute paths, drive
/// prefixes and embedded NUL bytes. Unlike a generic resolver, `..` is
/// rejected outright rather than folded away — no sane naming template
/// produces one, so its presence is a configuration error worth surfacing.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use lectern_store::validate_path;
///
/// assert_eq!(validate_path("Algorithms//slides.pdf").unwrap(), Path::new("Algorithms/slides.pdf"));
/// assert!(validate_path("../escape").is_err());
/// assert!(validate_path("/absolute").is_err());
/// assert!(validate_path("").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let reject = || ErrorKind::InvalidPath(path.to_path_buf());
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => {
                // NUL survives Path parsing on Unix but truncates the
                // string at syscall level; never let one through.
                if segment.as_encoded_bytes().contains(&0) {
                    exn::bail!(reject());
                }
                out.push(segment);
            },
            // `a//b` and `a/./b` are normalization artifacts, not attacks.
            Component::CurDir => {},
            Component::RootDir | Component::Prefix(_) | Component::ParentDir => exn::bail!(reject()),
        }
    }
    if out.as_os_str().is_empty() {
        exn::bail!(reject());
    }
    Ok(out)
}
