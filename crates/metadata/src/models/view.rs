//! The view record and its naming policy enums.

use serde::{Deserialize, Serialize};

/// Target character repertoire for escaped path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    /// Anything goes except characters the filesystem itself reserves.
    Unicode,
    /// Portable ASCII only; non-ASCII characters are transliterated or
    /// substituted.
    Ascii,
}

/// How characters outside the allowed repertoire are substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMode {
    /// Replace disallowed characters with visually similar allowed ones
    /// (e.g. `/` becomes the Unicode fraction slash).
    Similar,
    /// Replace disallowed characters with plain characters found on any
    /// keyboard.
    Typeable,
}

/// A named, templated projection of the content store onto a directory tree.
///
/// Exactly one view may be materialized into a given directory subtree at a
/// time; multiple views coexist in different subtrees via `base`. Views are
/// created by configuration (or the system default bootstrap) and are
/// immutable afterwards as far as this workspace is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub id: i64,
    /// Human-readable name, for logs and configuration only.
    pub name: String,
    /// Naming template with `{token}` placeholders, compiled by
    /// `lectern-view` at use time.
    pub format: String,
    pub escape: EscapeMode,
    pub charset: Charset,
    /// Subdirectory of the sync root this view materializes into. When
    /// absent, the view root is the sync root itself.
    #[serde(default)]
    pub base: Option<String>,
}
