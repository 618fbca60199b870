//! The content-addressed file record.

use time::OffsetDateTime;

/// Course linkage fields carried on every [`File`] so that path templates
/// can be rendered without a second lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRef {
    /// Opaque course identifier (server-assigned, hex-ish).
    pub id: String,
    pub name: String,
    pub abbrev: String,
    /// Human-readable course type, e.g. "Lecture".
    pub course_type: String,
    pub type_abbrev: String,
    /// Semester label as the server spells it, e.g. "WS 2016/17".
    pub semester: String,
}

/// A content-addressed artifact known to the metadata store.
///
/// Identity is the pair `(id, version)`: `id` is an opaque content key and
/// `version` counts re-uploads of the same logical document (0 = original).
/// Everything else is presentation metadata used by the path template
/// formatter.
///
/// Two things are deliberately *not* fields here: the location of the file
/// in the content store and the inode of its on-disk hardlink. Both are
/// derived from live filesystem state during a reconciliation pass and must
/// never be persisted; the `lectern-view` crate wraps `File` in its own
/// type for the duration of a pass instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// Opaque content key.
    pub id: String,
    /// Non-negative version counter; 0 is the original upload.
    pub version: u32,
    /// Bare file name, without extension.
    pub name: String,
    /// File extension without the leading dot; may be empty.
    pub extension: String,
    /// Server-side description, conventionally `<name>.<extension>`.
    pub description: String,
    /// Ordered folder sequence as stored server-side.
    pub path: Vec<String>,
    pub course: CourseRef,
    pub author: String,
    /// Upload timestamp in the user's local timezone.
    pub local_date: OffsetDateTime,
    /// Whether the server flagged this file with a copyright notice.
    pub copyrighted: bool,
}
