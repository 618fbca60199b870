//! The course record.

use crate::store::SyncPolicy;

/// A course known to the metadata store.
///
/// The view core only uses courses for one thing: deriving placeholder
/// directories for courses that have no cached files yet, so that an empty
/// course still shows up in the synchronized tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    /// Opaque course identifier.
    pub id: String,
    pub name: String,
    pub abbrev: String,
    /// Human-readable course type, e.g. "Lecture".
    pub course_type: String,
    pub type_abbrev: String,
    /// Semester label as the server spells it, e.g. "SS 2016".
    pub semester: String,
    /// How much of this course the user asked to synchronize.
    pub sync: SyncPolicy,
}
