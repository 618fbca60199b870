//! The metadata store facade.
//!
//! The real store is an embedded database maintained by the download side
//! of the application, which is not part of this workspace. The view core
//! only needs the operations below: transactional listing of files,
//! courses and views, and mutation of the checkout ledger.

use crate::error::Result;
use crate::models::course::Course;
use crate::models::file::File;
use crate::models::view::View;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How much of a course the user asked to synchronize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPolicy {
    /// Download metadata and file contents.
    Full,
    /// Track metadata, never download contents.
    MetadataOnly,
    /// Ignore the course entirely.
    None,
}

/// Filter for listing operations, selecting records by the sync policy of
/// their (owning) course.
///
/// Fully synchronized courses are always included; the two flags opt
/// metadata-only and unsynchronized courses in as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncSelection {
    pub metadata_only: bool,
    pub unsynced: bool,
}

impl SyncSelection {
    /// Only courses the user fully synchronizes. This is what every view
    /// operation wants: files that can actually exist in the content store.
    pub const fn synced() -> Self {
        Self { metadata_only: false, unsynced: false }
    }

    /// Everything the store knows about, regardless of policy.
    pub const fn all() -> Self {
        Self { metadata_only: true, unsynced: true }
    }

    /// Whether a course with the given policy passes this filter.
    pub fn includes(&self, policy: SyncPolicy) -> bool {
        match policy {
            SyncPolicy::Full => true,
            SyncPolicy::MetadataOnly => self.metadata_only,
            SyncPolicy::None => self.unsynced,
        }
    }
}

/// Transactional access to file, course, view and checkout records.
///
/// # Transaction model
///
/// Ledger mutations ([`add_checkout`](Self::add_checkout),
/// [`reset_checkouts`](Self::reset_checkouts), [`add_view`](Self::add_view))
/// are staged and only become durable — and visible to subsequent reads —
/// on [`commit`](Self::commit). A commit either fully lands or is entirely
/// absent after a restart; there is no partial commit. The trait provides
/// at-most-one-writer semantics per commit but no locking across callers:
/// anyone driving a view must serialize its passes externally.
pub trait MetadataStore {
    /// List file records whose course passes `select`, in a stable order.
    fn list_files(&self, select: SyncSelection) -> Result<Vec<File>>;

    /// List course records passing `select`, in a stable order.
    fn list_courses(&self, select: SyncSelection) -> Result<Vec<Course>>;

    /// File ids currently checked out into the given view.
    fn list_checkouts(&self, view_id: i64) -> Result<HashSet<String>>;

    /// Stage a checkout record for `(view_id, file_id)`. Staging the same
    /// pair twice is not an error; the ledger is a set.
    fn add_checkout(&self, view_id: i64, file_id: &str) -> Result<()>;

    /// Stage removal of every checkout record of the given view.
    fn reset_checkouts(&self, view_id: i64) -> Result<()>;

    /// All configured views, in creation order.
    fn list_views(&self) -> Result<Vec<View>>;

    /// Stage insertion of a new view.
    fn add_view(&self, view: View) -> Result<()>;

    /// Atomically flush all staged mutations.
    fn commit(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SyncSelection::synced(), [true, false, false])]
    #[case(SyncSelection::all(), [true, true, true])]
    #[case(SyncSelection { metadata_only: true, unsynced: false }, [true, true, false])]
    #[case(SyncSelection { metadata_only: false, unsynced: true }, [true, false, true])]
    fn test_selection_includes(#[case] select: SyncSelection, #[case] expected: [bool; 3]) {
        let policies = [SyncPolicy::Full, SyncPolicy::MetadataOnly, SyncPolicy::None];
        assert_eq!(policies.map(|policy| select.includes(policy)), expected);
    }
}
