//! In-memory metadata store.
//!
//! Implements the full [`MetadataStore`] contract, including the
//! stage-then-commit transaction model, against plain collections behind an
//! `RwLock`. Primarily for tests, but deliberately not `#[cfg(test)]`-gated
//! so that downstream crates (and their doc-examples) can use it too.

use crate::error::{ErrorKind, Result};
use crate::models::course::Course;
use crate::models::file::File;
use crate::models::view::View;
use crate::store::{MetadataStore, SyncSelection};
use std::collections::HashSet;
use std::sync::RwLock;

/// Staged ledger mutation, applied in order on commit.
enum Mutation {
    AddCheckout(i64, String),
    ResetCheckouts(i64),
    AddView(View),
}

#[derive(Default)]
struct Inner {
    files: Vec<File>,
    courses: Vec<Course>,
    views: Vec<View>,
    /// Committed checkout ledger: `(view_id, file_id)` pairs.
    checkouts: HashSet<(i64, String)>,
    /// Mutations staged since the last commit.
    pending: Vec<Mutation>,
}

/// In-memory [`MetadataStore`] with transactional staging.
///
/// Reads observe committed state only; staged mutations become visible when
/// [`commit`](MetadataStore::commit) runs and are lost when the store is
/// dropped beforehand, which is exactly the durability contract the view
/// core relies on.
///
/// # Examples
///
/// ```
/// use lectern_metadata::{MemoryStore, MetadataStore};
///
/// let store = MemoryStore::default();
/// store.add_checkout(0, "babe0000")?;
/// assert!(store.list_checkouts(0)?.is_empty()); // not committed yet
/// store.commit()?;
/// assert!(store.list_checkouts(0)?.contains("babe0000"));
/// # Ok::<(), lectern_metadata::error::Error>(())
/// ```
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create a store pre-populated with committed records.
    pub fn with_records(files: impl IntoIterator<Item = File>, courses: impl IntoIterator<Item = Course>) -> Self {
        let inner = Inner {
            files: files.into_iter().collect(),
            courses: courses.into_iter().collect(),
            ..Inner::default()
        };
        Self { inner: RwLock::new(inner) }
    }

    /// Add a committed view record, bypassing the transaction staging.
    /// Convenient for test setup.
    pub fn with_view(self, view: View) -> Self {
        self.write().views.push(view);
        self
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        // A poisoned lock only means some other test thread panicked while
        // holding it; the data itself is still coherent for our purposes.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl MetadataStore for MemoryStore {
    fn list_files(&self, select: SyncSelection) -> Result<Vec<File>> {
        let inner = self.read();
        let policy = |course_id: &str| {
            inner
                .courses
                .iter()
                .find(|c| c.id == course_id)
                .map(|c| c.sync)
                // Files of unknown courses count as fully synchronized;
                // dropping them silently would hide cache corruption.
                .unwrap_or(crate::store::SyncPolicy::Full)
        };
        Ok(inner.files.iter().filter(|f| select.includes(policy(&f.course.id))).cloned().collect())
    }

    fn list_courses(&self, select: SyncSelection) -> Result<Vec<Course>> {
        Ok(self.read().courses.iter().filter(|c| select.includes(c.sync)).cloned().collect())
    }

    fn list_checkouts(&self, view_id: i64) -> Result<HashSet<String>> {
        Ok(self
            .read()
            .checkouts
            .iter()
            .filter(|(view, _)| *view == view_id)
            .map(|(_, file)| file.clone())
            .collect())
    }

    fn add_checkout(&self, view_id: i64, file_id: &str) -> Result<()> {
        if file_id.is_empty() {
            exn::bail!(ErrorKind::InvalidData("file id"));
        }
        self.write().pending.push(Mutation::AddCheckout(view_id, file_id.to_string()));
        Ok(())
    }

    fn reset_checkouts(&self, view_id: i64) -> Result<()> {
        self.write().pending.push(Mutation::ResetCheckouts(view_id));
        Ok(())
    }

    fn list_views(&self) -> Result<Vec<View>> {
        Ok(self.read().views.clone())
    }

    fn add_view(&self, view: View) -> Result<()> {
        self.write().pending.push(Mutation::AddView(view));
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut inner = self.write();
        let staged = std::mem::take(&mut inner.pending);
        let count = staged.len();
        for mutation in staged {
            match mutation {
                Mutation::AddCheckout(view, file) => {
                    inner.checkouts.insert((view, file));
                },
                Mutation::ResetCheckouts(view) => {
                    inner.checkouts.retain(|(v, _)| *v != view);
                },
                Mutation::AddView(view) => inner.views.push(view),
            }
        }
        tracing::debug!(mutations = count, "committed metadata transaction");
        Ok(())
    }
}
