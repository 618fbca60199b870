//! View removal: unlink managed files, preserve everything foreign.

use super::error::{ErrorKind as SyncErrorKind, Result as SyncResult};
use super::ViewSynchronizer;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use lectern_metadata::MetadataStore;
use std::fs;
use std::path::PathBuf;
use tracing::instrument;

/// What survived a view removal.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemoveReport {
    /// Directories left in place because they (or a descendant) hold files
    /// not managed by this view.
    pub kept: Vec<PathBuf>,
}

impl<S: MetadataStore> ViewSynchronizer<'_, S> {
    /// Tears the view down: unlinks every file identified as belonging to
    /// the content store, removes directories that end up empty, and leaves
    /// anything foreign — files the user created themselves, and every
    /// directory above them — strictly alone.
    ///
    /// Identification is by inode, so managed files are found and removed
    /// wherever the user moved or renamed them. On success the synchronizer
    /// is spent: any further operation fails with
    /// [`ViewNotFound`](ErrorKind::ViewNotFound).
    #[instrument(skip(self))]
    pub fn remove(&mut self) -> Result<RemoveReport> {
        let report = {
            let view = self.require_view()?;
            let has_base = view.base.as_deref().is_some_and(|base| !base.is_empty());
            self.remove_inner(has_base).or_raise(|| ErrorKind::Remove)?
        };
        self.view = None;
        Ok(report)
    }

    fn remove_inner(&self, has_base: bool) -> SyncResult<RemoveReport> {
        let mut directories = Vec::new();
        let mut kept = Vec::new();
        for listing in self.walk()? {
            let mut foreign = false;
            for (path, key) in &listing.files {
                if self.existing_keys.contains(key) {
                    fs::remove_file(path).or_raise(|| SyncErrorKind::Unlink(path.clone()))?;
                } else {
                    foreign = true;
                }
            }
            if foreign {
                kept.push(listing.dir);
            }
            directories.extend(listing.subdirs);
        }

        // Deepest first, so an empty subtree collapses upward; a kept
        // directory anywhere below shields the whole ancestor chain.
        directories.sort_by(|a, b| b.as_os_str().len().cmp(&a.as_os_str().len()).then_with(|| a.cmp(b)));
        let report_kept = kept.clone();
        for dir in directories {
            if kept.iter().any(|survivor| survivor.starts_with(&dir)) {
                continue;
            }
            if let Err(err) = fs::remove_dir(&dir) {
                // Something appeared since the walk; treat it exactly like
                // foreign content.
                tracing::debug!(dir = %dir.display(), "directory not removed: {err}");
                kept.push(dir);
            }
        }

        // The view root itself goes only when it is a dedicated base
        // directory and nothing below survived.
        if has_base && kept.is_empty() {
            let _ = fs::remove_dir(&self.view_dir);
        }
        if !report_kept.is_empty() {
            tracing::info!(count = report_kept.len(), "kept directories containing unmanaged files");
        }
        Ok(RemoveReport { kept: report_kept })
    }
}
