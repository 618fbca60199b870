//! Checkout: hardlink new cached files into the view tree.

use super::error::{ErrorKind as SyncErrorKind, Result as SyncResult};
use super::{CachedFile, ViewSynchronizer};
use crate::error::{ErrorKind, Result};
use crate::template::{PathTemplate, Tokens};
use crate::util::ellipsize;
use exn::ResultExt;
use lectern_metadata::{MetadataStore, SyncSelection, View};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::instrument;

/// What a checkout pass actually did, in link order. Paths are relative to
/// the view directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckoutReport {
    /// Files newly hardlinked into the view.
    pub linked: Vec<PathBuf>,
    /// Subset of `linked` whose records are flagged as copyright-protected.
    pub copyrighted: Vec<PathBuf>,
    /// Placeholder directories created for courses with no files yet.
    pub course_dirs: Vec<PathBuf>,
}

impl<S: MetadataStore> ViewSynchronizer<'_, S> {
    /// Links every file classified as new into the view tree, records each
    /// link in the checkout ledger, and synthesizes directory modification
    /// times bottom-up over the touched subtrees.
    ///
    /// Template errors abort before any filesystem mutation. Per-file link
    /// errors do not: the pass continues with the remaining files, the
    /// ledger commit and the mtime synthesis still run, and the first error
    /// is returned at the end. Files whose target path is already occupied
    /// are skipped, which makes a repeated checkout a no-op.
    #[instrument(skip(self))]
    pub fn checkout(&self) -> Result<CheckoutReport> {
        let view = self.require_view()?;
        let template: PathTemplate = view.format.parse()?;

        // Render every target path up front so a bad template cannot leave
        // a half-linked tree behind.
        let mut plan = Vec::with_capacity(self.new_files.len());
        for cached in &self.new_files {
            let rel = template.render(&Tokens::for_file(cached, view, &self.general_folder))?;
            plan.push((cached, rel));
        }

        self.checkout_inner(view, &template, plan).or_raise(|| ErrorKind::Checkout)
    }

    fn checkout_inner(
        &self,
        view: &View,
        template: &PathTemplate,
        plan: Vec<(&CachedFile, PathBuf)>,
    ) -> SyncResult<CheckoutReport> {
        let mut modified: HashSet<PathBuf> = HashSet::new();
        let mut pending = Vec::new();
        for (cached, rel) in plan {
            let mut ancestor = rel.parent();
            while let Some(dir) = ancestor {
                if !dir.as_os_str().is_empty() {
                    modified.insert(dir.to_path_buf());
                }
                ancestor = dir.parent();
            }
            let absolute = self.view_dir.join(&rel);
            // Occupied targets are left alone; whatever sits there wins.
            if !absolute.is_file() {
                pending.push((cached, rel, absolute));
            }
        }

        let total = pending.len();
        let mut report = CheckoutReport::default();
        let mut first_error: Option<super::error::Error> = None;
        for (index, (cached, rel, absolute)) in pending.into_iter().enumerate() {
            tracing::info!(
                path = %ellipsize(&rel.display().to_string(), 60),
                "linking file {} of {total}",
                index + 1,
            );
            match self.link_one(view, cached, &absolute) {
                Ok(()) => {
                    if cached.copyrighted {
                        report.copyrighted.push(rel.clone());
                    }
                    report.linked.push(rel);
                },
                Err(err) => {
                    tracing::warn!(file = %cached.id, "failed to link file: {err}");
                    first_error.get_or_insert(err);
                },
            }
        }

        // Finalization always runs, even after per-file failures: whatever
        // was linked must be ledgered and the touched directories dated.
        let committed = self.store.commit().or_raise(|| SyncErrorKind::Metadata);
        self.synthesize_mtimes(&modified, view);

        if !report.copyrighted.is_empty() {
            tracing::warn!(
                count = report.copyrighted.len(),
                "checked out files marked as copyright-protected; personal study use only"
            );
        }

        committed?;
        if let Some(err) = first_error {
            return Err(err);
        }

        report.course_dirs = self.create_course_dirs(view, template)?;
        Ok(report)
    }

    fn link_one(&self, view: &View, cached: &CachedFile, absolute: &Path) -> SyncResult<()> {
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).or_raise(|| SyncErrorKind::Link(absolute.to_path_buf()))?;
        }
        fs::hard_link(&cached.cache_path, absolute)
            .or_raise(|| SyncErrorKind::Link(absolute.to_path_buf()))?;
        self.store.add_checkout(view.id, &cached.id).or_raise(|| SyncErrorKind::Metadata)
    }

    /// Creates the directory prefix of every synced course's templated path
    /// so that empty courses still show up in the view. Best-effort: a
    /// course whose template collapses to no directory part is skipped.
    fn create_course_dirs(&self, view: &View, template: &PathTemplate) -> SyncResult<Vec<PathBuf>> {
        let mut created = Vec::new();
        let courses =
            self.store.list_courses(SyncSelection::synced()).or_raise(|| SyncErrorKind::Metadata)?;
        for course in courses {
            let Ok(rendered) = template.render(&Tokens::for_course(&course, view)) else {
                continue;
            };
            let Some(dir) = rendered.parent().filter(|d| !d.as_os_str().is_empty()) else {
                continue;
            };
            let absolute = self.view_dir.join(dir);
            if !absolute.is_dir() {
                fs::create_dir_all(&absolute)
                    .or_raise(|| SyncErrorKind::Link(absolute.clone()))?;
                created.push(dir.to_path_buf());
            }
        }
        Ok(created)
    }

    /// Stamps every directory touched by this pass with the maximum
    /// modification time of its visible direct children, deepest first so
    /// parents aggregate already-updated children, then the view root and
    /// finally the sync root.
    fn synthesize_mtimes(&self, modified: &HashSet<PathBuf>, view: &View) {
        let mut dirs: Vec<&PathBuf> = modified.iter().collect();
        dirs.sort_by(|a, b| b.as_os_str().len().cmp(&a.as_os_str().len()).then_with(|| a.cmp(b)));
        for rel in dirs {
            update_directory_mtime(&self.view_dir.join(rel));
        }
        if view.base.as_deref().is_some_and(|base| !base.is_empty()) {
            update_directory_mtime(&self.view_dir);
        }
        update_directory_mtime(self.content.sync_dir());
    }
}

/// Sets a directory's mtime to the maximum mtime of its visible (non-dot)
/// direct children. Missing or empty directories are silently left alone;
/// this is cosmetic bookkeeping and never fails a checkout.
fn update_directory_mtime(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut latest: Option<SystemTime> = None;
    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|meta| meta.modified()) {
            latest = Some(latest.map_or(modified, |seen| seen.max(modified)));
        }
    }
    let Some(latest) = latest else {
        return;
    };
    if let Ok(handle) = fs::File::open(dir) {
        let _ = handle.set_modified(latest);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::ViewSynchronizer;
    use lectern_metadata::{MemoryStore, SyncPolicy};
    use lectern_store::ContentStore;
    use std::time::Duration;

    fn open<'a>(
        store: &'a MemoryStore,
        content: &'a ContentStore,
        view: &lectern_metadata::View,
    ) -> ViewSynchronizer<'a, MemoryStore> {
        ViewSynchronizer::open(store, content, view.clone(), "General Files").unwrap()
    }

    #[test]
    fn test_checkout_links_new_files_and_ledgers_them() {
        let tmp = tempfile::tempdir().unwrap();
        let content = ContentStore::open(tmp.path()).unwrap();
        let course = make_course("c1", "Algorithms");
        let mut file = make_file("f1", "slides", &course);
        file.path = vec!["Lectures".to_string()];
        let store = populate(&content, &[file], &[course]);
        let view = make_view("{course}/{path}/{name}.{ext}", None);

        let report = open(&store, &content, &view).checkout().unwrap();

        let target = tmp.path().join("Algorithms/Lectures/slides.pdf");
        assert!(target.is_file());
        assert_eq!(report.linked, vec![PathBuf::from("Algorithms/Lectures/slides.pdf")]);
        assert!(store.list_checkouts(view.id).unwrap().contains("f1"));
        // Hardlink, not a copy: same inode as the store file.
        let a = content.stat_key(&content.cache_path("f1", 0)).unwrap().unwrap();
        let b = content.stat_key(&target).unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_checkout_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let content = ContentStore::open(tmp.path()).unwrap();
        let course = make_course("c1", "Algorithms");
        let store = populate(&content, &[make_file("f1", "slides", &course)], &[course]);
        let view = make_view("{course}/{name}.{ext}", None);

        open(&store, &content, &view).checkout().unwrap();
        let second = open(&store, &content, &view);
        assert_eq!(second.reconciliation().healthy, 1);
        let report = second.checkout().unwrap();
        assert!(report.linked.is_empty());
    }

    #[test]
    fn test_checkout_into_view_base() {
        let tmp = tempfile::tempdir().unwrap();
        let content = ContentStore::open(tmp.path()).unwrap();
        let course = make_course("c1", "Algorithms");
        let store = populate(&content, &[make_file("f1", "slides", &course)], &[course]);
        let view = make_view("{course}/{name}.{ext}", Some("by-course"));

        open(&store, &content, &view).checkout().unwrap();
        assert!(tmp.path().join("by-course/Algorithms/slides.pdf").is_file());
    }

    #[test]
    fn test_checkout_fails_fast_on_bad_template() {
        let tmp = tempfile::tempdir().unwrap();
        let content = ContentStore::open(tmp.path()).unwrap();
        let course = make_course("c1", "Algorithms");
        let store = populate(&content, &[make_file("f1", "slides", &course)], &[course.clone()]);
        let view = make_view("{course}/{bogus}", None);

        let err = open(&store, &content, &view).checkout().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Template(_)));
        // Nothing was linked or ledgered.
        assert!(!tmp.path().join("Algorithms").exists());
        assert!(store.list_checkouts(view.id).unwrap().is_empty());
    }

    #[test]
    fn test_checkout_versioned_file_name() {
        let tmp = tempfile::tempdir().unwrap();
        let content = ContentStore::open(tmp.path()).unwrap();
        let course = make_course("c1", "Algorithms");
        let mut file = make_file("f1", "slides", &course);
        file.version = 1;
        let store = populate(&content, &[file], &[course]);
        let view = make_view("{course}/{name}.{ext}", None);

        open(&store, &content, &view).checkout().unwrap();
        assert!(tmp.path().join("Algorithms/slides (Version 2).pdf").is_file());
    }

    #[test]
    fn test_checkout_reports_copyrighted_files() {
        let tmp = tempfile::tempdir().unwrap();
        let content = ContentStore::open(tmp.path()).unwrap();
        let course = make_course("c1", "Algorithms");
        let mut file = make_file("f1", "protected", &course);
        file.copyrighted = true;
        let store = populate(&content, &[file], &[course]);
        let view = make_view("{course}/{name}.{ext}", None);

        let report = open(&store, &content, &view).checkout().unwrap();
        assert_eq!(report.copyrighted, vec![PathBuf::from("Algorithms/protected.pdf")]);
    }

    #[test]
    fn test_checkout_creates_empty_course_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let content = ContentStore::open(tmp.path()).unwrap();
        let busy = make_course("c1", "Algorithms");
        let mut empty = make_course("c2", "Databases");
        empty.sync = SyncPolicy::Full;
        let store = populate(&content, &[make_file("f1", "slides", &busy)], &[busy, empty]);
        let view = make_view("{course}/{name}.{ext}", None);

        let report = open(&store, &content, &view).checkout().unwrap();
        assert!(tmp.path().join("Databases").is_dir());
        assert!(report.course_dirs.contains(&PathBuf::from("Databases")));
        // The busy course's directory already existed from linking.
        assert!(!report.course_dirs.contains(&PathBuf::from("Algorithms")));
    }

    #[test]
    fn test_checkout_continues_past_occupied_target() {
        let tmp = tempfile::tempdir().unwrap();
        let content = ContentStore::open(tmp.path()).unwrap();
        let course = make_course("c1", "Algorithms");
        let files = vec![make_file("f1", "taken", &course), make_file("f2", "free", &course)];
        let store = populate(&content, &files, &[course]);
        let view = make_view("{course}/{name}.{ext}", None);

        // A foreign file already occupies f1's target path.
        let dir = tmp.path().join("Algorithms");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("taken.pdf"), b"user's own notes").unwrap();

        let report = open(&store, &content, &view).checkout().unwrap();
        assert_eq!(report.linked, vec![PathBuf::from("Algorithms/free.pdf")]);
        assert_eq!(fs::read(dir.join("taken.pdf")).unwrap(), b"user's own notes");
    }

    #[test]
    fn test_link_failure_is_isolated_and_finalized() {
        let tmp = tempfile::tempdir().unwrap();
        let content = ContentStore::open(tmp.path()).unwrap();
        let course = make_course("c1", "Algorithms");
        let mut blocked = make_file("f1", "blocked", &course);
        blocked.path = vec!["Handouts".to_string()];
        let files = vec![blocked, make_file("f2", "free", &course)];
        let store = populate(&content, &files, &[course]);
        let view = make_view("{course}/{path}/{name}.{ext}", None);

        // A regular file occupies f1's parent directory path, so creating
        // its directory (and the link below it) must fail.
        let dir = tmp.path().join("Algorithms");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Handouts"), b"in the way").unwrap();

        let err = open(&store, &content, &view).checkout().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Checkout));

        // The failure is isolated: the other file is linked and its
        // checkout committed; the failed file never enters the ledger.
        assert!(tmp.path().join("Algorithms/free.pdf").is_file());
        let ledger = store.list_checkouts(view.id).unwrap();
        assert!(ledger.contains("f2"));
        assert!(!ledger.contains("f1"));

        // The next pass converges: only the failed file is still new.
        fs::remove_file(dir.join("Handouts")).unwrap();
        let second = open(&store, &content, &view);
        assert_eq!(second.reconciliation().new, 1);
        second.checkout().unwrap();
        assert!(tmp.path().join("Algorithms/Handouts/blocked.pdf").is_file());
    }

    #[test]
    fn test_directory_mtimes_follow_newest_child() {
        let tmp = tempfile::tempdir().unwrap();
        let content = ContentStore::open(tmp.path()).unwrap();
        let course = make_course("c1", "Algorithms");
        let mut file = make_file("f1", "slides", &course);
        file.path = vec!["Lectures".to_string()];
        let store = populate(&content, &[file], &[course]);
        let view = make_view("{course}/{path}/{name}.{ext}", None);

        // Backdate the cache file; the hardlink shares its mtime.
        let old = SystemTime::now() - Duration::from_secs(7 * 24 * 3600);
        fs::File::open(content.cache_path("f1", 0)).unwrap().set_modified(old).unwrap();

        open(&store, &content, &view).checkout().unwrap();

        let leaf_dir = tmp.path().join("Algorithms/Lectures");
        let leaf = fs::metadata(leaf_dir.join("slides.pdf")).unwrap().modified().unwrap();
        assert_eq!(fs::metadata(&leaf_dir).unwrap().modified().unwrap(), leaf);
        assert_eq!(fs::metadata(tmp.path().join("Algorithms")).unwrap().modified().unwrap(), leaf);
    }
}
