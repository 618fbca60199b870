//! View synchronization.
//!
//! A [`ViewSynchronizer`] is opened against one view and performs the
//! reconciliation pass at construction: it discovers which cached files are
//! still physically present under the view directory by *inode* comparison,
//! then reconciles that physical state against the checkout ledger. The
//! resulting classification drives the other operations — [`checkout`],
//! [`remove`] and [`reset_deleted`] — which live in their own submodules.
//!
//! Identity-by-inode is the load-bearing trick: hardlinks preserve the
//! `(device, inode)` pair however the user renames or moves them inside the
//! view, so reconciliation survives arbitrary reorganization without any
//! bookkeeping of its own.
//!
//! [`checkout`]: ViewSynchronizer::checkout
//! [`remove`]: ViewSynchronizer::remove
//! [`reset_deleted`]: ViewSynchronizer::reset_deleted

mod checkout;
pub(crate) mod error;
mod remove;

pub use self::checkout::CheckoutReport;
pub use self::remove::RemoveReport;
use self::error::{ErrorKind as SyncErrorKind, Result as SyncResult};
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use lectern_metadata::{File, MetadataStore, SyncSelection, View};
use lectern_store::{ContentStore, FileKey};
use std::collections::HashSet;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// A [`File`] that is physically present in the content store, enriched
/// with the live state a reconciliation pass needs: its location in the
/// store and its filesystem identity key.
///
/// Both enrichments are derived from a live `lstat` and are only valid for
/// the duration of the pass that produced them — which is why they live on
/// this wrapper instead of on [`File`] itself, where they could leak into
/// persistence.
#[derive(Debug, Clone)]
pub struct CachedFile {
    file: File,
    /// Location of the file in the content store.
    pub cache_path: PathBuf,
    /// Filesystem identity observed at reconciliation time.
    pub key: FileKey,
}

impl Deref for CachedFile {
    type Target = File;
    fn deref(&self) -> &File {
        &self.file
    }
}

/// Summary of one reconciliation pass: how the cached-file set was
/// partitioned. The four counts are disjoint and sum to the number of
/// cached files considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// Cached files never linked into this view; candidates for checkout.
    pub new: usize,
    /// Ledgered files whose link is gone: the user deleted them on purpose,
    /// and they stay gone until an explicit reset.
    pub deleted: usize,
    /// Linked and ledgered; nothing to do.
    pub healthy: usize,
    /// Linked but missing from the ledger; a checkout record was inserted
    /// to repair the loss (e.g. after a prior reset with surviving links).
    pub healed: usize,
}

/// One directory visited by [`walk_view`].
struct WalkedDir {
    dir: PathBuf,
    /// Regular files in this directory with their identity keys.
    files: Vec<(PathBuf, FileKey)>,
    subdirs: Vec<PathBuf>,
}

/// Walks the view directory tree, always excluding the reserved metadata
/// subtree. A view directory that does not exist yet yields an empty walk.
///
/// Entries are visited in name order so that classification and unlink
/// sequences are stable across runs.
fn walk_view(view_dir: &Path, meta_dir: &Path) -> SyncResult<Vec<WalkedDir>> {
    let mut listings = Vec::new();
    let mut stack = vec![view_dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        if current == meta_dir {
            continue;
        }
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err).or_raise(|| SyncErrorKind::Walk(current)),
        };
        let mut listing = WalkedDir { dir: current.clone(), files: Vec::new(), subdirs: Vec::new() };
        let mut children: Vec<_> = entries
            .collect::<std::io::Result<Vec<_>>>()
            .or_raise(|| SyncErrorKind::Walk(current))?;
        children.sort_by_key(|entry| entry.file_name());
        for entry in children {
            let path = entry.path();
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                // The entry vanished mid-walk; reconciliation will simply
                // not see it, same as if it was deleted a moment earlier.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err).or_raise(|| SyncErrorKind::Walk(path)),
            };
            if meta.is_dir() {
                if path != meta_dir {
                    listing.subdirs.push(path.clone());
                    stack.push(path);
                }
            } else if meta.is_file() {
                listing.files.push((path, FileKey::from(&meta)));
            }
            // Symlinks and other node types are not ours; ignore them.
        }
        listings.push(listing);
    }
    Ok(listings)
}

/// Synchronizes one view directory with the content store and the checkout
/// ledger.
///
/// Opening the synchronizer runs the reconciliation pass (including the
/// transactional self-heal commit); the instance then holds the resulting
/// classification for the follow-up operation. Passes over the same view
/// must be serialized by the caller — the ledger commit is atomic, but
/// nothing here locks out a second concurrent synchronizer.
///
/// # Examples
///
/// ```no_run
/// use lectern_metadata::{MemoryStore, MetadataStore};
/// use lectern_store::ContentStore;
/// use lectern_view::ViewSynchronizer;
///
/// let store = MemoryStore::default();
/// let content = ContentStore::open("/home/user/Courses")?;
/// let view = store.list_views()?.first().cloned().expect("a configured view");
///
/// let sync = ViewSynchronizer::open(&store, &content, view, "General Files")?;
/// let report = sync.checkout()?;
/// println!("linked {} new files", report.linked.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ViewSynchronizer<'a, S: MetadataStore> {
    pub(crate) store: &'a S,
    pub(crate) content: &'a ContentStore,
    /// `None` once the view has been removed; every operation checks this.
    pub(crate) view: Option<View>,
    pub(crate) view_dir: PathBuf,
    pub(crate) general_folder: String,
    /// Identity keys of cached files found somewhere under the view root.
    pub(crate) existing_keys: HashSet<FileKey>,
    pub(crate) new_files: Vec<CachedFile>,
    pub(crate) deleted_files: Vec<CachedFile>,
    summary: Reconciliation,
}

impl<'a, S: MetadataStore> ViewSynchronizer<'a, S> {
    /// Opens the view and performs the reconciliation pass.
    ///
    /// `general_folder` is the server-specific sentinel the `short-path`
    /// template token strips; it comes from configuration.
    #[instrument(skip_all, fields(view = %view.name))]
    pub fn open(
        store: &'a S,
        content: &'a ContentStore,
        view: View,
        general_folder: impl Into<String>,
    ) -> Result<Self> {
        Self::open_inner(store, content, view, general_folder.into()).or_raise(|| ErrorKind::Reconcile)
    }

    fn open_inner(store: &'a S, content: &'a ContentStore, view: View, general_folder: String) -> SyncResult<Self> {
        let view_dir = match view.base.as_deref() {
            Some(base) if !base.is_empty() => content.sync_dir().join(base),
            _ => content.sync_dir().to_path_buf(),
        };

        // 1. Every file the store knows about that is physically cached,
        //    with its identity key captured via lstat.
        let mut fetched = Vec::new();
        for file in store.list_files(SyncSelection::synced()).or_raise(|| SyncErrorKind::Metadata)? {
            let cache_path = content.cache_path(&file.id, file.version);
            if let Some(key) = content.stat_key(&cache_path).or_raise(|| SyncErrorKind::Store)? {
                fetched.push(CachedFile { file, cache_path, key });
            }
        }

        // 2. Identity keys of every regular file under the view root.
        let mut present = HashSet::new();
        for listing in walk_view(&view_dir, content.meta_dir())? {
            present.extend(listing.files.iter().map(|(_, key)| *key));
        }

        // 3. Classify against physical presence and the ledger. The four
        //    buckets partition the cached-file set: each file lands in
        //    exactly one.
        let ledger = store.list_checkouts(view.id).or_raise(|| SyncErrorKind::Metadata)?;
        let mut existing_keys = HashSet::new();
        let mut new_files = Vec::new();
        let mut deleted_files = Vec::new();
        let mut summary = Reconciliation { new: 0, deleted: 0, healthy: 0, healed: 0 };
        for cached in fetched {
            let on_disk = present.contains(&cached.key);
            let in_ledger = ledger.contains(&cached.id);
            match (on_disk, in_ledger) {
                (true, true) => {
                    summary.healthy += 1;
                    existing_keys.insert(cached.key);
                },
                // Link exists but the record was lost: self-heal.
                (true, false) => {
                    store.add_checkout(view.id, &cached.id).or_raise(|| SyncErrorKind::Metadata)?;
                    summary.healed += 1;
                    existing_keys.insert(cached.key);
                },
                (false, true) => {
                    summary.deleted += 1;
                    deleted_files.push(cached);
                },
                (false, false) => {
                    summary.new += 1;
                    new_files.push(cached);
                },
            }
        }

        // 4. Self-heal insertions land transactionally with the pass.
        store.commit().or_raise(|| SyncErrorKind::Metadata)?;

        tracing::info!(
            new = summary.new,
            deleted = summary.deleted,
            healthy = summary.healthy,
            healed = summary.healed,
            "reconciled view"
        );
        Ok(Self {
            store,
            content,
            view: Some(view),
            view_dir,
            general_folder,
            existing_keys,
            new_files,
            deleted_files,
            summary,
        })
    }

    /// The classification produced by the reconciliation pass.
    pub fn reconciliation(&self) -> Reconciliation {
        self.summary
    }

    /// Files classified as new, in metadata-store order.
    pub fn new_files(&self) -> &[CachedFile] {
        &self.new_files
    }

    /// Files the user deleted from the view; not relinked until reset.
    pub fn deleted_files(&self) -> &[CachedFile] {
        &self.deleted_files
    }

    /// The directory this view materializes into.
    pub fn view_dir(&self) -> &Path {
        &self.view_dir
    }

    pub(crate) fn require_view(&self) -> Result<&View> {
        self.view.as_ref().ok_or_raise(|| ErrorKind::ViewNotFound)
    }

    /// Clears the checkout ledger for this view and commits.
    ///
    /// The filesystem is untouched; the effect materializes on the *next*
    /// reconciliation pass, where every previously deleted file counts as
    /// new again and the next checkout relinks it.
    #[instrument(skip(self))]
    pub fn reset_deleted(&self) -> Result<()> {
        let view = self.require_view()?;
        self.store.reset_checkouts(view.id).or_raise(|| ErrorKind::Metadata)?;
        self.store.commit().or_raise(|| ErrorKind::Metadata)
    }

    fn walk(&self) -> SyncResult<Vec<WalkedDir>> {
        walk_view(&self.view_dir, self.content.meta_dir())
    }
}
