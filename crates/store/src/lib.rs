//! Content-addressed store layout and filesystem identity keys.
//!
//! A sync root contains a reserved metadata subdirectory (skipped by every
//! tree walk) which in turn holds the content-addressed file store: each
//! downloaded file lives exactly once under `files/<id>` — or
//! `files/<id>.<version>` for re-uploads — independent of where views
//! present it. Views materialize files by hardlinking out of this store,
//! which is what makes identity-by-inode work: however the user renames or
//! moves a link inside a view, it keeps the inode of its store file.

pub mod error;
mod path;

pub use crate::path::validate as validate_path;
use crate::error::{ErrorKind, Result};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Name of the reserved metadata subdirectory under the sync root.
pub const META_DIR: &str = ".lectern";
/// Name of the content store directory inside [`META_DIR`].
const FILES_DIR: &str = "files";

/// Filesystem identity of a store file: `(device, inode)`.
///
/// This pair, not the path, is the join key between the content store and a
/// view tree. Hardlinks share it, so a user renaming or moving a link
/// anywhere under the view root does not break the association. Device id
/// is included because inode numbers are only unique per filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileKey {
    pub device: u64,
    pub inode: u64,
}

impl From<&fs::Metadata> for FileKey {
    fn from(meta: &fs::Metadata) -> Self {
        Self { device: meta.dev(), inode: meta.ino() }
    }
}

/// Handle to the content-addressed store under one sync root.
///
/// # Examples
///
/// ```no_run
/// use lectern_store::ContentStore;
///
/// let store = ContentStore::open("/home/user/Courses")?;
/// let cached = store.cache_path("d41d8cd98f00b204e9800998ecf8427e", 0);
/// assert!(cached.ends_with(".lectern/files/d41d8cd98f00b204e9800998ecf8427e"));
/// # Ok::<(), lectern_store::error::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ContentStore {
    sync_dir: PathBuf,
    meta_dir: PathBuf,
    files_dir: PathBuf,
}

impl ContentStore {
    /// Open (creating if necessary) the store under the given sync root.
    ///
    /// The root must be an absolute path; the metadata subdirectory and the
    /// file store are created idempotently.
    pub fn open(sync_dir: impl AsRef<Path>) -> Result<Self> {
        let sync_dir = sync_dir.as_ref().to_path_buf();
        if !sync_dir.is_absolute() || (sync_dir.exists() && !sync_dir.is_dir()) {
            exn::bail!(ErrorKind::InvalidRoot(sync_dir));
        }
        let meta_dir = sync_dir.join(META_DIR);
        let files_dir = meta_dir.join(FILES_DIR);
        // create_dir_all is a no-op for the parts that already exist.
        fs::create_dir_all(&files_dir).map_err(ErrorKind::Io)?;
        tracing::debug!(root = %sync_dir.display(), "opened content store");
        Ok(Self { sync_dir, meta_dir, files_dir })
    }

    /// The sync root this store lives under.
    pub fn sync_dir(&self) -> &Path {
        &self.sync_dir
    }

    /// The reserved metadata subdirectory, excluded from all tree walks.
    pub fn meta_dir(&self) -> &Path {
        &self.meta_dir
    }

    /// The directory holding the content-addressed files themselves.
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Location of a file in the content store: `files/<id>` for version 0,
    /// `files/<id>.<version>` otherwise.
    pub fn cache_path(&self, id: &str, version: u32) -> PathBuf {
        match version {
            0 => self.files_dir.join(id),
            v => self.files_dir.join(format!("{id}.{v}")),
        }
    }

    /// Identity key of the regular file at `path`, or `None` if nothing
    /// exists there.
    ///
    /// Uses `lstat` semantics: a symlink would yield its own identity, not
    /// its target's, and is reported as `None` since the store never
    /// contains one.
    pub fn stat_key(&self, path: &Path) -> Result<Option<FileKey>> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_file() => Ok(Some(FileKey::from(&meta))),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ErrorKind::Io(err))?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ContentStore::open(tmp.path()).unwrap();
        assert!(store.files_dir().is_dir());
        assert!(store.meta_dir().ends_with(META_DIR));
        // Idempotent.
        ContentStore::open(tmp.path()).unwrap();
    }

    #[test]
    fn test_open_rejects_relative_root() {
        assert!(ContentStore::open("relative/root").is_err());
    }

    #[test]
    fn test_open_rejects_file_as_root() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        fs::write(&file, b"x").unwrap();
        assert!(ContentStore::open(&file).is_err());
    }

    #[test]
    fn test_cache_path_versioning() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ContentStore::open(tmp.path()).unwrap();
        assert!(store.cache_path("abc123", 0).ends_with("files/abc123"));
        assert!(store.cache_path("abc123", 2).ends_with("files/abc123.2"));
    }

    #[test]
    fn test_stat_key_follows_hardlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ContentStore::open(tmp.path()).unwrap();
        let original = store.cache_path("abc123", 0);
        fs::write(&original, b"content").unwrap();
        let link = tmp.path().join("linked.pdf");
        fs::hard_link(&original, &link).unwrap();

        let a = store.stat_key(&original).unwrap().unwrap();
        let b = store.stat_key(&link).unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stat_key_missing_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ContentStore::open(tmp.path()).unwrap();
        assert_eq!(store.stat_key(&store.cache_path("nope", 0)).unwrap(), None);
    }

    #[test]
    fn test_stat_key_ignores_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ContentStore::open(tmp.path()).unwrap();
        assert_eq!(store.stat_key(store.files_dir()).unwrap(), None);
    }
}
