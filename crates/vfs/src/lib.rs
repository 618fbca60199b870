//! Read-only virtual filesystem projection of the content store.
//!
//! Instead of materializing a view with hardlinks, a [`FsProjection`]
//! renders every cached file's templated path once, at build time, into an
//! in-memory tree and serves lookups, directory listings, attribute
//! queries and reads straight out of the content store. The tree is
//! immutable for the session: store mutations after construction are not
//! observed.
//!
//! The surface matches what a filesystem host expects: every operation
//! maps onto one errno-style condition (see
//! [`ErrorKind::errno_name`](error::ErrorKind::errno_name)), and all
//! write-class operations report not-supported.

pub mod error;
mod tree;

pub use crate::tree::{Node, ProjectedFile};

/// Access mode a host requests when opening a file.
///
/// Only [`Read`](OpenMode::Read) succeeds; any write intent is refused at
/// open time rather than left to fail on the first write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
}
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use lectern_metadata::{MetadataStore, SyncSelection, View};
use lectern_store::ContentStore;
use lectern_view::{PathTemplate, Tokens};
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::FileExt;
use std::path::PathBuf;
use tracing::instrument;

/// A read-only projection of one view over the content store.
///
/// # Examples
///
/// ```no_run
/// use lectern_metadata::{MemoryStore, MetadataStore};
/// use lectern_store::ContentStore;
/// use lectern_vfs::{FsProjection, OpenMode};
///
/// let store = MemoryStore::default();
/// let content = ContentStore::open("/home/user/Courses")?;
/// let view = store.list_views()?.first().cloned().expect("a configured view");
///
/// let mut fs = FsProjection::build(&store, &content, &view, "General Files")?;
/// for name in fs.readdir("/")? {
///     println!("{name}");
/// }
/// let fh = fs.open("/Algorithms/slides.pdf", OpenMode::Read)?;
/// let header = fs.read(fh, 0, 4)?;
/// fs.release(fh)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct FsProjection {
    root: Node,
    /// Stand-in for directory attributes; interior nodes have no backing
    /// inode of their own.
    files_dir: PathBuf,
    handles: HashMap<u64, fs::File>,
    next_handle: u64,
}

impl FsProjection {
    /// Builds the projection tree by rendering every physically cached
    /// file's path through the view's naming template.
    ///
    /// Files the store knows about but whose bytes are not in the content
    /// store are left out; a projected leaf must be openable.
    #[instrument(skip_all, fields(view = %view.name))]
    pub fn build<S: MetadataStore>(
        store: &S,
        content: &ContentStore,
        view: &View,
        general_folder: &str,
    ) -> Result<Self> {
        let template: PathTemplate =
            view.format.parse::<PathTemplate>().or_raise(|| ErrorKind::Template)?;
        let mut root = Node::empty_dir();
        let mut projected = 0usize;
        for file in store.list_files(SyncSelection::synced()).or_raise(|| ErrorKind::Metadata)? {
            let cache_path = content.cache_path(&file.id, file.version);
            if content.stat_key(&cache_path).or_raise(|| ErrorKind::Metadata)?.is_none() {
                continue;
            }
            let rendered = template
                .render(&Tokens::for_file(&file, view, general_folder))
                .or_raise(|| ErrorKind::Template)?;
            root.insert(&rendered, ProjectedFile { file, cache_path });
            projected += 1;
        }
        tracing::info!(files = projected, "built projection tree");
        Ok(Self {
            root,
            files_dir: content.files_dir().to_path_buf(),
            handles: HashMap::new(),
            next_handle: 1,
        })
    }

    /// Resolves a path to its node.
    pub fn resolve(&self, path: &str) -> Result<&Node> {
        self.root.resolve(path)
    }

    /// Attributes for the node at `path`: leaves report their cache file's
    /// metadata, directories report the content store directory's, since
    /// interior nodes are synthetic and own no inode.
    pub fn getattr(&self, path: &str) -> Result<fs::Metadata> {
        let meta = match self.resolve(path)? {
            Node::Dir(_) => fs::symlink_metadata(&self.files_dir),
            Node::Leaf(leaf) => fs::symlink_metadata(&leaf.cache_path),
        };
        Ok(meta.map_err(ErrorKind::from)?)
    }

    /// Child names of the directory at `path`, with the conventional `.`
    /// and `..` entries first.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>> {
        match self.resolve(path)? {
            Node::Dir(children) => {
                let mut names = vec![".".to_string(), "..".to_string()];
                names.extend(children.keys().cloned());
                Ok(names)
            },
            Node::Leaf(_) => Err(ErrorKind::NotADirectory(path.to_string()))?,
        }
    }

    /// Opens the cache file behind the leaf at `path` in the requested
    /// mode and returns a handle for [`read`](Self::read) and friends.
    ///
    /// Write intent is refused here, at open time, so a host never holds a
    /// handle its write calls would fail on anyway.
    pub fn open(&mut self, path: &str, mode: OpenMode) -> Result<u64> {
        if mode != OpenMode::Read {
            Err(ErrorKind::NotSupported("open for writing"))?;
        }
        let leaf = match self.resolve(path)? {
            Node::Dir(_) => Err(ErrorKind::IsADirectory(path.to_string()))?,
            Node::Leaf(leaf) => leaf,
        };
        let handle = fs::File::open(&leaf.cache_path).map_err(ErrorKind::from)?;
        let fh = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(fh, handle);
        Ok(fh)
    }

    /// Reads up to `length` bytes at `offset`. A short or empty result
    /// means end of file, as usual.
    pub fn read(&self, fh: u64, offset: u64, length: usize) -> Result<Vec<u8>> {
        let handle = self.handle(fh)?;
        let mut buffer = vec![0u8; length];
        let mut filled = 0;
        while filled < length {
            let count = handle
                .read_at(&mut buffer[filled..], offset + filled as u64)
                .map_err(ErrorKind::from)?;
            if count == 0 {
                break;
            }
            filled += count;
        }
        buffer.truncate(filled);
        Ok(buffer)
    }

    /// Flush is a full sync here; the handle is read-only, so this only
    /// matters for hosts that insist on calling it.
    pub fn flush(&self, fh: u64) -> Result<()> {
        Ok(self.handle(fh)?.sync_all().map_err(ErrorKind::from)?)
    }

    pub fn fsync(&self, fh: u64) -> Result<()> {
        Ok(self.handle(fh)?.sync_data().map_err(ErrorKind::from)?)
    }

    /// Closes the handle. Further use of `fh` is a bad-handle error.
    pub fn release(&mut self, fh: u64) -> Result<()> {
        self.handles.remove(&fh).map(drop).ok_or_raise(|| ErrorKind::BadHandle(fh))
    }

    /// Any mutating operation a host might forward. The projection is
    /// read-only by construction, so they all answer the same way.
    pub fn unsupported<T>(operation: &'static str) -> Result<T> {
        Err(ErrorKind::NotSupported(operation))?
    }

    fn handle(&self, fh: u64) -> Result<&fs::File> {
        self.handles.get(&fh).ok_or_raise(|| ErrorKind::BadHandle(fh))
    }
}
