//! The object store handle and its three protocols.
//!
//! * **store**: write the value into a private scratch file, then `rename` it onto the
//!   object path. The rename is the only step that makes a value visible, so readers see
//!   either the previous value or the new one, whole.
//! * **get**: `link` the object file to a private scratch name, read through that link,
//!   unlink it. The link pins the content present at link time; a concurrent store or
//!   delete only replaces or removes the object's directory entry.
//! * **delete**: `unlink` the object file. Readers holding a link are unaffected.
//!
//! None of the three takes a lock, in-process or on disk.

use crate::builder::StoreBuilder;
use crate::error::{StoreError, StoreErrorExt};
use crate::maintenance::{self, PurgeReport};
use crate::path::ObjectPath;
use crate::scratch::{ScratchFile, ScratchNames};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const MAX_LINK_ATTEMPTS: usize = 16;

/// The internal shared state of an [`ObjectStore`].
#[derive(Debug)]
pub struct StoreInner {
    /// Canonicalized store root.
    pub(crate) root: PathBuf,
    pub(crate) scratch: ScratchNames,
    /// Whether values are fsynced before the rename.
    pub(crate) sync: bool,
    pub(crate) file_mode: u32,
    pub(crate) dir_mode: u32,
    /// Set once by [`ObjectStore::destroy`], shared by every clone of the handle.
    pub(crate) destroyed: AtomicBool,
}

/// A handle to an object store rooted in a (possibly shared) directory.
///
/// Any number of handles, in any number of processes or machines, may work on the same
/// root at once. The handle is reference-counted and cheap to clone; clones share the
/// destroyed state.
///
/// # Example
///
/// ```rust
/// use sos_store::{ObjectStore, StoreError};
///
/// # fn main() -> Result<(), StoreError> {
/// # let tmp = tempfile::tempdir().unwrap();
/// let store = ObjectStore::builder().root(tmp.path().join("objects")).connect()?;
///
/// store.store_bytes("greeting", b"hello")?;
/// assert_eq!(store.get_bytes("greeting")?, b"hello");
///
/// store.delete("greeting")?;
/// assert!(store.get_bytes("greeting").unwrap_err().is_not_found());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ObjectStore {
    pub(crate) inner: Arc<StoreInner>,
}

impl Deref for ObjectStore {
    type Target = StoreInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl ObjectStore {
    #[must_use = "The store is not opened until you call .connect()"]
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Opens (and if needed creates) a store at `root` with default settings.
    ///
    /// # Errors
    ///
    /// See [`StoreBuilder::connect`].
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::builder().root(root).connect()
    }

    /// Canonical root directory of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Host-and-random identifier prefixing this handle's scratch files.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        self.scratch.instance_id()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Maps a key to its on-disk location. Pure; touches no file.
    #[must_use]
    pub fn resolve(&self, key: impl AsRef<[u8]>) -> ObjectPath {
        ObjectPath::resolve(&self.root, key)
    }

    /// Stores the whole of `value` under `key`, replacing any previous value atomically.
    ///
    /// The value is copied into a fresh scratch file, optionally fsynced, and renamed onto
    /// the object path. If anything fails before the rename the scratch file is removed and
    /// the object path is untouched.
    ///
    /// Returns the number of bytes stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StoreDestroyed`] after [`destroy`](Self::destroy), and
    /// [`StoreError::Io`] for any failure reading `value` or writing the filesystem.
    pub fn store<R>(&self, key: impl AsRef<[u8]>, value: &mut R) -> Result<u64, StoreError>
    where
        R: Read + ?Sized,
    {
        self.ensure_live("store")?;
        let path = self.resolve(key);

        let (scratch, mut file) = self
            .scratch
            .claim(|p| self.create_scratch_file(p))?
            .context("Failed to create scratch file")?;

        let written = io::copy(value, &mut file)
            .context(format!("Failed to write scratch file: {}", scratch.path().display()))?;
        if self.sync {
            file.sync_all()
                .context(format!("Failed to sync scratch file: {}", scratch.path().display()))?;
        }
        drop(file);

        create_shard(path.shard_dir(), self.dir_mode)
            .context(format!("Failed to create shard: {}", path.shard_dir().display()))?;

        scratch
            .persist(path.file())
            .context(format!("Atomic rename onto {} failed", path.file().display()))?;

        if self.sync {
            sync_dir(path.shard_dir());
        }

        debug!(digest = path.digest(), bytes = written, "Object stored");
        Ok(written)
    }

    /// Stores a byte slice under `key`.
    ///
    /// # Errors
    ///
    /// See [`store`](Self::store).
    pub fn store_bytes(&self, key: impl AsRef<[u8]>, value: &[u8]) -> Result<(), StoreError> {
        let mut reader = value;
        self.store(key, &mut reader).map(|_| ())
    }

    /// Stores a string under `key` as its UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// See [`store`](Self::store).
    pub fn store_str(&self, key: impl AsRef<[u8]>, value: &str) -> Result<(), StoreError> {
        self.store_bytes(key, value.as_bytes())
    }

    /// Opens the value stored under `key` for streaming.
    ///
    /// The object file is hard-linked to a scratch name before it is opened, so the reader
    /// sees the value as it was at that moment even if the key is overwritten or deleted
    /// meanwhile. The link is removed when the reader is dropped.
    ///
    /// A link that fails because a concurrent store is renaming a new value over the
    /// object is retried; only an object that is really gone yields `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no object exists for `key`,
    /// [`StoreError::StoreDestroyed`] after [`destroy`](Self::destroy), and
    /// [`StoreError::Io`] for other filesystem failures.
    pub fn open_object(&self, key: impl AsRef<[u8]>) -> Result<ObjectReader, StoreError> {
        self.ensure_live("get")?;
        let path = self.resolve(key);

        let scratch = self.link_object(&path)?;
        let file = File::open(scratch.path())
            .context(format!("Failed to open scratch link: {}", scratch.path().display()))?;

        Ok(ObjectReader { file, _link: scratch, digest: path.digest().to_owned() })
    }

    /// Copies the value stored under `key` into `out`; returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// See [`open_object`](Self::open_object); failures while reading or writing `out` are
    /// [`StoreError::Io`]. The scratch link is removed in every case.
    pub fn get<W>(&self, key: impl AsRef<[u8]>, out: &mut W) -> Result<u64, StoreError>
    where
        W: Write + ?Sized,
    {
        let mut reader = self.open_object(key)?;
        let copied = io::copy(&mut reader, out)
            .context(format!("Failed to read object {}", reader.digest()))?;

        debug!(digest = reader.digest(), bytes = copied, "Object read");
        Ok(copied)
    }

    /// Reads the whole value stored under `key`.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_bytes(&self, key: impl AsRef<[u8]>) -> Result<Vec<u8>, StoreError> {
        let mut buffer = Vec::new();
        self.get(key, &mut buffer)?;
        Ok(buffer)
    }

    /// Reads the value stored under `key` as UTF-8 text.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get); a value that is not UTF-8 yields [`StoreError::InvalidUtf8`].
    pub fn get_string(&self, key: impl AsRef<[u8]>) -> Result<String, StoreError> {
        Ok(String::from_utf8(self.get_bytes(key)?)?)
    }

    /// Removes the object stored under `key`.
    ///
    /// Reads already in flight keep their links and complete with the old value. The shard
    /// directories stay in place, even when empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no object exists for `key`,
    /// [`StoreError::StoreDestroyed`] after [`destroy`](Self::destroy), and
    /// [`StoreError::Io`] for other filesystem failures.
    pub fn delete(&self, key: impl AsRef<[u8]>) -> Result<(), StoreError> {
        self.ensure_live("delete")?;
        let path = self.resolve(key);

        match fs::remove_file(path.file()) {
            Ok(()) => {},
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    message: path.digest().to_owned().into(),
                    context: None,
                });
            },
            Err(err) => {
                return Err(StoreError::Io {
                    source: err,
                    context: Some(format!("Failed to delete: {}", path.file().display()).into()),
                });
            },
        }

        debug!(digest = path.digest(), "Object deleted");
        Ok(())
    }

    /// Removes the whole root directory and makes this handle, and all its clones, unusable.
    ///
    /// Calling it again is a no-op. Every later operation fails with
    /// [`StoreError::StoreDestroyed`]. Other processes sharing the root are not notified;
    /// on filesystems with weak link semantics (some NFS setups) their in-flight reads may
    /// break.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the tree could not be removed completely. The handle is
    /// marked destroyed regardless.
    pub fn destroy(&self) -> Result<(), StoreError> {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        match fs::remove_dir_all(&self.root) {
            Ok(()) => {},
            Err(err) if err.kind() == io::ErrorKind::NotFound => {},
            Err(err) => {
                return Err(StoreError::Io {
                    source: err,
                    context: Some(
                        format!("Failed to remove store root: {}", self.root.display()).into(),
                    ),
                });
            },
        }

        info!(root = %self.root.display(), "Object store destroyed");
        Ok(())
    }

    /// Removes scratch files older than `older_than` left behind by crashed processes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StoreDestroyed`] after [`destroy`](Self::destroy).
    pub fn purge_scratch(&self, older_than: Duration) -> Result<PurgeReport, StoreError> {
        self.ensure_live("purge")?;
        Ok(maintenance::purge_scratch(self.scratch.dir(), SystemTime::now(), older_than))
    }

    /// Hard-links the object file to a fresh scratch name.
    ///
    /// `link` reports `ENOENT` both for a missing object and for one whose inode lost its
    /// last name to a concurrent rename, so the object path is checked before giving up.
    fn link_object(&self, path: &ObjectPath) -> Result<ScratchFile, StoreError> {
        let mut attempt = 0;

        loop {
            let err = match self.scratch.claim(|link| fs::hard_link(path.file(), link))? {
                Ok((scratch, ())) => return Ok(scratch),
                Err(err) if err.kind() == io::ErrorKind::NotFound => err,
                Err(err) => {
                    return Err(StoreError::Io {
                        source: err,
                        context: Some(format!("Failed to link {}", path.file().display()).into()),
                    });
                },
            };

            match fs::symlink_metadata(path.file()) {
                Err(missing) if missing.kind() == io::ErrorKind::NotFound => {
                    return Err(StoreError::NotFound {
                        message: path.digest().to_owned().into(),
                        context: None,
                    });
                },
                _ => {},
            }

            attempt += 1;
            if attempt >= MAX_LINK_ATTEMPTS || !self.scratch.dir().is_dir() {
                return Err(StoreError::Io {
                    source: err,
                    context: Some(
                        format!(
                            "Failed to link {} into scratch directory {}",
                            path.file().display(),
                            self.scratch.dir().display()
                        )
                        .into(),
                    ),
                });
            }
            debug!(digest = path.digest(), attempt, "Object replaced while linking, retrying");
        }
    }

    fn ensure_live(&self, operation: &'static str) -> Result<(), StoreError> {
        if self.is_destroyed() {
            return Err(StoreError::StoreDestroyed {
                message: format!("{operation} on destroyed store {}", self.root.display()).into(),
                context: None,
            });
        }
        Ok(())
    }

    #[cfg_attr(not(unix), allow(clippy::unused_self))]
    fn create_scratch_file(&self, path: &Path) -> io::Result<File> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(self.file_mode);
        }
        options.open(path)
    }
}

/// Streaming access to one stored value.
///
/// Holds an open hard link to the object in the scratch directory; the link is removed on
/// drop. Created by [`ObjectStore::open_object`].
#[derive(Debug)]
pub struct ObjectReader {
    // Declared before the link: the file is closed before its link is removed.
    file: File,
    _link: ScratchFile,
    digest: String,
}

impl ObjectReader {
    /// Digest of the key this value was stored under.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl Read for ObjectReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

#[cfg_attr(not(unix), allow(unused_variables))]
fn dir_builder(mode: u32) -> fs::DirBuilder {
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    builder
}

/// Creates `path` and any missing parents. Used to bootstrap a store root.
pub(crate) fn create_dirs(path: &Path, mode: u32) -> io::Result<()> {
    dir_builder(mode).recursive(true).create(path)
}

/// Creates the two shard levels below an existing root, one at a time.
///
/// Never creates the root itself, so a store racing `destroy` cannot bring it back.
fn create_shard(shard_dir: &Path, mode: u32) -> io::Result<()> {
    let builder = dir_builder(mode);

    for dir in [shard_dir.parent(), Some(shard_dir)].into_iter().flatten() {
        match builder.create(dir) {
            Ok(()) => {},
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {},
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn sync_dir(path: &Path) {
    match File::open(path) {
        Ok(dir) => {
            if let Err(err) = dir.sync_all() {
                warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Directory open failed");
        },
    }
}
