//! Scratch file naming and cleanup.
//!
//! Every store and get works through a private file in `<root>/.tmp` named
//! `<instance-id>-<unix-nanos>-<random %08x>`. The instance id is the host name plus a
//! random value drawn once per handle, so handles on different machines or in different
//! processes never produce the same name.

use crate::error::StoreError;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const UNKNOWN_HOST: &str = "_unknown_";
const MAX_NAME_ATTEMPTS: usize = 8;

/// Source of the random parts of instance ids and scratch names.
///
/// The default [`OsEntropy`] reads the operating system generator. A handle receives its
/// source explicitly through [`StoreBuilder::entropy`](crate::StoreBuilder::entropy), so
/// tests can substitute a deterministic one.
pub trait Entropy: Send + Sync + fmt::Debug {
    /// Returns the next random value.
    ///
    /// # Errors
    /// Returns [`StoreError::Internal`] if no randomness is available.
    fn next_u32(&self) -> Result<u32, StoreError>;
}

/// Operating system randomness via `getrandom`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn next_u32(&self) -> Result<u32, StoreError> {
        let mut buf = [0u8; 4];
        getrandom::fill(&mut buf).map_err(|e| StoreError::Internal {
            message: e.to_string().into(),
            context: Some("Failed to draw random bytes".into()),
        })?;
        Ok(u32::from_le_bytes(buf))
    }
}

/// Builds the per-handle instance id `<hostname>-<random %08x>`.
pub(crate) fn instance_id(entropy: &dyn Entropy) -> Result<String, StoreError> {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.replace(['/', '\\'], "_"))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| UNKNOWN_HOST.to_owned());

    Ok(format!("{host}-{:08x}", entropy.next_u32()?))
}

/// Generator of unique scratch paths for one store handle.
#[derive(Debug)]
pub(crate) struct ScratchNames {
    dir: PathBuf,
    instance_id: String,
    entropy: Arc<dyn Entropy>,
}

impl ScratchNames {
    pub(crate) fn new(dir: PathBuf, instance_id: String, entropy: Arc<dyn Entropy>) -> Self {
        Self { dir, instance_id, entropy }
    }

    pub(crate) fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    fn next(&self) -> Result<PathBuf, StoreError> {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_nanos());
        let name = format!("{}-{nanos}-{:08x}", self.instance_id, self.entropy.next_u32()?);
        Ok(self.dir.join(name))
    }

    /// Runs `create` on fresh scratch names until one is not already taken.
    ///
    /// `create` must fail with [`io::ErrorKind::AlreadyExists`] when the name is in use and
    /// must not leave anything behind when it fails. The outer error is a name generation
    /// failure; the inner one is the last error returned by `create`.
    pub(crate) fn claim<T>(
        &self,
        mut create: impl FnMut(&Path) -> io::Result<T>,
    ) -> Result<io::Result<(ScratchFile, T)>, StoreError> {
        let mut last = None;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self.next()?;
            match create(&path) {
                Ok(value) => return Ok(Ok((ScratchFile::new(path), value))),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Scratch name collision, retrying");
                    last = Some(err);
                },
                Err(err) => return Ok(Err(err)),
            }
        }

        Ok(Err(last.unwrap_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists))))
    }
}

/// A claimed scratch path, unlinked on drop unless it was renamed away.
#[derive(Debug)]
pub(crate) struct ScratchFile {
    path: PathBuf,
    armed: bool,
}

impl ScratchFile {
    const fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically renames the scratch file onto `target`, replacing whatever is there.
    pub(crate) fn persist(mut self, target: &Path) -> io::Result<()> {
        fs::rename(&self.path, target)?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => {},
            Err(err) if err.kind() == io::ErrorKind::NotFound => {},
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to remove scratch file");
            },
        }
    }
}

/// Splits a scratch file name into its creation time, if it was made by this crate.
pub(crate) fn created_at(name: &str) -> Option<SystemTime> {
    let mut parts = name.rsplitn(3, '-');
    let random = parts.next()?;
    let nanos = parts.next()?;
    let instance = parts.next()?;

    if instance.is_empty() || random.len() != 8 || !random.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return None;
    }

    let nanos: u64 = nanos.parse().ok()?;
    Some(UNIX_EPOCH + std::time::Duration::from_nanos(nanos))
}
