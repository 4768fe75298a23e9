//! Key to path mapping.
//!
//! A key is never written to disk. Its SHA-256 digest, hex encoded in lowercase, is split
//! into two shard levels of two characters each and a 60 character file name:
//!
//! ```text
//! key "hello"
//! sha256 = 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824
//! path   = <root>/2c/f2/4dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824
//! ```
//!
//! Two levels of 256 entries bound every directory's fan-out to 256 sub-directories,
//! whatever the number of keys.

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the scratch directory directly under the store root.
pub(crate) const SCRATCH_DIR: &str = ".tmp";

const SHARD_WIDTH: usize = 2;

/// Resolved on-disk location of one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    digest: String,
    shard_dir: PathBuf,
    file: PathBuf,
}

impl ObjectPath {
    /// Maps `key` to its location under `root`. Pure: no filesystem access.
    #[must_use]
    pub fn resolve(root: &Path, key: impl AsRef<[u8]>) -> Self {
        let digest = hex::encode(Sha256::digest(key.as_ref()));

        let (first, rest) = digest.split_at(SHARD_WIDTH);
        let (second, name) = rest.split_at(SHARD_WIDTH);

        let shard_dir = root.join(first).join(second);
        let file = shard_dir.join(name);

        Self { digest, shard_dir, file }
    }

    /// Lowercase hex SHA-256 of the key.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// The second-level shard directory holding the object file.
    #[must_use]
    pub fn shard_dir(&self) -> &Path {
        &self.shard_dir
    }

    /// Full path of the object file.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.display())
    }
}
