//! A lock-free key/value object store on a plain, possibly shared, filesystem.
//!
//! Several processes, on one machine or many (NFS, clustered filesystems), can store, read
//! and delete objects under the same root at the same time without any locking. Readers
//! never see a partially written value and never block writers.
//!
//! # Core Features
//!
//! - **Hashed Sharding**: keys are mapped to `<root>/ab/cd/<rest of sha256>`, bounding the
//!   fan-out of every directory.
//! - **Atomic Writes**: values are written to a private scratch file, then renamed into place.
//! - **Lock-Free Reads**: values are hard-linked to a scratch name before being read, so a
//!   concurrent overwrite or delete cannot truncate a read in progress.
//! - **Self-Healing**: scratch files abandoned by crashed processes are purged on connect.
//!
//! # On-disk Layout
//!
//! ```text
//! root/
//!   .tmp/                                   scratch files
//!     <host>-<rand8>-<unix-nanos>-<rand8>
//!   <hex[0:2]>/<hex[2:4]>/<hex[4:]>         one file per key, raw value bytes
//! ```
//!
//! # Examples
//!
//! ```rust
//! use sos_store::{ObjectStore, StoreError};
//! use std::io::Cursor;
//!
//! # fn main() -> Result<(), StoreError> {
//! # let tmp = tempfile::tempdir().unwrap();
//! let store = ObjectStore::builder()
//!     .root(tmp.path().join("objects"))
//!     .sync(false)
//!     .connect()?;
//!
//! // Stream a value in and back out.
//! store.store("invoice/2024/17", &mut Cursor::new(b"pdf bytes"))?;
//! let mut out = Vec::new();
//! store.get("invoice/2024/17", &mut out)?;
//! assert_eq!(out, b"pdf bytes");
//!
//! // Missing keys are reported explicitly, not as empty values.
//! assert!(store.get_bytes("nope").unwrap_err().is_not_found());
//!
//! store.destroy()?;
//! assert!(store.get_bytes("invoice/2024/17").unwrap_err().is_destroyed());
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "tokio")]
mod asynchronous;
mod builder;
mod engine;
mod error;
mod maintenance;
mod path;
mod scratch;

#[cfg(feature = "tokio")]
pub use asynchronous::AsyncObjectStore;
pub use builder::{StoreBuilder, StoreConfig};
pub use engine::{ObjectReader, ObjectStore};
pub use error::{StoreError, StoreErrorExt};
pub use maintenance::PurgeReport;
pub use path::ObjectPath;
pub use scratch::{Entropy, OsEntropy};
