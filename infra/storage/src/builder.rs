use crate::engine::{ObjectStore, StoreInner};
use crate::error::{StoreError, StoreErrorExt};
use crate::maintenance;
use crate::path::SCRATCH_DIR;
use crate::scratch::{self, Entropy, OsEntropy, ScratchNames};
use private::Sealed;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, SystemTime};
use tracing::info;

const DEFAULT_PURGE_AFTER: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_FILE_MODE: u32 = 0o600;
const DEFAULT_DIR_MODE: u32 = 0o700;

/// Serializable store settings, e.g. loaded from a configuration file.
///
/// ```toml
/// root = "/mnt/shared/objects"
/// sync = true
/// purge_scratch_after_secs = 86400
/// file_mode = 0o640
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub root: PathBuf,
    /// Create the root and scratch directories when missing.
    pub create: bool,
    /// `fsync` each value before it is renamed into place.
    pub sync: bool,
    /// Age after which abandoned scratch files are purged on connect; `None` disables it.
    pub purge_scratch_after_secs: Option<u64>,
    /// Unix permission bits for object and scratch files.
    pub file_mode: u32,
    /// Unix permission bits for the root, scratch and shard directories.
    pub dir_mode: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            create: true,
            sync: true,
            purge_scratch_after_secs: Some(DEFAULT_PURGE_AFTER.as_secs()),
            file_mode: DEFAULT_FILE_MODE,
            dir_mode: DEFAULT_DIR_MODE,
        }
    }
}

#[derive(Debug, Clone)]
struct StoreOptions {
    create: bool,
    sync: bool,
    purge_after: Option<Duration>,
    file_mode: u32,
    dir_mode: u32,
    entropy: Arc<dyn Entropy>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            create: true,
            sync: true,
            purge_after: Some(DEFAULT_PURGE_AFTER),
            file_mode: DEFAULT_FILE_MODE,
            dir_mode: DEFAULT_DIR_MODE,
            entropy: Arc::new(OsEntropy),
        }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

/// Typed builder for [`ObjectStore`]; a root must be set before [`connect`](StoreBuilder::connect).
#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct StoreBuilder<S: Sealed = NoRoot> {
    state: S,
    options: StoreOptions,
}

#[allow(private_bounds)]
impl<S: Sealed> StoreBuilder<S> {
    #[must_use = "Sets whether missing root and scratch directories are created"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.options.create = enable;
        self
    }

    #[must_use = "Sets whether values are fsynced before they become visible"]
    pub const fn sync(mut self, enable: bool) -> Self {
        self.options.sync = enable;
        self
    }

    /// Age threshold for purging abandoned scratch files on connect; `None` disables it.
    #[must_use = "Sets the stale scratch purge threshold"]
    pub const fn purge_scratch_after(mut self, age: Option<Duration>) -> Self {
        self.options.purge_after = age;
        self
    }

    #[must_use = "Sets the permission bits of created files"]
    pub const fn file_mode(mut self, mode: u32) -> Self {
        self.options.file_mode = mode;
        self
    }

    #[must_use = "Sets the permission bits of created directories"]
    pub const fn dir_mode(mut self, mode: u32) -> Self {
        self.options.dir_mode = mode;
        self
    }

    /// Replaces the random source used for the instance id and scratch names.
    #[must_use = "Sets the random source of the store"]
    pub fn entropy(mut self, entropy: impl Entropy + 'static) -> Self {
        self.options.entropy = Arc::new(entropy);
        self
    }

    fn transition<N: Sealed>(self, state: N) -> StoreBuilder<N> {
        StoreBuilder { state, options: self.options }
    }
}

impl StoreBuilder<NoRoot> {
    #[must_use = "Creates a new store builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the root directory of the object store"]
    pub fn root(self, path: impl Into<PathBuf>) -> StoreBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }

    /// Applies every setting of `config`, including its root.
    #[must_use = "Applies a configuration to the builder"]
    pub fn config(mut self, config: StoreConfig) -> StoreBuilder<WithRoot> {
        self.options.create = config.create;
        self.options.sync = config.sync;
        self.options.purge_after = config.purge_scratch_after_secs.map(Duration::from_secs);
        self.options.file_mode = config.file_mode;
        self.options.dir_mode = config.dir_mode;
        self.transition(WithRoot(config.root))
    }
}

impl StoreBuilder<WithRoot> {
    /// Consumes the configuration and opens the store.
    ///
    /// Boot sequence:
    /// 1. **Validation**: an empty root is rejected.
    /// 2. **Bootstrapping**: creates `<root>/.tmp` (and the root) if `create(true)`.
    /// 3. **Canonicalization**: resolves the root to an absolute physical path.
    /// 4. **Identity**: derives the instance id from the host name and a random value.
    /// 5. **Self-Healing**: purges scratch files abandoned by crashed processes, if enabled.
    ///    Failures here are logged and never fail the connect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfiguration`] if the root path is empty,
    /// [`StoreError::Io`] if the directories cannot be created or, with `create(false)`,
    /// do not exist, and [`StoreError::Internal`] if no randomness is available.
    pub fn connect(self) -> Result<ObjectStore, StoreError> {
        let root = self.state.0;
        let options = self.options;

        if root.as_os_str().is_empty() {
            return Err(StoreError::InvalidConfiguration {
                message: "root path for object storage must not be empty".into(),
                context: None,
            });
        }

        let scratch_dir = root.join(SCRATCH_DIR);
        if options.create {
            crate::engine::create_dirs(&scratch_dir, options.dir_mode)
                .context(format!("Failed to bootstrap store root: {}", root.display()))?;
        } else if !fs::metadata(&scratch_dir)
            .context(format!("Store root is not initialized: {}", root.display()))?
            .is_dir()
        {
            return Err(StoreError::InvalidConfiguration {
                message: format!("{} is not a directory", scratch_dir.display()).into(),
                context: None,
            });
        }

        let root = fs::canonicalize(&root)
            .context(format!("Failed to resolve store root: {}", root.display()))?;
        let instance_id = scratch::instance_id(options.entropy.as_ref())?;
        let scratch = ScratchNames::new(root.join(SCRATCH_DIR), instance_id, options.entropy);

        if let Some(age) = options.purge_after {
            maintenance::purge_scratch(scratch.dir(), SystemTime::now(), age);
        }

        info!(root = %root.display(), instance = scratch.instance_id(), "Object store opened");

        Ok(ObjectStore {
            inner: Arc::new(StoreInner {
                root,
                scratch,
                sync: options.sync,
                file_mode: options.file_mode,
                dir_mode: options.dir_mode,
                destroyed: AtomicBool::new(false),
            }),
        })
    }
}
