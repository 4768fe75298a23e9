//! Tokio facade over the blocking store.
//!
//! Each call moves a clone of the handle onto the blocking thread pool, so async services
//! can use the store without stalling their executor. The protocols are unchanged.

use crate::engine::ObjectStore;
use crate::error::StoreError;

/// Async handle wrapping an [`ObjectStore`]; cheap to clone.
///
/// ```rust
/// use sos_store::{AsyncObjectStore, ObjectStore, StoreError};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), StoreError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     let store = AsyncObjectStore::from(ObjectStore::open(tmp.path().join("objects"))?);
///
///     store.store("report", b"q3".to_vec()).await?;
///     assert_eq!(store.get("report").await?, b"q3");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AsyncObjectStore {
    store: ObjectStore,
}

impl From<ObjectStore> for AsyncObjectStore {
    fn from(store: ObjectStore) -> Self {
        Self { store }
    }
}

impl AsyncObjectStore {
    /// The wrapped blocking handle.
    #[must_use]
    pub const fn blocking(&self) -> &ObjectStore {
        &self.store
    }

    /// See [`ObjectStore::store_bytes`].
    ///
    /// # Errors
    ///
    /// As the blocking call, plus [`StoreError::Internal`] if the blocking task panics.
    pub async fn store(
        &self,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Result<(), StoreError> {
        let (key, value) = (key.into(), value.into());
        self.run(move |store| store.store_bytes(key, &value)).await
    }

    /// See [`ObjectStore::get_bytes`].
    ///
    /// # Errors
    ///
    /// As the blocking call, plus [`StoreError::Internal`] if the blocking task panics.
    pub async fn get(&self, key: impl Into<Vec<u8>>) -> Result<Vec<u8>, StoreError> {
        let key = key.into();
        self.run(move |store| store.get_bytes(key)).await
    }

    /// See [`ObjectStore::delete`].
    ///
    /// # Errors
    ///
    /// As the blocking call, plus [`StoreError::Internal`] if the blocking task panics.
    pub async fn delete(&self, key: impl Into<Vec<u8>>) -> Result<(), StoreError> {
        let key = key.into();
        self.run(move |store| store.delete(key)).await
    }

    /// See [`ObjectStore::destroy`].
    ///
    /// # Errors
    ///
    /// As the blocking call, plus [`StoreError::Internal`] if the blocking task panics.
    pub async fn destroy(&self) -> Result<(), StoreError> {
        self.run(|store| store.destroy()).await
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(ObjectStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(store)).await.map_err(|e| StoreError::Internal {
            message: e.to_string().into(),
            context: Some("Blocking store task failed".into()),
        })?
    }
}
