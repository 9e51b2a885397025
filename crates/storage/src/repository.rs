use course_core::model::{LessonId, ViewerId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::sqlite::SqliteKeyValueStore;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("background writer has shut down")]
    WriterClosed,
}

/// Best-effort string key-value storage with local-storage semantics.
///
/// Calls never block on I/O. Implementations may apply writes later, but a
/// `get` after a successful `set` on the same instance observes the new value.
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write cannot be accepted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Key under which the resume position of `lesson` for `viewer` is stored.
///
/// Keys are unique per `(viewer, lesson)`, so writers never contend.
#[must_use]
pub fn resume_key(namespace: &str, viewer: &ViewerId, lesson: &LessonId) -> String {
    format!("{namespace}:{viewer}:{lesson}")
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Bundles the key-value backend behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub kv: Arc<dyn KeyValueStore>,
    pub(crate) write_behind: Option<SqliteKeyValueStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
        Self {
            kv,
            write_behind: None,
        }
    }

    /// Wait for queued writes to reach durable storage. No-op for in-memory backends.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the background writer is gone.
    pub async fn flush(&self) -> Result<(), StorageError> {
        match &self.write_behind {
            Some(store) => store.flush().await,
            None => Ok(()),
        }
    }
}
