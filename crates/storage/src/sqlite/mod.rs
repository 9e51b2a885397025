use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::repository::{KeyValueStore, Storage, StorageError};

mod migrate;
mod writer;

use writer::WriteCommand;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// `SQLite`-backed key-value store with a read cache and write-behind.
///
/// Every entry is loaded into memory at connect time, so `get` never touches
/// the database. `set` updates the cache and queues the write for a
/// background task that applies writes in submission order.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
    cache: Arc<Mutex<HashMap<String, String>>>,
    writes: mpsc::UnboundedSender<WriteCommand>,
}

impl SqliteKeyValueStore {
    /// Connect to `SQLite`, apply migrations, load entries, and start the writer.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection, migrations, or initial
    /// load fail.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;

        migrate::run_migrations(&pool).await?;

        let rows = sqlx::query("SELECT key, value FROM kv_entries")
            .fetch_all(&pool)
            .await?;
        let mut entries = HashMap::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("key")?;
            let value: String = row.try_get("value")?;
            entries.insert(key, value);
        }
        tracing::debug!(entries = entries.len(), "loaded key-value entries");

        let writes = writer::spawn(pool.clone());
        Ok(Self {
            pool,
            cache: Arc::new(Mutex::new(entries)),
            writes,
        })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait until every write queued before this call has been applied.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::WriterClosed` if the background writer is gone.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let (done, applied) = oneshot::channel();
        self.writes
            .send(WriteCommand::Flush(done))
            .map_err(|_| StorageError::WriterClosed)?;
        applied.await.map_err(|_| StorageError::WriterClosed)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .cache
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writes
            .send(WriteCommand::Put {
                key: key.to_owned(),
                value: value.to_owned(),
            })
            .map_err(|_| StorageError::WriterClosed)?;
        let mut guard = self
            .cache
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let store = SqliteKeyValueStore::connect(database_url).await?;
        let kv: Arc<dyn KeyValueStore> = Arc::new(store.clone());
        Ok(Self {
            kv,
            write_behind: Some(store),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteKeyValueStore>();
    }
}
