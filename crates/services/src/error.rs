//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::SettingsError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted while bootstrapping or shutting down app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
