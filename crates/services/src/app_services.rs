use std::sync::Arc;

use course_core::model::{TrackerSettings, ViewerId};
use course_core::time::Clock;
use storage::repository::Storage;

use crate::completion::CompletionSink;
use crate::error::AppServicesError;
use crate::progress_tracker::LessonProgressTracker;

/// Storage, settings, and clock shared by every tracker the host creates.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    settings: TrackerSettings,
    clock: Clock,
}

impl AppServices {
    #[must_use]
    pub fn new(storage: Storage, settings: TrackerSettings) -> Self {
        Self {
            storage,
            settings,
            clock: Clock::default(),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Storage::in_memory(), TrackerSettings::default())
    }

    /// Build services backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Sqlite` if connection or migrations fail.
    pub async fn sqlite(database_url: &str) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(database_url).await?;
        Ok(Self::new(storage, TrackerSettings::default()))
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Override the completion threshold for trackers created afterwards.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Settings` if the threshold is out of range.
    pub fn with_completion_threshold(mut self, threshold: f64) -> Result<Self, AppServicesError> {
        self.settings = self.settings.with_completion_threshold(threshold)?;
        Ok(self)
    }

    /// A tracker for `viewer` that reports completions to `sink`.
    #[must_use]
    pub fn tracker(&self, viewer: ViewerId, sink: Arc<dyn CompletionSink>) -> LessonProgressTracker {
        LessonProgressTracker::new(viewer, Arc::clone(&self.storage.kv), sink)
            .with_settings(self.settings.clone())
            .with_clock(self.clock)
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Wait for queued resume-position writes to land.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if the writer is gone.
    pub async fn flush(&self) -> Result<(), AppServicesError> {
        self.storage.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::RecordingCompletionSink;
    use course_core::model::{LessonId, SettingsError};

    #[test]
    fn trackers_share_storage() {
        let services = AppServices::in_memory();
        let sink = Arc::new(RecordingCompletionSink::new());
        let lesson = LessonId::new("l1");

        let mut first = services.tracker(ViewerId::new("v1"), sink.clone());
        first.report_position(&lesson, 42.0, 100.0);

        let second = services.tracker(ViewerId::new("v1"), sink);
        assert_eq!(second.resume(&lesson), Some(42.0));
        assert_eq!(
            services.storage().kv.get("lesson-progress:v1:l1").unwrap().as_deref(),
            Some("42")
        );
    }

    #[test]
    fn rejects_invalid_threshold() {
        let err = AppServices::in_memory()
            .with_completion_threshold(150.0)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            AppServicesError::Settings(SettingsError::InvalidCompletionThreshold(_))
        ));
    }
}
