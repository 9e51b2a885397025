use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use course_core::model::LessonId;

/// Receiver of the one-shot "lesson completed" signal.
///
/// The tracker calls this exactly once per lesson per session. Forwarding the
/// event to a server and retrying failures is the implementor's business.
pub trait CompletionSink: Send + Sync {
    fn on_lesson_completed(&self, lesson_id: &LessonId, completed_at: DateTime<Utc>);
}

impl<F> CompletionSink for F
where
    F: Fn(&LessonId, DateTime<Utc>) + Send + Sync,
{
    fn on_lesson_completed(&self, lesson_id: &LessonId, completed_at: DateTime<Utc>) {
        self(lesson_id, completed_at);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    pub lesson_id: LessonId,
    pub completed_at: DateTime<Utc>,
}

/// Sink that keeps every event in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingCompletionSink {
    events: Arc<Mutex<Vec<CompletionEvent>>>,
}

impl RecordingCompletionSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<CompletionEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl CompletionSink for RecordingCompletionSink {
    fn on_lesson_completed(&self, lesson_id: &LessonId, completed_at: DateTime<Utc>) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(CompletionEvent {
                lesson_id: lesson_id.clone(),
                completed_at,
            }),
            Err(err) => tracing::warn!(%lesson_id, error = %err, "completion log is poisoned"),
        }
    }
}
