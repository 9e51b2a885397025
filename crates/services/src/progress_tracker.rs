use std::collections::HashMap;
use std::sync::Arc;

use course_core::{
    model::{LessonId, ProgressPhase, ProgressState, TrackerSettings, ViewerId},
    time::Clock,
};
use storage::repository::{KeyValueStore, resume_key};

use crate::completion::CompletionSink;

/// Result of a single playback-time report.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub lesson_id: LessonId,
    /// Resume position after this report; `None` until a finite position is seen.
    pub position_secs: Option<f64>,
    /// Percentage of the reported position; `None` when the duration was unusable.
    pub position_percent: Option<f64>,
    /// Highest percentage observed for the lesson so far.
    pub percent_complete: f64,
    /// True only on the report that completed the lesson.
    pub just_completed: bool,
}

/// Turns a stream of playback-time reports into resume positions and a
/// one-shot completion signal, for a single viewer.
///
/// Calls are synchronous and never fail: persistence problems are logged
/// and playback continues.
pub struct LessonProgressTracker {
    viewer: ViewerId,
    settings: TrackerSettings,
    clock: Clock,
    store: Arc<dyn KeyValueStore>,
    sink: Arc<dyn CompletionSink>,
    states: HashMap<LessonId, ProgressState>,
}

impl LessonProgressTracker {
    #[must_use]
    pub fn new(
        viewer: ViewerId,
        store: Arc<dyn KeyValueStore>,
        sink: Arc<dyn CompletionSink>,
    ) -> Self {
        Self {
            viewer,
            settings: TrackerSettings::default(),
            clock: Clock::default(),
            store,
            sink,
            states: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: TrackerSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Record the current playback time of a lesson.
    ///
    /// Creates the lesson's state on first use, persists the resume position,
    /// and notifies the completion sink the first time the completion
    /// threshold is reached.
    pub fn report_position(
        &mut self,
        lesson_id: &LessonId,
        current_time_secs: f64,
        duration_secs: f64,
    ) -> ProgressUpdate {
        let now = self.clock.now();
        let state = self
            .states
            .entry(lesson_id.clone())
            .or_insert_with(|| ProgressState::new(lesson_id.clone()));
        let observation = state.observe(current_time_secs, duration_secs, &self.settings, now);
        let position_secs = state.last_position_secs();
        let percent_complete = state.percent_complete();
        let completed_at = state.completed_at();

        match position_secs {
            Some(secs) if current_time_secs.is_finite() => self.persist_position(lesson_id, secs),
            _ => tracing::debug!(%lesson_id, "ignoring non-finite playback position"),
        }

        if observation.just_completed {
            if let Some(completed_at) = completed_at {
                tracing::info!(
                    viewer = %self.viewer,
                    %lesson_id,
                    percent = percent_complete,
                    "lesson completed"
                );
                self.sink.on_lesson_completed(lesson_id, completed_at);
            }
        }

        ProgressUpdate {
            lesson_id: lesson_id.clone(),
            position_secs,
            position_percent: observation.position_percent,
            percent_complete,
            just_completed: observation.just_completed,
        }
    }

    /// Where playback of `lesson_id` should start, if anywhere but zero.
    ///
    /// A finite position observed in this session wins; otherwise the
    /// durable store is consulted. Read failures and unreadable values count
    /// as "no position".
    #[must_use]
    pub fn resume(&self, lesson_id: &LessonId) -> Option<f64> {
        if let Some(secs) = self
            .states
            .get(lesson_id)
            .and_then(ProgressState::last_position_secs)
        {
            return Some(secs);
        }

        let key = self.key_for(lesson_id);
        let raw = match self.store.get(&key) {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(%key, error = %err, "failed to read resume position");
                return None;
            }
        };
        match raw.trim().parse::<f64>() {
            Ok(secs) if secs.is_finite() && secs >= 0.0 => Some(secs),
            _ => {
                tracing::warn!(%key, value = %raw, "ignoring unreadable resume position");
                None
            }
        }
    }

    #[must_use]
    pub fn state(&self, lesson_id: &LessonId) -> Option<&ProgressState> {
        self.states.get(lesson_id)
    }

    #[must_use]
    pub fn phase(&self, lesson_id: &LessonId) -> ProgressPhase {
        ProgressPhase::of(self.states.get(lesson_id))
    }

    #[must_use]
    pub fn is_completed(&self, lesson_id: &LessonId) -> bool {
        self.phase(lesson_id) == ProgressPhase::Completed
    }

    /// States of every lesson observed in this session, in no particular order.
    pub fn states(&self) -> impl Iterator<Item = &ProgressState> {
        self.states.values()
    }

    #[must_use]
    pub fn viewer(&self) -> &ViewerId {
        &self.viewer
    }

    #[must_use]
    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    fn key_for(&self, lesson_id: &LessonId) -> String {
        resume_key(self.settings.namespace(), &self.viewer, lesson_id)
    }

    fn persist_position(&self, lesson_id: &LessonId, position_secs: f64) {
        let key = self.key_for(lesson_id);
        if let Err(err) = self.store.set(&key, &position_secs.to_string()) {
            tracing::warn!(%key, error = %err, "failed to persist resume position");
        }
    }
}
