use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::LessonId;
use crate::model::settings::TrackerSettings;

/// Lifecycle of a lesson for one viewer.
///
/// `NotStarted` is never stored; it is the absence of a `ProgressState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressPhase {
    #[must_use]
    pub fn of(state: Option<&ProgressState>) -> Self {
        match state {
            None => ProgressPhase::NotStarted,
            Some(state) if state.is_completed() => ProgressPhase::Completed,
            Some(_) => ProgressPhase::InProgress,
        }
    }
}

/// Outcome of feeding one playback-time report into a `ProgressState`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Percentage of the reported position, or `None` when the duration was unusable.
    pub position_percent: Option<f64>,
    /// True only on the report that crossed the completion threshold.
    pub just_completed: bool,
}

/// Playback and completion state of one lesson for one viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    lesson_id: LessonId,
    /// `None` until a report carries a finite position.
    last_position_secs: Option<f64>,
    percent_complete: f64,
    completed_at: Option<DateTime<Utc>>,
}

impl ProgressState {
    /// A fresh state, as created by the first report for a lesson.
    #[must_use]
    pub fn new(lesson_id: LessonId) -> Self {
        Self {
            lesson_id,
            last_position_secs: None,
            percent_complete: 0.0,
            completed_at: None,
        }
    }

    /// Apply a playback-time report.
    ///
    /// - A negative position is clamped to zero; a non-finite one leaves the
    ///   known position untouched (possibly still unknown).
    /// - `percent_complete` only moves up, and stays put when `duration_secs`
    ///   is not a positive finite number.
    /// - Completion is recorded once, the first time the percentage reaches
    ///   the threshold, and is never undone.
    pub fn observe(
        &mut self,
        position_secs: f64,
        duration_secs: f64,
        settings: &TrackerSettings,
        now: DateTime<Utc>,
    ) -> Observation {
        if position_secs.is_finite() {
            self.last_position_secs = Some(position_secs.max(0.0));
        }

        let position_percent = self
            .last_position_secs
            .and_then(|position| percent_of(position, duration_secs));
        if let Some(percent) = position_percent {
            self.percent_complete = self.percent_complete.max(percent);
        }

        let just_completed = !self.is_completed()
            && settings.is_completion(self.percent_complete);
        if just_completed {
            self.completed_at = Some(now);
        }

        Observation {
            position_percent,
            just_completed,
        }
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn last_position_secs(&self) -> Option<f64> {
        self.last_position_secs
    }

    #[must_use]
    pub fn percent_complete(&self) -> f64 {
        self.percent_complete
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn phase(&self) -> ProgressPhase {
        ProgressPhase::of(Some(self))
    }
}

/// `position / duration` as a percentage in `[0, 100]`.
///
/// Returns `None` for a zero, negative, or non-finite duration.
#[must_use]
pub fn percent_of(position_secs: f64, duration_secs: f64) -> Option<f64> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 || !position_secs.is_finite() {
        return None;
    }
    Some((position_secs * 100.0 / duration_secs).clamp(0.0, 100.0))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn state() -> ProgressState {
        ProgressState::new(LessonId::new("l1"))
    }

    #[test]
    fn percent_is_clamped_and_guarded() {
        assert_eq!(percent_of(50.0, 200.0), Some(25.0));
        assert_eq!(percent_of(300.0, 200.0), Some(100.0));
        assert_eq!(percent_of(10.0, 0.0), None);
        assert_eq!(percent_of(10.0, -5.0), None);
        assert_eq!(percent_of(10.0, f64::NAN), None);
    }

    #[test]
    fn threshold_edge_is_inclusive() {
        let settings = TrackerSettings::default();
        let mut below = state();
        let obs = below.observe(94.9, 100.0, &settings, fixed_now());
        assert!(!obs.just_completed);
        assert_eq!(below.phase(), ProgressPhase::InProgress);

        let mut at = state();
        let obs = at.observe(95.0, 100.0, &settings, fixed_now());
        assert!(obs.just_completed);
        assert_eq!(at.completed_at(), Some(fixed_now()));
    }

    #[test]
    fn completion_fires_once_and_survives_rewind() {
        let settings = TrackerSettings::default();
        let mut s = state();
        assert!(s.observe(99.0, 100.0, &settings, fixed_now()).just_completed);

        let later = fixed_now() + Duration::minutes(5);
        let rewind = s.observe(10.0, 100.0, &settings, later);
        assert!(!rewind.just_completed);
        assert_eq!(rewind.position_percent, Some(10.0));
        assert!(s.is_completed());
        assert_eq!(s.completed_at(), Some(fixed_now()));
        assert_eq!(s.last_position_secs(), Some(10.0));
        assert_eq!(s.percent_complete(), 99.0);

        assert!(!s.observe(100.0, 100.0, &settings, later).just_completed);
    }

    #[test]
    fn zero_duration_keeps_previous_percent() {
        let settings = TrackerSettings::default();
        let mut s = state();
        s.observe(30.0, 100.0, &settings, fixed_now());
        let obs = s.observe(60.0, 0.0, &settings, fixed_now());
        assert_eq!(obs.position_percent, None);
        assert_eq!(s.percent_complete(), 30.0);
        assert_eq!(s.last_position_secs(), Some(60.0));
    }

    #[test]
    fn negative_and_nan_positions() {
        let settings = TrackerSettings::default();
        let mut s = state();
        s.observe(-3.0, 100.0, &settings, fixed_now());
        assert_eq!(s.last_position_secs(), Some(0.0));

        s.observe(20.0, 100.0, &settings, fixed_now());
        s.observe(f64::NAN, 100.0, &settings, fixed_now());
        assert_eq!(s.last_position_secs(), Some(20.0));
    }

    #[test]
    fn non_finite_first_report_leaves_position_unknown() {
        let settings = TrackerSettings::default();
        let mut s = state();
        let obs = s.observe(f64::INFINITY, 100.0, &settings, fixed_now());
        assert_eq!(obs.position_percent, None);
        assert_eq!(s.last_position_secs(), None);
        assert_eq!(s.phase(), ProgressPhase::InProgress);
    }

    #[test]
    fn custom_threshold_applies() {
        let settings = TrackerSettings::new(80.0, "p").unwrap();
        let mut s = state();
        assert!(s.observe(80.0, 100.0, &settings, fixed_now()).just_completed);
    }

    #[test]
    fn phase_of_absent_state_is_not_started() {
        assert_eq!(ProgressPhase::of(None), ProgressPhase::NotStarted);
    }
}
