use course_core::FlatLessonSequence;
use course_core::model::LessonId;

use crate::progress_tracker::LessonProgressTracker;

/// Aggregated view of course progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseProgress {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
    pub is_complete: bool,
    /// First lesson in navigation order that is not completed yet.
    pub next_incomplete: Option<LessonId>,
}

impl CourseProgress {
    /// Summarize completion of `sequence` as seen by `tracker`.
    ///
    /// An empty course is never complete.
    #[must_use]
    pub fn summarize(sequence: &FlatLessonSequence, tracker: &LessonProgressTracker) -> Self {
        let total = sequence.len();
        let mut completed = 0;
        let mut next_incomplete = None;
        for entry in sequence {
            if tracker.is_completed(entry.id()) {
                completed += 1;
            } else if next_incomplete.is_none() {
                next_incomplete = Some(entry.id().clone());
            }
        }
        let remaining = total - completed;

        Self {
            total,
            completed,
            remaining,
            is_complete: total > 0 && remaining == 0,
            next_incomplete,
        }
    }

    /// Share of completed lessons in `[0, 100]`.
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.completed as f64 / self.total as f64;
        ratio * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::RecordingCompletionSink;
    use course_core::model::{CurriculumDocument, Lesson, Section, ViewerId, Week};
    use course_core::time::fixed_clock;
    use std::sync::Arc;
    use storage::repository::InMemoryKeyValueStore;

    fn sequence() -> FlatLessonSequence {
        course_core::build(&CurriculumDocument::new(vec![Week::new(
            "W",
            "",
            vec![Section::new(
                "S",
                vec![
                    Lesson::new("a", "", 1),
                    Lesson::new("b", "", 2),
                    Lesson::new("c", "", 3),
                ],
            )],
        )]))
    }

    fn tracker() -> LessonProgressTracker {
        LessonProgressTracker::new(
            ViewerId::new("v"),
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(RecordingCompletionSink::new()),
        )
        .with_clock(fixed_clock())
    }

    #[test]
    fn points_at_first_unfinished_lesson() {
        let mut tracker = tracker();
        tracker.report_position(&LessonId::new("a"), 100.0, 100.0);
        tracker.report_position(&LessonId::new("b"), 10.0, 100.0);

        let progress = CourseProgress::summarize(&sequence(), &tracker);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.remaining, 2);
        assert!(!progress.is_complete);
        assert_eq!(progress.next_incomplete, Some(LessonId::new("b")));
    }

    #[test]
    fn all_completed_course_is_complete() {
        let mut tracker = tracker();
        for id in ["a", "b", "c"] {
            tracker.report_position(&LessonId::new(id), 96.0, 100.0);
        }
        let progress = CourseProgress::summarize(&sequence(), &tracker);
        assert!(progress.is_complete);
        assert_eq!(progress.next_incomplete, None);
        assert_eq!(progress.percent(), 100.0);
    }

    #[test]
    fn empty_course_is_not_complete() {
        let progress = CourseProgress::summarize(&FlatLessonSequence::default(), &tracker());
        assert_eq!(progress.total, 0);
        assert!(!progress.is_complete);
        assert_eq!(progress.percent(), 0.0);
    }
}
