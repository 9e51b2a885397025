pub mod curriculum;
mod ids;
mod progress;
mod settings;

pub use curriculum::{CurriculumDocument, CurriculumError, Lesson, Nested, Section, Week};
pub use ids::{LessonId, ViewerId};

pub use progress::{Observation, ProgressPhase, ProgressState, percent_of};
pub use settings::{
    DEFAULT_COMPLETION_THRESHOLD, DEFAULT_NAMESPACE, SettingsError, TrackerSettings,
};
