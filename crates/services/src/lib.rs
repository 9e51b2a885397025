#![forbid(unsafe_code)]

pub mod app_services;
pub mod completion;
pub mod course_progress;
pub mod error;
pub mod progress_tracker;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use completion::{CompletionEvent, CompletionSink, RecordingCompletionSink};
pub use course_progress::CourseProgress;
pub use error::AppServicesError;
pub use progress_tracker::{LessonProgressTracker, ProgressUpdate};
