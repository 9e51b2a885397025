#![forbid(unsafe_code)]

pub mod index;
pub mod model;
pub mod time;

pub use index::{CurriculumDiagnostic, FlatLesson, FlatLessonSequence, Neighbors, build, find_neighbors};
pub use time::Clock;
