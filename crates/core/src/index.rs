//! Flattening of a nested curriculum into a linear lesson sequence, plus
//! previous/next lookup over that sequence.
//!
//! Both operations are total: malformed structure shrinks the result and is
//! reported through [`CurriculumDiagnostic`]s, never through errors.

use std::fmt;

use crate::model::{CurriculumDocument, Lesson, LessonId, Nested};

//
// ─── DIAGNOSTICS ───────────────────────────────────────────────────────────────
//

/// Where in the document a structural problem was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Document,
    Week { week: usize },
    Section { week: usize, section: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Problem {
    /// The nested collection was absent or `null`.
    Missing,
    /// The nested collection was not an array.
    Invalid { found: &'static str },
    /// Some array elements could not be parsed and were dropped.
    Rejected { count: usize },
}

/// A content-authoring issue noticed while flattening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurriculumDiagnostic {
    pub location: Location,
    pub problem: Problem,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Document => f.write_str("weeks"),
            Location::Week { week } => write!(f, "week[{week}].sections"),
            Location::Section { week, section } => {
                write!(f, "week[{week}].sections[{section}].lessons")
            }
        }
    }
}

impl fmt::Display for CurriculumDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.problem {
            Problem::Missing => write!(f, "{} is missing", self.location),
            Problem::Invalid { found } => {
                write!(f, "{} is {found}, expected an array", self.location)
            }
            Problem::Rejected { count } => {
                write!(f, "{} dropped {count} unreadable entries", self.location)
            }
        }
    }
}

fn inspect<T>(nested: &Nested<T>, location: Location, out: &mut Vec<CurriculumDiagnostic>) {
    let problem = match nested {
        Nested::Missing => Problem::Missing,
        Nested::Invalid { found } => Problem::Invalid { found: *found },
        Nested::Items { rejected, .. } if *rejected > 0 => Problem::Rejected { count: *rejected },
        Nested::Items { .. } => return,
    };
    let diagnostic = CurriculumDiagnostic { location, problem };
    match problem {
        Problem::Missing => tracing::debug!(%location, "curriculum: {diagnostic}"),
        Problem::Invalid { .. } | Problem::Rejected { .. } => {
            tracing::warn!(%location, "curriculum: {diagnostic}");
        }
    }
    out.push(diagnostic);
}

//
// ─── FLAT SEQUENCE ─────────────────────────────────────────────────────────────
//

/// One lesson in navigation order, with the titles of its enclosing week and section.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatLesson {
    lesson: Lesson,
    week_title: String,
    section_title: String,
    week_index: usize,
    section_index: usize,
}

impl FlatLesson {
    #[must_use]
    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.lesson.id
    }

    #[must_use]
    pub fn week_title(&self) -> &str {
        &self.week_title
    }

    #[must_use]
    pub fn section_title(&self) -> &str {
        &self.section_title
    }

    #[must_use]
    pub fn week_index(&self) -> usize {
        self.week_index
    }

    #[must_use]
    pub fn section_index(&self) -> usize {
        self.section_index
    }
}

/// Read-only, linear view of a curriculum.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatLessonSequence {
    entries: Vec<FlatLesson>,
    diagnostics: Vec<CurriculumDiagnostic>,
}

impl FlatLessonSequence {
    /// Same as [`build`].
    #[must_use]
    pub fn from_document(document: &CurriculumDocument) -> Self {
        build(document)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlatLesson> {
        self.entries.iter()
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.entries.iter().map(FlatLesson::lesson)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FlatLesson> {
        self.entries.get(index)
    }

    /// Index of the first entry with the given id.
    #[must_use]
    pub fn position(&self, id: &LessonId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: &LessonId) -> bool {
        self.position(id).is_some()
    }

    /// Same as [`find_neighbors`].
    #[must_use]
    pub fn neighbors(&self, current: &LessonId) -> Neighbors<'_> {
        find_neighbors(self, current)
    }

    /// Sum of known, positive lesson durations in seconds.
    #[must_use]
    pub fn total_duration_secs(&self) -> f64 {
        self.lessons()
            .filter_map(|lesson| lesson.duration)
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .sum()
    }

    /// Structural problems noticed while building this sequence.
    #[must_use]
    pub fn diagnostics(&self) -> &[CurriculumDiagnostic] {
        &self.diagnostics
    }
}

impl<'a> IntoIterator for &'a FlatLessonSequence {
    type Item = &'a FlatLesson;
    type IntoIter = std::slice::Iter<'a, FlatLesson>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

//
// ─── OPERATIONS ────────────────────────────────────────────────────────────────
//

/// Flatten a curriculum into navigation order.
///
/// Weeks, then sections, are walked in document order. Inside a section
/// lessons are stably sorted by `order`, so equal `order` values keep their
/// document order. Unusable nested collections contribute nothing.
#[must_use]
pub fn build(document: &CurriculumDocument) -> FlatLessonSequence {
    let mut diagnostics = Vec::new();
    let mut entries = Vec::new();

    inspect(&document.weeks, Location::Document, &mut diagnostics);
    for (week_index, week) in document.weeks.items().iter().enumerate() {
        inspect(
            &week.sections,
            Location::Week { week: week_index },
            &mut diagnostics,
        );
        for (section_index, section) in week.sections.items().iter().enumerate() {
            inspect(
                &section.lessons,
                Location::Section {
                    week: week_index,
                    section: section_index,
                },
                &mut diagnostics,
            );

            let mut lessons: Vec<&Lesson> = section.lessons.items().iter().collect();
            // `sort_by` is stable.
            lessons.sort_by(|a, b| a.order.total_cmp(&b.order));
            entries.extend(lessons.into_iter().map(|lesson| FlatLesson {
                lesson: lesson.clone(),
                week_title: week.title.clone(),
                section_title: section.title.clone(),
                week_index,
                section_index,
            }));
        }
    }

    FlatLessonSequence {
        entries,
        diagnostics,
    }
}

/// Lessons adjacent to the current one in navigation order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Neighbors<'a> {
    pub previous: Option<&'a Lesson>,
    pub next: Option<&'a Lesson>,
}

impl Neighbors<'_> {
    /// True when there is nowhere to navigate to.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.previous.is_none() && self.next.is_none()
    }
}

/// Previous and next lessons around `current`.
///
/// Only the first entry with a matching id is considered. An id that is not
/// in the sequence yields no neighbors at all.
#[must_use]
pub fn find_neighbors<'a>(sequence: &'a FlatLessonSequence, current: &LessonId) -> Neighbors<'a> {
    let Some(index) = sequence.position(current) else {
        return Neighbors::default();
    };
    Neighbors {
        previous: index
            .checked_sub(1)
            .and_then(|i| sequence.get(i))
            .map(FlatLesson::lesson),
        next: sequence.get(index + 1).map(FlatLesson::lesson),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
