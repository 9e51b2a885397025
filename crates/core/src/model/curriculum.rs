use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::ids::LessonId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CurriculumError {
    /// The payload is not syntactically valid JSON.
    ///
    /// Structural problems never surface here; they degrade to empty
    /// collections instead.
    #[error("curriculum payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

//
// ─── NESTED COLLECTIONS ────────────────────────────────────────────────────────
//

/// A nested collection as it was found in the source document.
///
/// Authoring tools occasionally emit `null`, objects, or strings where an
/// array is expected. Those cases are kept distinguishable from an empty
/// array so they can be reported, but all of them read as "no items".
#[derive(Debug, Clone, PartialEq)]
pub enum Nested<T> {
    Items {
        items: Vec<T>,
        /// Array elements that could not be parsed and were dropped.
        rejected: usize,
    },
    Missing,
    Invalid {
        found: &'static str,
    },
}

impl<T> Nested<T> {
    /// Returns the parsed items, or an empty slice for missing/invalid data.
    #[must_use]
    pub fn items(&self) -> &[T] {
        match self {
            Nested::Items { items, .. } => items,
            Nested::Missing | Nested::Invalid { .. } => &[],
        }
    }

    #[must_use]
    pub fn rejected(&self) -> usize {
        match self {
            Nested::Items { rejected, .. } => *rejected,
            Nested::Missing | Nested::Invalid { .. } => 0,
        }
    }
}

impl<T: DeserializeOwned> Nested<T> {
    /// Interpret an arbitrary JSON value as a collection of `T`.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Nested::Missing,
            Value::Array(raw) => {
                let mut items = Vec::with_capacity(raw.len());
                let mut rejected = 0;
                for element in raw {
                    match serde_json::from_value::<T>(element) {
                        Ok(item) => items.push(item),
                        Err(_) => rejected += 1,
                    }
                }
                Nested::Items { items, rejected }
            }
            other => Nested::Invalid {
                found: json_kind(&other),
            },
        }
    }
}

impl<T> Default for Nested<T> {
    fn default() -> Self {
        Nested::Missing
    }
}

impl<T> From<Vec<T>> for Nested<T> {
    fn from(items: Vec<T>) -> Self {
        Nested::Items { items, rejected: 0 }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Nested<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A single consumable unit of a course.
///
/// Parsing is forgiving at the field level: a lesson is kept as long as it
/// carries a usable `id` (or `_id`). Null or mistyped text fields read as
/// empty, a non-numeric `order` reads as 0, and a `duration` that is neither
/// a number nor a numeric string reads as unknown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    pub description: String,
    /// Secondary sort key inside a section.
    pub order: f64,
    /// Playback length in seconds, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Lesson {
    #[must_use]
    pub fn new(id: impl Into<LessonId>, title: impl Into<String>, order: impl Into<f64>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            order: order.into(),
            duration: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Build a lesson from one JSON element, or `None` when it has no usable id.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut map) = value else {
            return None;
        };
        let id = ["id", "_id"]
            .into_iter()
            .find_map(|key| map.remove(key).and_then(lesson_id))?;
        let duration = ["duration", "duration_secs"]
            .into_iter()
            .find_map(|key| map.get(key).and_then(seconds));

        Some(Self {
            id,
            title: text(map.remove("title")),
            description: text(map.remove("description")),
            order: map.get("order").and_then(Value::as_f64).unwrap_or(0.0),
            duration,
        })
    }
}

impl<'de> Deserialize<'de> for Lesson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value)
            .ok_or_else(|| <D::Error as serde::de::Error>::custom("lesson has no usable id"))
    }
}

fn lesson_id(value: Value) -> Option<LessonId> {
    serde_json::from_value::<LessonId>(value)
        .ok()
        .filter(|id| !id.as_str().trim().is_empty())
}

fn text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(text)) => text,
        _ => String::new(),
    }
}

fn seconds(value: &Value) -> Option<f64> {
    let secs = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    secs.is_finite().then_some(secs)
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(text(Some(value)))
}

//
// ─── SECTION / WEEK ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default)]
    pub lessons: Nested<Lesson>,
}

impl Section {
    #[must_use]
    pub fn new(title: impl Into<String>, lessons: Vec<Lesson>) -> Self {
        Self {
            title: title.into(),
            lessons: lessons.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Week {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default)]
    pub sections: Nested<Section>,
}

impl Week {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        sections: Vec<Section>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            sections: sections.into(),
        }
    }
}

//
// ─── DOCUMENT ──────────────────────────────────────────────────────────────────
//

/// The nested week → section → lesson structure of a course.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurriculumDocument {
    pub weeks: Nested<Week>,
}

impl CurriculumDocument {
    #[must_use]
    pub fn new(weeks: Vec<Week>) -> Self {
        Self {
            weeks: weeks.into(),
        }
    }

    /// Parse a curriculum payload.
    ///
    /// Accepts either a bare array of weeks or an object carrying a `weeks`
    /// (or `curriculum`) array.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError::Json` only when the text is not valid JSON.
    pub fn from_json(text: &str) -> Result<Self, CurriculumError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    /// Interpret an already-parsed JSON payload. Never fails.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let weeks = match value {
            Value::Object(mut map) => {
                let raw = map
                    .remove("weeks")
                    .or_else(|| map.remove("curriculum"))
                    .unwrap_or(Value::Null);
                Nested::from_value(raw)
            }
            other => Nested::from_value(other),
        };
        Self { weeks }
    }
}

impl<'de> Deserialize<'de> for CurriculumDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object_with_weeks() {
        let doc = CurriculumDocument::from_json(
            r#"{
                "weeks": [{
                    "title": "Week 1",
                    "description": "Basics",
                    "sections": [{
                        "title": "Setup",
                        "lessons": [
                            {"_id": "a", "title": "Install", "order": 2, "duration": 120},
                            {"id": 7, "title": "Hello", "order": 1}
                        ]
                    }]
                }]
            }"#,
        )
        .unwrap();

        let weeks = doc.weeks.items();
        assert_eq!(weeks.len(), 1);
        let lessons = weeks[0].sections.items()[0].lessons.items();
        assert_eq!(lessons[0].id, LessonId::new("a"));
        assert_eq!(lessons[0].duration, Some(120.0));
        assert_eq!(lessons[1].id, LessonId::new("7"));
        assert_eq!(lessons[1].duration, None);
    }

    #[test]
    fn accepts_bare_array_and_curriculum_alias() {
        let bare = CurriculumDocument::from_json(r#"[{"title": "W"}]"#).unwrap();
        assert_eq!(bare.weeks.items().len(), 1);

        let aliased = CurriculumDocument::from_json(r#"{"curriculum": [{"title": "W"}]}"#).unwrap();
        assert_eq!(aliased.weeks.items().len(), 1);
    }

    #[test]
    fn non_array_sections_are_invalid_not_fatal() {
        let doc =
            CurriculumDocument::from_json(r#"[{"title": "W", "sections": {"oops": true}}]"#)
                .unwrap();
        let week = &doc.weeks.items()[0];
        assert_eq!(week.sections, Nested::Invalid { found: "object" });
        assert!(week.sections.items().is_empty());
    }

    #[test]
    fn missing_and_null_sections_are_missing() {
        let doc = CurriculumDocument::from_json(r#"[{"title": "A"}, {"sections": null}]"#).unwrap();
        for week in doc.weeks.items() {
            assert_eq!(week.sections, Nested::Missing);
        }
    }

    #[test]
    fn unparseable_lessons_are_dropped_and_counted() {
        let doc = CurriculumDocument::from_json(
            r#"[{"sections": [{"lessons": [{"id": "ok"}, {"title": "no id"}, {"id": null}, 42]}]}]"#,
        )
        .unwrap();
        let lessons = &doc.weeks.items()[0].sections.items()[0].lessons;
        assert_eq!(lessons.items().len(), 1);
        assert_eq!(lessons.rejected(), 3);
    }

    fn only_lesson(json: &str) -> Lesson {
        let doc = CurriculumDocument::from_json(json).unwrap();
        let lessons = doc.weeks.items()[0].sections.items()[0].lessons.items();
        assert_eq!(lessons.len(), 1, "lesson was dropped from {json}");
        lessons[0].clone()
    }

    fn wrap(lesson: &str) -> String {
        format!(r#"[{{"title": "W", "sections": [{{"title": "S", "lessons": [{lesson}]}}]}}]"#)
    }

    #[test]
    fn null_description_reads_as_empty() {
        let lesson = only_lesson(&wrap(r#"{"id": "a", "title": "Intro", "description": null}"#));
        assert_eq!(lesson, Lesson::new("a", "Intro", 0));
    }

    #[test]
    fn free_text_duration_reads_as_unknown() {
        let lesson = only_lesson(&wrap(r#"{"id": "a", "duration": "10 min"}"#));
        assert_eq!(lesson.duration, None);

        let lesson = only_lesson(&wrap(r#"{"id": "a", "duration": " 90.5 "}"#));
        assert_eq!(lesson.duration, Some(90.5));

        let lesson = only_lesson(&wrap(r#"{"id": "a", "duration_secs": 30}"#));
        assert_eq!(lesson.duration, Some(30.0));
    }

    #[test]
    fn fractional_and_mistyped_order_are_kept() {
        assert_eq!(only_lesson(&wrap(r#"{"id": "a", "order": 1.5}"#)).order, 1.5);
        assert_eq!(only_lesson(&wrap(r#"{"id": "a", "order": "first"}"#)).order, 0.0);
    }

    #[test]
    fn lesson_with_both_id_and_underscore_id_is_kept() {
        let lesson = only_lesson(&wrap(r#"{"_id": "a", "id": "a", "title": "Both"}"#));
        assert_eq!(lesson.id, LessonId::new("a"));

        let lesson = only_lesson(&wrap(r#"{"id": "", "_id": "b"}"#));
        assert_eq!(lesson.id, LessonId::new("b"));
    }

    #[test]
    fn null_titles_keep_every_lesson_of_the_week() {
        let doc = CurriculumDocument::from_json(
            r#"[{"title": null, "description": 3, "sections": [
                {"title": null, "lessons": [{"id": "a"}, {"id": "b"}]}
            ]}]"#,
        )
        .unwrap();
        let week = &doc.weeks.items()[0];
        assert_eq!(week.title, "");
        assert_eq!(week.description, "");
        assert_eq!(week.sections.items()[0].lessons.items().len(), 2);
    }

    #[test]
    fn parsed_lesson_matches_builder() {
        let lesson = only_lesson(&wrap(
            r#"{"_id": 12, "title": "Loops", "description": "for and while", "order": 3, "duration": "240"}"#,
        ));
        let expected = Lesson::new("12", "Loops", 3)
            .with_description("for and while")
            .with_duration(240.0);
        assert_eq!(lesson, expected);
    }

    #[test]
    fn scalar_payload_yields_invalid_weeks() {
        let doc = CurriculumDocument::from_json("\"nope\"").unwrap();
        assert_eq!(doc.weeks, Nested::Invalid { found: "string" });
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = CurriculumDocument::from_json("[{").unwrap_err();
        assert!(matches!(err, CurriculumError::Json(_)));
    }
}
