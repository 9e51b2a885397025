use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Unique identifier for a Lesson.
///
/// Lesson ids arrive from REST payloads either as strings (document ids) or
/// as plain integers; both deserialize into the same textual form.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LessonId(String);

impl LessonId {
    /// Creates a new `LessonId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying id text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identity of the learner whose progress is being tracked.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewerId(String);

impl ViewerId {
    /// Creates a new `ViewerId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying id text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LessonId({})", self.0)
    }
}

impl fmt::Debug for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewerId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Conversions ───────────────────────────────────────────────────────────────

impl From<&str> for LessonId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LessonId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ViewerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ViewerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ─── Deserialization ───────────────────────────────────────────────────────────

struct LessonIdVisitor;

impl Visitor<'_> for LessonIdVisitor {
    type Value = LessonId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a lesson id string or integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(LessonId::new(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(LessonId(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(LessonId(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(LessonId(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for LessonId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(LessonIdVisitor)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_id_display() {
        let id = LessonId::new("intro-01");
        assert_eq!(id.to_string(), "intro-01");
        assert_eq!(format!("{id:?}"), "LessonId(intro-01)");
    }

    #[test]
    fn test_lesson_id_from_json_string() {
        let id: LessonId = serde_json::from_str("\"64f1c0ffee\"").unwrap();
        assert_eq!(id, LessonId::new("64f1c0ffee"));
    }

    #[test]
    fn test_lesson_id_from_json_integer() {
        let id: LessonId = serde_json::from_str("17").unwrap();
        assert_eq!(id.as_str(), "17");
    }

    #[test]
    fn test_lesson_id_rejects_objects() {
        let result = serde_json::from_str::<LessonId>("{\"id\":1}");
        assert!(result.is_err());
    }

    #[test]
    fn test_viewer_id_serializes_transparently() {
        let id = ViewerId::from("learner-9");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"learner-9\"");
    }
}
