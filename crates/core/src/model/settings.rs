use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("completion threshold must be in (0, 100], got {0}")]
    InvalidCompletionThreshold(f64),

    #[error("storage namespace cannot be empty")]
    EmptyNamespace,

    #[error("storage namespace cannot contain ':'")]
    InvalidNamespace,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Percentage at which a lesson is auto-completed when no override is given.
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 95.0;

/// Key prefix for resume positions when no override is given.
pub const DEFAULT_NAMESPACE: &str = "lesson-progress";

/// Configuration for lesson progress tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    completion_threshold: f64,
    namespace: String,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            namespace: DEFAULT_NAMESPACE.to_owned(),
        }
    }
}

impl TrackerSettings {
    /// Creates custom tracker settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the threshold is outside `(0, 100]` or the
    /// namespace is empty or contains the key separator.
    pub fn new(completion_threshold: f64, namespace: impl Into<String>) -> Result<Self, SettingsError> {
        if !completion_threshold.is_finite()
            || completion_threshold <= 0.0
            || completion_threshold > 100.0
        {
            return Err(SettingsError::InvalidCompletionThreshold(completion_threshold));
        }
        let namespace = namespace.into();
        if namespace.trim().is_empty() {
            return Err(SettingsError::EmptyNamespace);
        }
        if namespace.contains(':') {
            return Err(SettingsError::InvalidNamespace);
        }
        Ok(Self {
            completion_threshold,
            namespace,
        })
    }

    /// Returns a copy with a different completion threshold.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidCompletionThreshold` when out of range.
    pub fn with_completion_threshold(&self, threshold: f64) -> Result<Self, SettingsError> {
        Self::new(threshold, self.namespace.clone())
    }

    #[must_use]
    pub fn completion_threshold(&self) -> f64 {
        self.completion_threshold
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// True when `percent` has reached the completion threshold.
    #[must_use]
    pub fn is_completion(&self, percent: f64) -> bool {
        percent >= self.completion_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_player_behavior() {
        let settings = TrackerSettings::default();
        assert_eq!(settings.completion_threshold(), 95.0);
        assert_eq!(settings.namespace(), "lesson-progress");
        assert!(settings.is_completion(95.0));
        assert!(!settings.is_completion(94.999));
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        for bad in [0.0, -1.0, 100.5, f64::NAN, f64::INFINITY] {
            let err = TrackerSettings::new(bad, "ns").unwrap_err();
            assert!(matches!(err, SettingsError::InvalidCompletionThreshold(_)));
        }
        assert!(TrackerSettings::new(100.0, "ns").is_ok());
    }

    #[test]
    fn rejects_bad_namespaces() {
        assert_eq!(
            TrackerSettings::new(90.0, "  ").unwrap_err(),
            SettingsError::EmptyNamespace
        );
        assert_eq!(
            TrackerSettings::new(90.0, "a:b").unwrap_err(),
            SettingsError::InvalidNamespace
        );
    }

    #[test]
    fn with_threshold_keeps_namespace() {
        let base = TrackerSettings::new(90.0, "course-7").unwrap();
        let updated = base.with_completion_threshold(80.0).unwrap();
        assert_eq!(updated.namespace(), "course-7");
        assert_eq!(updated.completion_threshold(), 80.0);
    }
}
