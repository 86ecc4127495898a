//! Task references handed to the interval engine.
//!
//! Task records themselves live in the task store; the engine only needs the
//! identifier and the declared duration at the moment focus starts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a task record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The slice of a task record the engine reads when a phase starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusTask {
    pub id: TaskId,
    #[serde(default)]
    pub title: String,
    /// Declared duration in minutes. `None` when missing or unparseable.
    #[serde(default)]
    pub duration_minutes: Option<f64>,
}

impl FocusTask {
    pub fn new(id: impl Into<TaskId>, duration_minutes: Option<f64>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            duration_minutes,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Parse a free-form duration field. Blank or non-numeric input is `None`.
    pub fn parse_duration(raw: &str) -> Option<f64> {
        raw.trim().parse::<f64>().ok().filter(|m| m.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_numbers() {
        assert_eq!(FocusTask::parse_duration("45"), Some(45.0));
        assert_eq!(FocusTask::parse_duration(" 12.5 "), Some(12.5));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert_eq!(FocusTask::parse_duration(""), None);
        assert_eq!(FocusTask::parse_duration("soon"), None);
        assert_eq!(FocusTask::parse_duration("NaN"), None);
    }

    #[test]
    fn task_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&TaskId::new("t-1")).unwrap();
        assert_eq!(json, "\"t-1\"");
    }

    #[test]
    fn focus_task_defaults_missing_fields() {
        let task: FocusTask = serde_json::from_str(r#"{"id":"a"}"#).unwrap();
        assert_eq!(task.id.as_str(), "a");
        assert!(task.title.is_empty());
        assert_eq!(task.duration_minutes, None);
    }
}
