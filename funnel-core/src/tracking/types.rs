//! Tracked event and page visit types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form event payload
pub type EventData = Map<String, Value>;

/// Kind of a tracked occurrence
///
/// Kinds are identified by their wire name. `Custom` with a built-in name
/// such as `"page_visit"` is the same kind as the built-in variant: it
/// compares and hashes equal, and reads back as the built-in variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EventKind {
    PageVisit,
    UserInteraction,
    FormSubmit,
    Error,
    QuizAnswer,
    /// Any caller-defined kind
    Custom(String),
}

impl EventKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &str {
        match self {
            Self::PageVisit => "page_visit",
            Self::UserInteraction => "user_interaction",
            Self::FormSubmit => "form_submit",
            Self::Error => "error",
            Self::QuizAnswer => "quiz_answer",
            Self::Custom(name) => name,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "page_visit" => Self::PageVisit,
            "user_interaction" => Self::UserInteraction,
            "form_submit" => Self::FormSubmit,
            "error" => Self::Error,
            "quiz_answer" => Self::QuizAnswer,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl PartialEq for EventKind {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for EventKind {}

impl std::hash::Hash for EventKind {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrete tracked occurrence. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub event: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: EventData,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// One dwell interval on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageVisit {
    pub page: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub entered_at: DateTime<Utc>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub left_at: Option<DateTime<Utc>>,
    /// Dwell time in milliseconds, set when the visit closes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_formatted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_page: Option<String>,
}

impl PageVisit {
    pub fn open(page: impl Into<String>, entered_at: DateTime<Utc>, from_page: Option<String>) -> Self {
        Self {
            page: page.into(),
            entered_at,
            left_at: None,
            duration: None,
            duration_formatted: None,
            from_page,
        }
    }

    pub fn is_open(&self) -> bool {
        self.left_at.is_none()
    }
}

/// Payload of a quiz answer event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswerEvent {
    pub question_id: String,
    pub question_index: u32,
    pub answer: String,
    /// Milliseconds spent on the question
    pub time_spent: u64,
    pub skipped: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Debug/export view of a tracking context
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub events: Vec<AnalyticsEvent>,
    pub page_visits: Vec<PageVisit>,
    pub session_id: Option<String>,
    pub current_page: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_uses_snake_case_wire_names() {
        assert_eq!(EventKind::PageVisit.as_str(), "page_visit");
        assert_eq!(EventKind::parse("quiz_answer"), EventKind::QuizAnswer);
        assert_eq!(
            EventKind::parse("paywall_viewed"),
            EventKind::Custom("paywall_viewed".to_string())
        );
    }

    #[test]
    fn custom_kind_with_builtin_name_is_the_builtin_kind() {
        let custom = EventKind::Custom("page_visit".to_string());
        assert_eq!(custom, EventKind::PageVisit);

        let json = serde_json::to_string(&custom).unwrap();
        let back: EventKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, custom);
        assert!(matches!(back, EventKind::PageVisit));

        let mut seen = std::collections::HashSet::new();
        seen.insert(EventKind::QuizAnswer);
        assert!(!seen.insert(EventKind::Custom("quiz_answer".to_string())));
        assert!(seen.insert(EventKind::Custom("paywall_viewed".to_string())));
    }

    #[test]
    fn analytics_event_serializes_camel_case_with_millis() {
        let event = AnalyticsEvent {
            event: EventKind::PageVisit,
            page: Some("goal".to_string()),
            timestamp: DateTime::from_timestamp_millis(1_700_000_000_123).unwrap(),
            data: EventData::new(),
            session_id: "session_1".to_string(),
            user_id: Some("u1".to_string()),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "page_visit");
        assert_eq!(json["timestamp"], 1_700_000_000_123_i64);
        assert_eq!(json["sessionId"], "session_1");
        assert_eq!(json["userId"], "u1");
    }

    #[test]
    fn open_visit_has_no_close_fields() {
        let visit = PageVisit::open("quiz", Utc::now(), None);
        assert!(visit.is_open());
        assert!(visit.duration.is_none());

        let json = serde_json::to_value(&visit).unwrap();
        assert!(json.get("leftAt").is_none());
    }
}
