//! Session and page-visit tracking

pub mod context;
pub mod ledger;
pub mod tracker;
pub mod types;

pub use context::{DEFAULT_SESSION_PREFIX, TrackingContext};
pub use ledger::{PageVisitLedger, format_duration};
pub use tracker::{QUIZ_PAGE, SessionTracker};
pub use types::{
    AnalyticsEvent, AnalyticsSnapshot, EventData, EventKind, PageVisit, QuizAnswerEvent,
};
