//! Per-session tracking state
//!
//! One `TrackingContext` exists per browsing session and is passed into
//! every [`SessionTracker`](super::SessionTracker) call. Only the tracker
//! mutates it.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::ledger::PageVisitLedger;
use super::types::{AnalyticsEvent, AnalyticsSnapshot};

/// Default prefix for generated session ids
pub const DEFAULT_SESSION_PREFIX: &str = "session";

/// Session identity, current page and the local event buffer
#[derive(Debug, Clone)]
pub struct TrackingContext {
    session_prefix: String,
    session_id: Option<String>,
    current_page: Option<String>,
    last_visited_page: Option<String>,
    ledger: PageVisitLedger,
    events: Vec<AnalyticsEvent>,
}

impl Default for TrackingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingContext {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_SESSION_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            session_prefix: prefix.into(),
            session_id: None,
            current_page: None,
            last_visited_page: None,
            ledger: PageVisitLedger::new(),
            events: Vec::new(),
        }
    }

    /// Session id, generating it on first use
    ///
    /// Never replaces an existing id. Returns the id and whether it was
    /// created by this call.
    pub(crate) fn ensure_session_id(&mut self, now: DateTime<Utc>) -> (&str, bool) {
        let created = self.session_id.is_none();
        let prefix = &self.session_prefix;
        let id = self
            .session_id
            .get_or_insert_with(|| generate_session_id(prefix, now));
        (id.as_str(), created)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn current_page(&self) -> Option<&str> {
        self.current_page.as_deref()
    }

    pub fn last_visited_page(&self) -> Option<&str> {
        self.last_visited_page.as_deref()
    }

    pub fn ledger(&self) -> &PageVisitLedger {
        &self.ledger
    }

    /// Events tracked in this context, in emission order
    pub fn events(&self) -> &[AnalyticsEvent] {
        &self.events
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut PageVisitLedger {
        &mut self.ledger
    }

    pub(crate) fn record_event(&mut self, event: AnalyticsEvent) {
        self.events.push(event);
    }

    /// Move the current page forward, remembering the page being left
    pub(crate) fn move_to(&mut self, page: &str) {
        if let Some(previous) = self.current_page.take() {
            self.last_visited_page = Some(previous);
        }
        self.current_page = Some(page.to_string());
    }

    pub fn snapshot(&self) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            events: self.events.clone(),
            page_visits: self.ledger.visits().to_vec(),
            session_id: self.session_id.clone(),
            current_page: self.current_page.clone(),
        }
    }

    /// Drop local events, visits and the current page
    ///
    /// The session id and the last visited page survive, so the next page
    /// visit still knows where the user came from.
    pub fn clear(&mut self) {
        self.events.clear();
        self.ledger.clear();
        if let Some(previous) = self.current_page.take() {
            self.last_visited_page = Some(previous);
        }
    }

    /// Forget the session id along with all local state
    pub(crate) fn reset_session(&mut self) -> Option<String> {
        self.events.clear();
        self.ledger.clear();
        self.current_page = None;
        self.last_visited_page = None;
        self.session_id.take()
    }
}

fn generate_session_id(prefix: &str, now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, now.timestamp_millis(), &random[..9])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_session_id_is_idempotent() {
        let mut ctx = TrackingContext::new();
        let now = Utc::now();
        let (first, created) = ctx.ensure_session_id(now);
        let first = first.to_string();
        assert!(created);

        for _ in 0..5 {
            let (again, created) = ctx.ensure_session_id(Utc::now());
            assert_eq!(again, first);
            assert!(!created);
        }
    }

    #[test]
    fn session_id_carries_prefix_and_timestamp() {
        let mut ctx = TrackingContext::with_prefix("onboarding");
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let (id, _) = ctx.ensure_session_id(now);

        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts[0], "onboarding");
        assert_eq!(parts[1], "1700000000000");
        assert_eq!(parts[2].len(), 9);
    }

    #[test]
    fn distinct_contexts_get_distinct_ids() {
        let now = Utc::now();
        let mut a = TrackingContext::new();
        let mut b = TrackingContext::new();
        assert_ne!(a.ensure_session_id(now).0, b.ensure_session_id(now).0);
    }

    #[test]
    fn clear_keeps_session_and_last_page() {
        let mut ctx = TrackingContext::new();
        ctx.ensure_session_id(Utc::now());
        ctx.move_to("goal");
        ctx.clear();

        assert!(ctx.session_id().is_some());
        assert!(ctx.current_page().is_none());
        assert_eq!(ctx.last_visited_page(), Some("goal"));
    }

    #[test]
    fn reset_session_forgets_everything() {
        let mut ctx = TrackingContext::new();
        ctx.ensure_session_id(Utc::now());
        ctx.move_to("goal");

        assert!(ctx.reset_session().is_some());
        assert!(ctx.session_id().is_none());
        assert!(ctx.last_visited_page().is_none());
    }
}
