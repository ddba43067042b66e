//! SessionTracker: turns navigation and user activity into events
//!
//! The tracker owns the collaborators (auth signal, sink, clock) while all
//! per-session state lives in the [`TrackingContext`] the caller passes in.
//! No method returns an error; tracking never interrupts the caller.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{info, warn};

use super::context::TrackingContext;
use super::types::{AnalyticsEvent, EventData, EventKind, PageVisit, QuizAnswerEvent};
use crate::auth::{AuthProvider, LocalIdentity};
use crate::clock::Clock;
use crate::sink::EventSink;
use crate::store::SessionKey;

/// Page name quiz answers are tracked under
pub const QUIZ_PAGE: &str = "quiz";

/// Converts page visits and user actions into analytics events
#[derive(Clone)]
pub struct SessionTracker {
    auth: Arc<dyn AuthProvider>,
    sink: Arc<EventSink>,
    clock: Arc<dyn Clock>,
}

impl SessionTracker {
    pub fn new(auth: Arc<dyn AuthProvider>, sink: Arc<EventSink>, clock: Arc<dyn Clock>) -> Self {
        Self { auth, sink, clock }
    }

    pub fn sink(&self) -> &EventSink {
        &self.sink
    }

    /// Session id for `ctx`, created on first call and stable afterwards
    pub fn ensure_session(&self, ctx: &mut TrackingContext) -> String {
        let (id, created) = ctx.ensure_session_id(self.clock.now());
        if created {
            info!(session_id = %id, "tracking session started");
        }
        id.to_string()
    }

    /// Close the open visit and open one for `page`
    ///
    /// `from_page` falls back to the page being left, then to the last known
    /// page. An empty `from_page` counts as absent. A `page_visit` event
    /// carrying `fromPage` is emitted.
    pub fn track_page_visit(&self, ctx: &mut TrackingContext, page: &str, from_page: Option<&str>) {
        self.ensure_session(ctx);

        let from_page = from_page
            .filter(|p| !p.is_empty())
            .or(ctx.current_page())
            .or(ctx.last_visited_page())
            .map(str::to_string);

        let now = self.clock.now();
        ctx.ledger_mut().enter(page, now, from_page.clone());
        ctx.move_to(page);

        let mut data = EventData::new();
        data.insert(
            "fromPage".to_string(),
            from_page.map(Value::String).unwrap_or(Value::Null),
        );
        self.track_event(ctx, EventKind::PageVisit, Some(page), Some(data));
    }

    /// Close the open visit without opening another, as on view unmount
    ///
    /// Returns the visit that was closed.
    pub fn teardown(&self, ctx: &mut TrackingContext) -> Option<PageVisit> {
        let now = self.clock.now();
        ctx.ledger_mut().close_open(now).cloned()
    }

    /// Record an event and hand it to the sink
    ///
    /// Without a signed-in actor this logs a warning and does nothing.
    pub fn track_event(
        &self,
        ctx: &mut TrackingContext,
        kind: EventKind,
        page: Option<&str>,
        data: Option<EventData>,
    ) {
        let Some(actor) = self.auth.current_user() else {
            warn!(event = %kind, "cannot track analytics event: user not authenticated");
            return;
        };

        let session_id = self.ensure_session(ctx);
        let event = AnalyticsEvent {
            event: kind,
            page: page.map(str::to_string),
            timestamp: self.clock.now(),
            data: data.unwrap_or_default(),
            session_id: session_id.clone(),
            user_id: Some(actor.id.clone()),
        };

        self.sink
            .submit(SessionKey::new(actor.id, session_id), event.clone());
        ctx.record_event(event);
    }

    pub fn track_interaction(
        &self,
        ctx: &mut TrackingContext,
        interaction: &str,
        element: &str,
        extra: Option<EventData>,
    ) {
        let mut data = EventData::new();
        data.insert("interaction".to_string(), json!(interaction));
        data.insert("element".to_string(), json!(element));
        extend(&mut data, extra);
        let page = ctx.current_page().map(str::to_string);
        self.track_event(ctx, EventKind::UserInteraction, page.as_deref(), Some(data));
    }

    pub fn track_form_submit(
        &self,
        ctx: &mut TrackingContext,
        form_name: &str,
        success: bool,
        extra: Option<EventData>,
    ) {
        let mut data = EventData::new();
        data.insert("formName".to_string(), json!(form_name));
        data.insert("success".to_string(), json!(success));
        extend(&mut data, extra);
        let page = ctx.current_page().map(str::to_string);
        self.track_event(ctx, EventKind::FormSubmit, page.as_deref(), Some(data));
    }

    pub fn track_error(&self, ctx: &mut TrackingContext, error: &str, context: Option<EventData>) {
        let mut data = EventData::new();
        data.insert("error".to_string(), json!(error));
        extend(&mut data, context);
        let page = ctx.current_page().map(str::to_string);
        self.track_event(ctx, EventKind::Error, page.as_deref(), Some(data));
    }

    pub fn track_quiz_answer(
        &self,
        ctx: &mut TrackingContext,
        question_id: &str,
        question_index: u32,
        answer: &str,
        time_spent_ms: u64,
        skipped: bool,
    ) {
        let payload = QuizAnswerEvent {
            question_id: question_id.to_string(),
            question_index,
            answer: answer.to_string(),
            time_spent: time_spent_ms,
            skipped,
            timestamp: self.clock.now(),
        };
        let data = match serde_json::to_value(payload) {
            Ok(Value::Object(map)) => map,
            _ => EventData::new(),
        };
        self.track_event(ctx, EventKind::QuizAnswer, Some(QUIZ_PAGE), Some(data));
    }

    /// Sign out: forget the actor and the session id together
    ///
    /// Flushes already submitted keep the session id they were created
    /// with and finish against the old record.
    pub fn logout(&self, identity: &LocalIdentity, ctx: &mut TrackingContext) {
        identity.logout();
        if let Some(session_id) = ctx.reset_session() {
            info!(%session_id, "tracking session cleared");
        }
    }
}

fn extend(data: &mut EventData, extra: Option<EventData>) {
    if let Some(extra) = extra {
        data.extend(extra);
    }
}
