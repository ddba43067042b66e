//! funnel-core: Onboarding funnel engine
//!
//! This crate provides the building blocks of a multi-step onboarding flow:
//!
//! - **Session tracking** - [`SessionTracker`] and [`TrackingContext`] for session ids,
//!   page-visit timing and typed analytics events
//! - **Event persistence** - [`EventSink`] merges events into per-session records held
//!   by an [`EventStore`] such as [`MemoryEventStore`] or [`FileEventStore`]
//! - **Navigation** - [`NavigationGuard`] decides whether a step transition is allowed
//!   against a [`RouteGraph`]
//! - **Experiments** - [`select_variant`] and [`variant_hash`] assign paywall variants
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use funnel_core::{
//!     Actor, EventSink, FlushMode, LocalIdentity, MemoryEventStore, SessionTracker,
//!     SystemClock, TrackingContext,
//! };
//!
//! # async fn example() {
//! let identity = Arc::new(LocalIdentity::signed_in(Actor::new("u1")));
//! let clock = Arc::new(SystemClock);
//! let sink = Arc::new(EventSink::new(
//!     Arc::new(MemoryEventStore::new()),
//!     clock.clone(),
//!     FlushMode::Serialized,
//! ));
//! let tracker = SessionTracker::new(identity, sink.clone(), clock);
//!
//! let mut ctx = TrackingContext::new();
//! tracker.track_page_visit(&mut ctx, "welcome", None);
//! tracker.track_page_visit(&mut ctx, "goal", None);
//! tracker.teardown(&mut ctx);
//! sink.wait_idle().await;
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ track_*  ┌──────────────┐ submit  ┌───────────┐
//! │ UI / driver  │─────────▶│SessionTracker│────────▶│ EventSink │
//! └──────────────┘          └──────────────┘         └─────┬─────┘
//!        │ check                   │ ledger               │ fetch/insert/update
//!        ▼                         ▼                      ▼
//! ┌───────────────┐        ┌───────────────┐        ┌────────────┐
//! │NavigationGuard│        │TrackingContext│        │ EventStore │
//! └───────────────┘        └───────────────┘        └────────────┘
//! ```

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod navigation;
pub mod sink;
pub mod store;
pub mod tracking;
pub mod variant;

// Re-export key types for convenience
pub use auth::{Actor, AuthProvider, LocalIdentity};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{FunnelConfig, NavigationConfig, TrackingConfig};
pub use error::{ConfigError, FunnelError, RouteGraphError, StoreError};
pub use navigation::{
    BypassRule, FunnelStep, NavigationDecision, NavigationGuard, NavigationRequest, RouteGraph,
    RouteGraphBuilder,
};
pub use sink::{EventSink, FlushMode, FlushOutcome, FlushResult, FlushStage};
pub use store::{
    EventStore, FileEventStore, MemoryEventStore, PersistedSessionRecord, RecordId, SessionKey,
    StoreOp, StoredRecord,
};
pub use tracking::{
    AnalyticsEvent, AnalyticsSnapshot, EventData, EventKind, PageVisit, PageVisitLedger,
    QuizAnswerEvent, SessionTracker, TrackingContext, format_duration,
};
pub use variant::{
    PaywallContent, PaywallVariant, SignalRules, UserSignals, VariantSelector, select_variant,
    variant_hash,
};
