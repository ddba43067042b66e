//! Funnel navigation guard

pub mod graph;
pub mod guard;
pub mod step;

pub use graph::{RouteGraph, RouteGraphBuilder};
pub use guard::{BypassRule, NavigationDecision, NavigationGuard, NavigationRequest};
pub use step::FunnelStep;
