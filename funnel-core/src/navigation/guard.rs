//! Route guard for the onboarding funnel
//!
//! Every navigation attempt is checked in a fixed order:
//!
//! 1. unknown destinations redirect to the entry step
//! 2. protected steps require an authenticated actor, otherwise the user is
//!    sent to the entry step
//! 3. the entry step is always allowed
//! 4. a bypass query parameter aimed at its one destination skips the
//!    graph check entirely
//! 5. a forward edge, then a backward edge, must permit `from -> to`;
//!    anything else redirects to the entry step
//!
//! Illegal transitions are corrected with a redirect and never surface as
//! errors.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::graph::RouteGraph;
use super::step::FunnelStep;
use crate::auth::AuthProvider;
use crate::config::NavigationConfig;
use crate::error::RouteGraphError;

/// Base used only to resolve relative locations into path and query
const LOCATION_BASE: &str = "http://funnel.invalid/";

/// One attempted navigation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
}

impl NavigationRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: normalize_path(&from.into()),
            to: normalize_path(&to.into()),
            query: BTreeMap::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Build a request from raw locations such as `/payment?skip=payment`
    ///
    /// Query parameters are taken from the destination only.
    pub fn from_locations(from: &str, to: &str) -> Self {
        let (from_path, _) = split_location(from);
        let (to_path, query) = split_location(to);
        Self {
            from: from_path,
            to: to_path,
            query,
        }
    }
}

/// Outcome of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum NavigationDecision {
    Allow,
    RedirectToEntry,
    RedirectTo(FunnelStep),
}

impl NavigationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Where the user ends up if this is a redirect
    pub fn redirect_target(&self) -> Option<FunnelStep> {
        match self {
            Self::Allow => None,
            Self::RedirectToEntry => Some(FunnelStep::Entry),
            Self::RedirectTo(step) => Some(*step),
        }
    }
}

/// Query parameter that jumps straight to one destination step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassRule {
    pub param: String,
    pub destination: FunnelStep,
}

impl BypassRule {
    pub fn new(param: impl Into<String>, destination: FunnelStep) -> Self {
        Self {
            param: param.into(),
            destination,
        }
    }

    /// True if the query carries this rule's parameter aimed at its
    /// destination
    ///
    /// A bare flag (`?skip`, `?skip=true`, `?skip=1`) counts as aimed at the
    /// destination; a value naming any other step does not.
    fn is_requested(&self, query: &BTreeMap<String, String>) -> bool {
        match query.get(&self.param).map(|v| v.trim()) {
            None => false,
            Some("" | "true" | "1") => true,
            Some(value) => FunnelStep::parse(value) == Some(self.destination),
        }
    }
}

/// Table-driven state machine gating entry to funnel steps
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    graph: RouteGraph,
    protected: BTreeSet<FunnelStep>,
    bypass: Option<BypassRule>,
}

impl Default for NavigationGuard {
    /// Default funnel, every non-entry step protected, `?skip` to payment
    fn default() -> Self {
        Self {
            graph: RouteGraph::default(),
            protected: FunnelStep::ALL
                .into_iter()
                .filter(|step| !step.is_entry())
                .collect(),
            bypass: Some(BypassRule::new("skip", FunnelStep::Payment)),
        }
    }
}

impl NavigationGuard {
    pub fn new(
        graph: RouteGraph,
        protected: impl IntoIterator<Item = FunnelStep>,
        bypass: Option<BypassRule>,
    ) -> Result<Self, RouteGraphError> {
        graph.validate()?;
        Ok(Self {
            graph,
            protected: protected.into_iter().collect(),
            bypass,
        })
    }

    /// Guard over the default funnel configured from `config`
    pub fn from_config(config: &NavigationConfig) -> Result<Self, RouteGraphError> {
        let bypass = (!config.bypass_param.is_empty())
            .then(|| BypassRule::new(config.bypass_param.clone(), config.bypass_destination));
        Self::new(RouteGraph::default(), config.protected_steps(), bypass)
    }

    pub fn graph(&self) -> &RouteGraph {
        &self.graph
    }

    pub fn is_protected(&self, step: FunnelStep) -> bool {
        self.protected.contains(&step)
    }

    /// Decide whether `request` may proceed
    pub fn check(&self, request: &NavigationRequest, auth: &dyn AuthProvider) -> NavigationDecision {
        let decision = self.decide(request, auth);
        debug!(from = %request.from, to = %request.to, ?decision, "navigation checked");
        decision
    }

    fn decide(&self, request: &NavigationRequest, auth: &dyn AuthProvider) -> NavigationDecision {
        let Some(to) = FunnelStep::from_path(&request.to) else {
            return NavigationDecision::RedirectToEntry;
        };
        let authenticated = auth.is_authenticated();

        if self.is_protected(to) && !authenticated {
            return NavigationDecision::RedirectToEntry;
        }
        if to.is_entry() {
            return NavigationDecision::Allow;
        }

        if let Some(rule) = &self.bypass
            && rule.is_requested(&request.query)
            && (authenticated || !self.is_protected(rule.destination))
        {
            return if to == rule.destination {
                NavigationDecision::Allow
            } else {
                NavigationDecision::RedirectTo(rule.destination)
            };
        }

        let Some(from) = FunnelStep::from_path(&request.from) else {
            return NavigationDecision::RedirectToEntry;
        };
        if self.graph.allows_forward(from, to) || self.graph.allows_backward(from, to) {
            NavigationDecision::Allow
        } else {
            NavigationDecision::RedirectToEntry
        }
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn split_location(location: &str) -> (String, BTreeMap<String, String>) {
    let parsed = Url::parse(LOCATION_BASE).and_then(|base| base.join(location.trim()));
    match parsed {
        Ok(url) => (
            normalize_path(url.path()),
            url.query_pairs().into_owned().collect(),
        ),
        Err(_) => (normalize_path(location), BTreeMap::new()),
    }
}
