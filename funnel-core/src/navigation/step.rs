//! Funnel steps

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One stage of the onboarding funnel, in funnel order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FunnelStep {
    /// Sign-in page; always reachable
    Entry,
    Welcome,
    /// Profile setup: name, goal and preferences
    Goal,
    Quiz,
    Branding,
    Summary,
    Payment,
}

impl FunnelStep {
    /// Every step, entry first
    pub const ALL: [FunnelStep; 7] = [
        FunnelStep::Entry,
        FunnelStep::Welcome,
        FunnelStep::Goal,
        FunnelStep::Quiz,
        FunnelStep::Branding,
        FunnelStep::Summary,
        FunnelStep::Payment,
    ];

    /// Route path of the step
    pub fn path(&self) -> &'static str {
        match self {
            Self::Entry => "/",
            Self::Welcome => "/welcome",
            Self::Goal => "/goal",
            Self::Quiz => "/quiz",
            Self::Branding => "/branding",
            Self::Summary => "/summary",
            Self::Payment => "/payment",
        }
    }

    /// Page name used when tracking visits to the step
    pub fn page_name(&self) -> &'static str {
        match self {
            Self::Entry => "signin",
            other => other.path().trim_start_matches('/'),
        }
    }

    /// Step for an exact route path
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.path() == path)
    }

    /// Step for a route path or a bare name (`"/payment"` or `"payment"`)
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || s == "/" || s.eq_ignore_ascii_case("entry") {
            return Some(Self::Entry);
        }
        let path = if s.starts_with('/') {
            s.to_ascii_lowercase()
        } else {
            format!("/{}", s.to_ascii_lowercase())
        };
        Self::from_path(&path)
    }

    pub fn is_entry(&self) -> bool {
        matches!(self, Self::Entry)
    }
}

impl std::fmt::Display for FunnelStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

impl TryFrom<String> for FunnelStep {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or(ConfigError::UnknownStep(s))
    }
}

impl From<FunnelStep> for String {
    fn from(step: FunnelStep) -> Self {
        step.path().to_string()
    }
}
