//! Paywall experiment assignment
//!
//! [`select_variant`] classifies a user by their profile and quiz answers.
//! Rules are checked in priority order and the first match wins:
//!
//! - **Structured**: busy schedule and (disciplined or intrinsically
//!   motivated), or specific goal and (specific diet or specific time)
//! - **Motivation**: not busy and (not disciplined or not intrinsically
//!   motivated), or no specific goal and (no specific diet or no specific
//!   time)
//! - **Fallback** otherwise
//!
//! [`variant_hash`] is an independent coarse 50/50 split by id. Both are pure.

mod content;
mod hash;
mod signals;

use serde::{Deserialize, Serialize};

pub use content::{PaywallContent, Personalization, content_for};
pub use hash::{bucket_hash, variant_hash};
pub use signals::{
    DerivedSignals, DietaryPreference, Goal, QuizAnswer, SignalRules, TimeCommitment,
    UserSignals,
};

/// Paywall variant label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaywallVariant {
    /// High-intent users who respond to a concrete plan
    Structured,
    /// Users who need encouragement to start
    Motivation,
    Fallback,
}

impl PaywallVariant {
    pub const ALL: [PaywallVariant; 3] = [Self::Structured, Self::Motivation, Self::Fallback];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Motivation => "motivation",
            Self::Fallback => "fallback",
        }
    }

    pub fn content(&self) -> &'static PaywallContent {
        content_for(*self)
    }
}

impl std::fmt::Display for PaywallVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the paywall variant for `signals`
pub fn select_variant(signals: &UserSignals, rules: &SignalRules) -> PaywallVariant {
    classify(&DerivedSignals::derive(signals, rules))
}

/// Apply the rule table to already derived signals
pub fn classify(s: &DerivedSignals) -> PaywallVariant {
    let structured = (s.busy_schedule && (s.disciplined || s.intrinsically_motivated))
        || (s.specific_goal && (s.specific_diet || s.specific_time));
    if structured {
        return PaywallVariant::Structured;
    }

    let needs_motivation = (!s.busy_schedule && (!s.disciplined || !s.intrinsically_motivated))
        || (!s.specific_goal && (!s.specific_diet || !s.specific_time));
    if needs_motivation {
        return PaywallVariant::Motivation;
    }

    PaywallVariant::Fallback
}

/// Variant selection with a fixed rule set
#[derive(Debug, Clone, Default)]
pub struct VariantSelector {
    rules: SignalRules,
}

impl VariantSelector {
    pub fn new(rules: SignalRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &SignalRules {
        &self.rules
    }

    pub fn select(&self, signals: &UserSignals) -> PaywallVariant {
        select_variant(signals, &self.rules)
    }
}
