//! Paywall copy for each variant

use serde::Serialize;

use super::PaywallVariant;

/// How much of the user's profile the copy leans on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Personalization {
    None,
    Goal,
    GoalAndPreferences,
    Full,
}

/// Display content for one paywall variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaywallContent {
    pub variant: PaywallVariant,
    pub headline: &'static str,
    pub subheadline: &'static str,
    pub benefits: &'static [&'static str],
    pub cta: &'static str,
    /// Behavioral principles the copy relies on
    pub principles: &'static [&'static str],
    pub personalization: Personalization,
}

const STRUCTURED: PaywallContent = PaywallContent {
    variant: PaywallVariant::Structured,
    headline: "Your Custom Plan is Ready",
    subheadline: "We've analyzed your goals and created a personalized plan just for you. \
                  As a thank you for your time, get unlimited access for 30% off - your first \
                  recipe delivered instantly.",
    benefits: &[
        "Instant access to your personalized plan",
        "30% discount on your first month",
        "No commitment, cancel anytime",
        "Expert guidance included",
    ],
    cta: "Claim Your 30% Discount",
    principles: &["reciprocity", "present_bias"],
    personalization: Personalization::Full,
};

const MOTIVATION: PaywallContent = PaywallContent {
    variant: PaywallVariant::Motivation,
    headline: "People Like You Succeed 2x Faster",
    subheadline: "Users with your same preferences lose 2x more weight in the first month. \
                  Start with achievable daily wins and build lasting habits.",
    benefits: &[
        "Learn from successful users with similar goals",
        "Start with small, achievable changes",
        "Build sustainable healthy habits",
        "Track progress against similar users",
    ],
    cta: "Join the Success Stories",
    principles: &["social_comparison", "small_wins"],
    personalization: Personalization::GoalAndPreferences,
};

const FALLBACK: PaywallContent = PaywallContent {
    variant: PaywallVariant::Fallback,
    headline: "Join 50,000+ Successful Users",
    subheadline: "Transform your health with nutritionist-approved plans backed by science \
                  and real results.",
    benefits: &[
        "Personalized meal plans based on your goals",
        "Recipes approved by registered dietitians",
        "Track progress with detailed analytics",
        "24/7 support from nutrition experts",
    ],
    cta: "Start Your Transformation",
    principles: &["authority", "social_proof"],
    personalization: Personalization::None,
};

/// Content shown for `variant`
pub fn content_for(variant: PaywallVariant) -> &'static PaywallContent {
    match variant {
        PaywallVariant::Structured => &STRUCTURED,
        PaywallVariant::Motivation => &MOTIVATION,
        PaywallVariant::Fallback => &FALLBACK,
    }
}
