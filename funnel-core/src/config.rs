//! Configuration for tracking, navigation and variant selection

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::navigation::FunnelStep;
use crate::sink::{DEFAULT_OUTCOME_CAPACITY, FlushMode};
use crate::tracking::DEFAULT_SESSION_PREFIX;
use crate::variant::SignalRules;

/// Complete funnel configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunnelConfig {
    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub variant: SignalRules,
}

impl FunnelConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }
}

/// Session tracking and event flushing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// How flushes for one session are scheduled
    #[serde(default)]
    pub flush_mode: FlushMode,

    /// Prefix of generated session ids
    #[serde(default = "default_session_prefix")]
    pub session_prefix: String,

    /// Buffer size of the flush outcome channel
    #[serde(default = "default_outcome_capacity")]
    pub outcome_capacity: usize,
}

fn default_session_prefix() -> String {
    DEFAULT_SESSION_PREFIX.to_string()
}

fn default_outcome_capacity() -> usize {
    DEFAULT_OUTCOME_CAPACITY
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            flush_mode: FlushMode::default(),
            session_prefix: default_session_prefix(),
            outcome_capacity: default_outcome_capacity(),
        }
    }
}

/// Route guard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Query parameter that jumps to `bypass_destination`; empty disables it
    #[serde(default = "default_bypass_param")]
    pub bypass_param: String,

    #[serde(default = "default_bypass_destination")]
    pub bypass_destination: FunnelStep,

    /// Steps that require a signed-in user; unset means every non-entry step
    #[serde(default)]
    pub protected: Option<Vec<FunnelStep>>,
}

fn default_bypass_param() -> String {
    "skip".to_string()
}

fn default_bypass_destination() -> FunnelStep {
    FunnelStep::Payment
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            bypass_param: default_bypass_param(),
            bypass_destination: default_bypass_destination(),
            protected: None,
        }
    }
}

impl NavigationConfig {
    /// Effective set of protected steps
    pub fn protected_steps(&self) -> Vec<FunnelStep> {
        match &self.protected {
            Some(steps) => steps.clone(),
            None => FunnelStep::ALL
                .into_iter()
                .filter(|step| !step.is_entry())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = FunnelConfig::from_toml_str("").unwrap();
        assert_eq!(config, FunnelConfig::default());
        assert_eq!(config.tracking.flush_mode, FlushMode::Serialized);
        assert_eq!(config.tracking.session_prefix, "session");
        assert_eq!(config.navigation.bypass_param, "skip");
        assert_eq!(config.navigation.protected_steps().len(), 6);
    }

    #[test]
    fn parses_all_sections() {
        let toml = r#"
            [tracking]
            flush_mode = "concurrent"
            session_prefix = "onboarding"

            [navigation]
            bypass_destination = "/summary"
            protected = ["/payment", "summary"]

            [variant]
            motivation_question = "q3"
            intrinsic_motivations = ["health"]
        "#;
        let config = FunnelConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.tracking.flush_mode, FlushMode::Concurrent);
        assert_eq!(config.tracking.session_prefix, "onboarding");
        assert_eq!(config.tracking.outcome_capacity, DEFAULT_OUTCOME_CAPACITY);
        assert_eq!(config.navigation.bypass_destination, FunnelStep::Summary);
        assert_eq!(
            config.navigation.protected_steps(),
            vec![FunnelStep::Payment, FunnelStep::Summary]
        );
        assert_eq!(config.variant.motivation_question, "q3");
        assert_eq!(config.variant.challenge_question, "biggest-challenge");
    }

    #[test]
    fn unknown_step_is_rejected() {
        let toml = r#"
            [navigation]
            protected = ["/admin"]
        "#;
        assert!(matches!(
            FunnelConfig::from_toml_str(toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = FunnelConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(FunnelConfig::from_toml_str(&text).unwrap(), config);
    }
}
