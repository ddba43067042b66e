//! User signals feeding paywall variant selection

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Primary goal picked during profile setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Goal {
    LoseWeight,
    GainWeight,
    MaintainWeight,
    BuildMuscle,
    ImproveHealth,
}

impl Goal {
    /// Goals with a concrete target, as opposed to general wellbeing
    pub fn is_specific(&self) -> bool {
        matches!(self, Self::LoseWeight | Self::GainWeight | Self::BuildMuscle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoseWeight => "lose-weight",
            Self::GainWeight => "gain-weight",
            Self::MaintainWeight => "maintain-weight",
            Self::BuildMuscle => "build-muscle",
            Self::ImproveHealth => "improve-health",
        }
    }
}

impl FromStr for Goal {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "lose-weight" => Ok(Self::LoseWeight),
            "gain-weight" => Ok(Self::GainWeight),
            "maintain-weight" => Ok(Self::MaintainWeight),
            "build-muscle" => Ok(Self::BuildMuscle),
            "improve-health" => Ok(Self::ImproveHealth),
            other => Err(ConfigError::UnknownValue {
                kind: "goal",
                value: other.to_string(),
            }),
        }
    }
}

/// Eating style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DietaryPreference {
    Balanced,
    QuickRecipes,
    MealPrep,
    Flexible,
}

impl DietaryPreference {
    pub fn is_specific(&self) -> bool {
        !matches!(self, Self::Flexible)
    }
}

impl FromStr for DietaryPreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "balanced" => Ok(Self::Balanced),
            "quick-recipes" => Ok(Self::QuickRecipes),
            "meal-prep" => Ok(Self::MealPrep),
            "flexible" => Ok(Self::Flexible),
            other => Err(ConfigError::UnknownValue {
                kind: "dietary preference",
                value: other.to_string(),
            }),
        }
    }
}

/// Time available per day for meals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeCommitment {
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "1hour")]
    OneHour,
    #[serde(rename = "flexible")]
    Flexible,
}

impl TimeCommitment {
    pub fn is_specific(&self) -> bool {
        !matches!(self, Self::Flexible)
    }
}

impl FromStr for TimeCommitment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "15min" => Ok(Self::FifteenMinutes),
            "30min" => Ok(Self::ThirtyMinutes),
            "1hour" => Ok(Self::OneHour),
            "flexible" => Ok(Self::Flexible),
            other => Err(ConfigError::UnknownValue {
                kind: "time commitment",
                value: other.to_string(),
            }),
        }
    }
}

/// One answered quiz question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    pub question_id: String,
    pub answer: String,
    #[serde(default)]
    pub skipped: bool,
}

impl QuizAnswer {
    pub fn new(question_id: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
            skipped: false,
        }
    }
}

/// Everything variant selection looks at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSignals {
    pub goal: Goal,
    #[serde(default)]
    pub dietary_preference: Option<DietaryPreference>,
    #[serde(default)]
    pub time_commitment: Option<TimeCommitment>,
    /// In answer order; a later answer to the same question wins
    #[serde(default)]
    pub quiz_answers: Vec<QuizAnswer>,
}

impl UserSignals {
    pub fn new(goal: Goal) -> Self {
        Self {
            goal,
            dietary_preference: None,
            time_commitment: None,
            quiz_answers: Vec::new(),
        }
    }

    pub fn with_dietary_preference(mut self, preference: DietaryPreference) -> Self {
        self.dietary_preference = Some(preference);
        self
    }

    pub fn with_time_commitment(mut self, commitment: TimeCommitment) -> Self {
        self.time_commitment = Some(commitment);
        self
    }

    pub fn with_answer(mut self, question_id: &str, answer: &str) -> Self {
        self.quiz_answers.push(QuizAnswer::new(question_id, answer));
        self
    }

    /// The effective answer to `question_id`, ignoring skipped entries
    pub fn answer_to(&self, question_id: &str) -> Option<&str> {
        self.quiz_answers
            .iter()
            .rev()
            .find(|a| a.question_id == question_id)
            .filter(|a| !a.skipped)
            .map(|a| a.answer.as_str())
    }
}

/// Which quiz answers count as which behavioral signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalRules {
    /// Question whose answer names the user's biggest challenge
    pub challenge_question: String,
    pub busy_schedule_answers: Vec<String>,
    /// Question about self-discipline
    pub discipline_question: String,
    pub disciplined_answers: Vec<String>,
    /// Question about what drives the user
    pub motivation_question: String,
    /// Motivations counted as intrinsic
    pub intrinsic_motivations: Vec<String>,
}

impl Default for SignalRules {
    fn default() -> Self {
        Self {
            challenge_question: "biggest-challenge".to_string(),
            busy_schedule_answers: vec!["busy-schedule".to_string()],
            discipline_question: "self-discipline".to_string(),
            disciplined_answers: vec!["disciplined".to_string(), "very-disciplined".to_string()],
            motivation_question: "motivation".to_string(),
            intrinsic_motivations: vec![
                "health".to_string(),
                "energy".to_string(),
                "confidence".to_string(),
            ],
        }
    }
}

/// Boolean signals derived from [`UserSignals`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DerivedSignals {
    pub specific_goal: bool,
    pub specific_diet: bool,
    pub specific_time: bool,
    pub busy_schedule: bool,
    pub disciplined: bool,
    pub intrinsically_motivated: bool,
}

impl DerivedSignals {
    pub fn derive(signals: &UserSignals, rules: &SignalRules) -> Self {
        let answered = |question: &str, accepted: &[String]| {
            signals
                .answer_to(question)
                .is_some_and(|answer| accepted.iter().any(|a| a.eq_ignore_ascii_case(answer.trim())))
        };

        Self {
            specific_goal: signals.goal.is_specific(),
            specific_diet: signals
                .dietary_preference
                .is_some_and(|p| p.is_specific()),
            specific_time: signals.time_commitment.is_some_and(|t| t.is_specific()),
            busy_schedule: answered(&rules.challenge_question, &rules.busy_schedule_answers),
            disciplined: answered(&rules.discipline_question, &rules.disciplined_answers),
            intrinsically_motivated: answered(
                &rules.motivation_question,
                &rules.intrinsic_motivations,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_specificity() {
        assert!(Goal::LoseWeight.is_specific());
        assert!(Goal::BuildMuscle.is_specific());
        assert!(!Goal::MaintainWeight.is_specific());
        assert!(!Goal::ImproveHealth.is_specific());
    }

    #[test]
    fn later_answer_overrides_earlier() {
        let signals = UserSignals::new(Goal::LoseWeight)
            .with_answer("motivation", "looks")
            .with_answer("motivation", "health");
        assert_eq!(signals.answer_to("motivation"), Some("health"));
    }

    #[test]
    fn skipped_answer_counts_as_unanswered() {
        let mut signals = UserSignals::new(Goal::LoseWeight).with_answer("motivation", "health");
        signals.quiz_answers.push(QuizAnswer {
            question_id: "motivation".to_string(),
            answer: String::new(),
            skipped: true,
        });
        assert_eq!(signals.answer_to("motivation"), None);
    }

    #[test]
    fn derive_reads_designated_answers() {
        let signals = UserSignals::new(Goal::ImproveHealth)
            .with_dietary_preference(DietaryPreference::Flexible)
            .with_time_commitment(TimeCommitment::ThirtyMinutes)
            .with_answer("biggest-challenge", "busy-schedule")
            .with_answer("self-discipline", "Very-Disciplined")
            .with_answer("motivation", "money");
        let derived = DerivedSignals::derive(&signals, &SignalRules::default());

        assert!(!derived.specific_goal);
        assert!(!derived.specific_diet);
        assert!(derived.specific_time);
        assert!(derived.busy_schedule);
        assert!(derived.disciplined);
        assert!(!derived.intrinsically_motivated);
    }

    #[test]
    fn signals_deserialize_from_profile_json() {
        let json = r#"{
            "goal": "build-muscle",
            "dietaryPreference": "meal-prep",
            "timeCommitment": "1hour",
            "quizAnswers": [{"questionId": "motivation", "answer": "energy"}]
        }"#;
        let signals: UserSignals = serde_json::from_str(json).unwrap();
        assert_eq!(signals.goal, Goal::BuildMuscle);
        assert_eq!(signals.time_commitment, Some(TimeCommitment::OneHour));
        assert_eq!(signals.answer_to("motivation"), Some("energy"));
    }

    #[test]
    fn unknown_goal_fails_to_parse() {
        assert!("fly".parse::<Goal>().is_err());
        assert_eq!("30min".parse::<TimeCommitment>().unwrap(), TimeCommitment::ThirtyMinutes);
    }
}
