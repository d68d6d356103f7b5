use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Question counts a learner may request per category.
pub const ALLOWED_COUNTS: [u8; 5] = [1, 5, 10, 15, 20];

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("theme must not be empty")]
    EmptyTheme,
    #[error("{0} is not an allowed question count")]
    InvalidCount(u8),
    #[error("unknown difficulty tier '{0}'")]
    UnknownTier(String),
    #[error("a quiz needs at least one question")]
    EmptyQuiz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Math,
    Grammar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerKind {
    Numeric,
    Text,
}

/// The generation service sends numeric answers either as JSON numbers or as
/// strings, so both shapes are accepted on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    category: Category,
    #[serde(rename = "questionType")]
    kind: AnswerKind,
    #[serde(rename = "question")]
    prompt: String,
    #[serde(rename = "correctAnswer")]
    correct_answer: CorrectAnswer,
    explanation: String,
    #[serde(default)]
    unit: Option<String>,
}

/// UK key stage selecting the generation instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// KS2, ages 10-11.
    Lower,
    /// KS3, ages 11-14.
    Upper,
}

#[derive(Debug, Clone)]
pub struct QuizConfig {
    theme: String,
    math_count: u8,
    grammar_count: u8,
    tier: Tier,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Math => write!(f, "MATH"),
            Category::Grammar => write!(f, "GRAMMAR"),
        }
    }
}

impl fmt::Display for CorrectAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectAnswer::Number(n) => write!(f, "{}", n),
            CorrectAnswer::Text(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Lower => write!(f, "KS2"),
            Tier::Upper => write!(f, "KS3"),
        }
    }
}

impl FromStr for Tier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ks2" | "lower" => Ok(Tier::Lower),
            "ks3" | "upper" => Ok(Tier::Upper),
            other => Err(ConfigError::UnknownTier(other.to_owned())),
        }
    }
}

impl Question {
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn kind(&self) -> AnswerKind {
        self.kind
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn correct_answer(&self) -> &CorrectAnswer {
        &self.correct_answer
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// The correct answer as a real number, when there is one. Numeric
    /// questions must always produce `Some`; validation enforces that.
    pub fn expected_number(&self) -> Option<f64> {
        match &self.correct_answer {
            CorrectAnswer::Number(n) => Some(*n),
            CorrectAnswer::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.prompt.trim().is_empty() {
            return Err("question text is empty");
        }
        if self.explanation.trim().is_empty() {
            return Err("explanation is empty");
        }
        match self.kind {
            AnswerKind::Numeric => {
                if self.expected_number().is_none() {
                    return Err("numeric answer is not a number");
                }
            }
            AnswerKind::Text => match &self.correct_answer {
                CorrectAnswer::Text(s) if !s.trim().is_empty() => {}
                CorrectAnswer::Text(_) => return Err("text answer is empty"),
                CorrectAnswer::Number(_) => return Err("text question carries a numeric answer"),
            },
        }
        Ok(())
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prompt)?;
        if let Some(unit) = &self.unit {
            write!(f, "\n(answer in {})", unit)?;
        }
        Ok(())
    }
}

impl QuizConfig {
    pub fn new(
        theme: impl Into<String>,
        math_count: u8,
        grammar_count: u8,
        tier: Tier,
    ) -> Result<Self, ConfigError> {
        let theme = theme.into();
        if theme.trim().is_empty() {
            return Err(ConfigError::EmptyTheme);
        }
        for count in [math_count, grammar_count] {
            if !ALLOWED_COUNTS.contains(&count) {
                return Err(ConfigError::InvalidCount(count));
            }
        }
        Ok(Self {
            theme,
            math_count,
            grammar_count,
            tier,
        })
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn math_count(&self) -> u8 {
        self.math_count
    }

    pub fn grammar_count(&self) -> u8 {
        self.grammar_count
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_question(answer: CorrectAnswer) -> Question {
        Question {
            category: Category::Math,
            kind: AnswerKind::Numeric,
            prompt: "What is 3 x 4?".into(),
            correct_answer: answer,
            explanation: "3 groups of 4 make 12.".into(),
            unit: None,
        }
    }

    #[test]
    fn config_rejects_empty_theme() {
        let err = QuizConfig::new("   ", 5, 5, Tier::Lower).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyTheme));
    }

    #[test]
    fn config_rejects_counts_outside_allowed_set() {
        let err = QuizConfig::new("Space", 3, 5, Tier::Lower).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCount(3)));
        let err = QuizConfig::new("Space", 5, 0, Tier::Upper).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCount(0)));
    }

    #[test]
    fn config_accepts_every_allowed_count() {
        for count in ALLOWED_COUNTS {
            QuizConfig::new("Space", count, count, Tier::Upper).unwrap();
        }
    }

    #[test]
    fn tier_parses_both_spellings() {
        assert_eq!("KS2".parse::<Tier>().unwrap(), Tier::Lower);
        assert_eq!("upper".parse::<Tier>().unwrap(), Tier::Upper);
        assert!(matches!(
            "ks4".parse::<Tier>(),
            Err(ConfigError::UnknownTier(_))
        ));
    }

    #[test]
    fn numeric_answer_may_arrive_as_string() {
        let q = numeric_question(CorrectAnswer::Text("12".into()));
        q.validate().unwrap();
        assert_eq!(q.expected_number(), Some(12.0));
    }

    #[test]
    fn numeric_answer_must_parse() {
        let q = numeric_question(CorrectAnswer::Text("twelve".into()));
        assert_eq!(q.validate().unwrap_err(), "numeric answer is not a number");
    }

    #[test]
    fn text_question_needs_a_text_answer() {
        let q = Question {
            category: Category::Grammar,
            kind: AnswerKind::Text,
            prompt: "Name the capital of France.".into(),
            correct_answer: CorrectAnswer::Number(7.0),
            explanation: "Paris is the capital.".into(),
            unit: None,
        };
        assert_eq!(
            q.validate().unwrap_err(),
            "text question carries a numeric answer"
        );
    }

    #[test]
    fn empty_prompt_is_invalid() {
        let mut q = numeric_question(CorrectAnswer::Number(12.0));
        q.prompt = " ".into();
        assert_eq!(q.validate().unwrap_err(), "question text is empty");
    }
}
