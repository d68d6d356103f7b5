use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::quiz::{Question, QuizConfig, Tier};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("could not reach the generation service: {0}")]
    Unreachable(String),
    #[error("the generation service rejected the credentials")]
    Unauthorized,
    #[error("the generation service reply did not match the expected shape: {0}")]
    MalformedResponse(String),
    #[error("question #{index} in the reply is invalid: {reason}")]
    InvalidQuestion { index: usize, reason: String },
}

/// Seam for the generation service so handlers can be driven by a test double.
pub trait GenerateQuiz {
    /// Issues exactly one generation request. Never retries; a failed
    /// generation is re-initiated by the caller.
    async fn generate(&self, config: &QuizConfig) -> Result<Vec<Question>, GenerateError>;
}

const LOWER_INSTRUCTIONS: &str = "You are an expert teacher creating educational content for a 10-year-old student. Create engaging questions that incorporate the given theme while maintaining educational value appropriate for KS2.";

const UPPER_INSTRUCTIONS: &str = "You are an expert teacher creating educational content for a 13-year-old student. Create engaging questions that incorporate the given theme while maintaining educational value appropriate for KS3.";

const LOWER_REQUIREMENTS: &str = "Requirements for KS2:
- Math questions should be a mix of:
  * Calculation questions requiring numeric answers
  * Standard long division and long multiplication questions
  * Word problems requiring numeric answers
  * Questions about fractions, decimals, and percentages
- Grammar questions should focus on:
  * Using commas in complex sentences
  * Using apostrophes correctly
  * Basic sentence structure
  * Word types (nouns, verbs, adjectives, adverbs)";

const UPPER_REQUIREMENTS: &str = "Requirements for KS3:
- Math questions should be a mix of:
  * Algebra and equations
  * Geometry and measurements
  * Statistics and probability
  * More complex word problems
  * Questions involving negative numbers and indices
- Grammar questions should focus on:
  * Advanced punctuation usage
  * Complex sentence structures
  * Active and passive voice
  * More sophisticated vocabulary
  * Writing techniques and effects";

// The service has no schema registration, so the output shape is spelled out
// inline in every request.
const OUTPUT_SHAPE: &str = r#"Return a JSON object with this exact structure:
{
  "questions": [{
    "type": "math" | "grammar",
    "questionType": "numeric" | "text",
    "question": "question text",
    "correctAnswer": "answer" (string for text, number for numeric),
    "explanation": "explanation of the answer",
    "unit": "optional unit for numeric answers (e.g., meters, seconds)"
  }]
}"#;

pub fn build_instructions(tier: Tier) -> &'static str {
    match tier {
        Tier::Lower => LOWER_INSTRUCTIONS,
        Tier::Upper => UPPER_INSTRUCTIONS,
    }
}

pub fn build_content(config: &QuizConfig) -> String {
    let (stage, requirements) = match config.tier() {
        Tier::Lower => ("UK Key Stage 2 (Year 5-6)", LOWER_REQUIREMENTS),
        Tier::Upper => ("UK Key Stage 3 (Year 7-9)", UPPER_REQUIREMENTS),
    };

    format!(
        "Create a {} quiz with {} math questions and {} grammar questions. Theme: {}.\n\n{}\n\nAll questions should incorporate the {} theme\n{}",
        stage,
        config.math_count(),
        config.grammar_count(),
        config.theme(),
        requirements,
        config.theme(),
        OUTPUT_SHAPE,
    )
}

#[derive(Debug, Deserialize)]
struct QuizPayload {
    questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Parses the completion text into the question list. One bad question
/// rejects the whole batch; a short quiz with corrupt items hidden from the
/// learner is worse than no quiz.
pub fn parse_reply(content: &str) -> Result<Vec<Question>, GenerateError> {
    let payload: QuizPayload = serde_json::from_str(content)
        .map_err(|e| GenerateError::MalformedResponse(e.to_string()))?;

    for (index, question) in payload.questions.iter().enumerate() {
        question
            .validate()
            .map_err(|reason| GenerateError::InvalidQuestion {
                index,
                reason: reason.to_owned(),
            })?;
    }

    Ok(payload.questions)
}

/// Client for an OpenAI-compatible chat-completion endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: Url, api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}

impl GenerateQuiz for OpenAiClient {
    async fn generate(&self, config: &QuizConfig) -> Result<Vec<Question>, GenerateError> {
        log::info!(
            "requesting a {} quiz ({} math, {} grammar) from model {}",
            config.theme(),
            config.math_count(),
            config.grammar_count(),
            self.model
        );
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": build_instructions(config.tier()) },
                { "role": "user", "content": build_content(config) }
            ],
            "response_format": { "type": "json_object" }
        });

        let response = self
            .http
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GenerateError::Unauthorized);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerateError::Unreachable(format!("{}: {}", status, text)));
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| GenerateError::MalformedResponse(e.to_string()))?;
        let content = reply
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| {
                GenerateError::MalformedResponse("reply carried no choices".to_owned())
            })?;

        log::debug!("generation reply: {}", content);
        parse_reply(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{QuizSession, SessionState};

    #[test]
    fn content_carries_theme_and_counts() {
        let config = QuizConfig::new("Deep Space", 5, 15, Tier::Upper).unwrap();
        let content = build_content(&config);
        assert!(content.contains("Deep Space"));
        assert!(content.contains("5 math questions"));
        assert!(content.contains("15 grammar questions"));
        assert!(content.contains("Key Stage 3"));
        assert!(content.contains("\"questions\""));
    }

    #[test]
    fn instructions_differ_per_tier() {
        assert!(build_instructions(Tier::Lower).contains("10-year-old"));
        assert!(build_instructions(Tier::Upper).contains("13-year-old"));
        assert_ne!(build_instructions(Tier::Lower), build_instructions(Tier::Upper));
    }

    #[test]
    fn valid_reply_parses_in_order() {
        let questions = parse_reply(
            r#"{"questions":[
                {"type":"math","questionType":"numeric","question":"How deep is the Mariana Trench in km, to the nearest km?","correctAnswer":11,"explanation":"It is about 11 km deep.","unit":"km"},
                {"type":"grammar","questionType":"text","question":"Is 'ocean' a noun or a verb?","correctAnswer":"noun","explanation":"It names a thing."}
            ]}"#,
        )
        .unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].unit(), Some("km"));
        assert_eq!(questions[1].prompt(), "Is 'ocean' a noun or a verb?");
    }

    #[test]
    fn missing_questions_field_is_malformed() {
        let err = parse_reply(r#"{"quiz":[]}"#).unwrap_err();
        assert!(matches!(err, GenerateError::MalformedResponse(_)));
    }

    #[test]
    fn non_json_reply_is_malformed() {
        let err = parse_reply("Sorry, I cannot help with that.").unwrap_err();
        assert!(matches!(err, GenerateError::MalformedResponse(_)));
    }

    #[test]
    fn one_bad_question_rejects_the_batch() {
        let err = parse_reply(
            r#"{"questions":[
                {"type":"math","questionType":"numeric","question":"2+2?","correctAnswer":4,"explanation":"Basic addition."},
                {"type":"math","questionType":"numeric","question":"3+3?","correctAnswer":"six","explanation":"Basic addition."}
            ]}"#,
        )
        .unwrap_err();
        match err {
            GenerateError::InvalidQuestion { index, reason } => {
                assert_eq!(index, 1);
                assert_eq!(reason, "numeric answer is not a number");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    // End-to-end: a canned service reply walked through a whole session.
    #[test]
    fn canned_reply_runs_to_completion() {
        let questions = parse_reply(
            r#"{"questions":[
                {"type":"math","questionType":"numeric","question":"An octopus has 8 arms. How many arms do 1.5 octopuses have?","correctAnswer":12,"explanation":"8 x 1.5 = 12."},
                {"type":"grammar","questionType":"text","question":"Which word in 'The waves crash loudly' is the adverb?","correctAnswer":"loudly","explanation":"It describes how the waves crash."}
            ]}"#,
        )
        .unwrap();

        let mut session = QuizSession::new(questions).unwrap();
        assert_eq!(session.progress(), (0, 2));
        assert!(session.submit_answer("12").unwrap().is_correct());
        assert_eq!(session.advance().unwrap(), SessionState::AwaitingAnswer);
        assert!(!session.submit_answer("crash").unwrap().is_correct());
        assert_eq!(session.advance().unwrap(), SessionState::Completed);
        let score = session.score();
        assert_eq!((score.correct, score.graded), (1, 2));
    }
}
