use std::collections::BTreeMap;

use crate::quiz::{AnswerKind, ConfigError, Question};

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("answer must not be empty")]
    EmptyAnswer,
    #[error("'{op}' is not valid while the session is {state:?}")]
    InvalidTransition {
        op: &'static str,
        state: SessionState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingAnswer,
    ShowingResult,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    submitted: String,
    is_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub graded: usize,
}

/// One run through a fixed question list. Purely in-memory; the presentation
/// layer drives it with `submit_answer` and `advance` and reads state back
/// after each transition.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    current: usize,
    answers: BTreeMap<usize, AnswerRecord>,
    state: SessionState,
}

impl AnswerRecord {
    pub fn submitted(&self) -> &str {
        &self.submitted
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}

impl QuizSession {
    pub fn new(questions: Vec<Question>) -> Result<Self, ConfigError> {
        if questions.is_empty() {
            return Err(ConfigError::EmptyQuiz);
        }
        Ok(Self {
            questions,
            current: 0,
            answers: BTreeMap::new(),
            state: SessionState::AwaitingAnswer,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// The question the session is currently on; `None` once completed.
    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::Completed => None,
            _ => self.questions.get(self.current),
        }
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn progress(&self) -> (usize, usize) {
        (self.current, self.questions.len())
    }

    pub fn score(&self) -> Score {
        Score {
            correct: self.answers.values().filter(|a| a.is_correct).count(),
            graded: self.answers.len(),
        }
    }

    /// Grades `raw` against the current question and records the result.
    /// Submitting again before `advance` regrades the same question and
    /// replaces the previous record.
    pub fn submit_answer(&mut self, raw: &str) -> Result<AnswerRecord, SessionError> {
        if self.state == SessionState::Completed {
            return Err(SessionError::InvalidTransition {
                op: "submit_answer",
                state: self.state,
            });
        }
        let submitted = raw.trim();
        if submitted.is_empty() {
            return Err(SessionError::EmptyAnswer);
        }

        let record = AnswerRecord {
            submitted: submitted.to_owned(),
            is_correct: grade(&self.questions[self.current], submitted),
        };
        self.answers.insert(self.current, record.clone());
        self.state = SessionState::ShowingResult;
        Ok(record)
    }

    pub fn advance(&mut self) -> Result<SessionState, SessionError> {
        if self.state != SessionState::ShowingResult {
            return Err(SessionError::InvalidTransition {
                op: "advance",
                state: self.state,
            });
        }
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.state = SessionState::AwaitingAnswer;
        } else {
            self.state = SessionState::Completed;
        }
        Ok(self.state)
    }
}

/// Numeric answers compare as parsed reals with exact equality, text answers
/// as trimmed case-insensitive strings. Unparseable numeric input is simply
/// wrong, never an error.
fn grade(question: &Question, submitted: &str) -> bool {
    match question.kind() {
        AnswerKind::Numeric => match (submitted.parse::<f64>(), question.expected_number()) {
            (Ok(given), Some(expected)) => given == expected,
            _ => false,
        },
        AnswerKind::Text => {
            let expected = question.correct_answer().to_string();
            submitted.to_lowercase() == expected.trim().to_lowercase()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(prompt: &str, answer: &str) -> Question {
        serde_json::from_str(&format!(
            r#"{{"type":"math","questionType":"numeric","question":"{prompt}","correctAnswer":{answer},"explanation":"because"}}"#
        ))
        .unwrap()
    }

    fn text(prompt: &str, answer: &str) -> Question {
        serde_json::from_str(&format!(
            r#"{{"type":"grammar","questionType":"text","question":"{prompt}","correctAnswer":"{answer}","explanation":"because"}}"#
        ))
        .unwrap()
    }

    fn five_question_session() -> QuizSession {
        QuizSession::new(vec![
            numeric("1+1?", "2"),
            numeric("2+2?", "4"),
            text("Capital of France?", "Paris"),
            text("Opposite of hot?", "cold"),
            numeric("3+3?", "6"),
        ])
        .unwrap()
    }

    #[test]
    fn empty_question_list_is_rejected() {
        assert!(matches!(
            QuizSession::new(vec![]),
            Err(ConfigError::EmptyQuiz)
        ));
    }

    #[test]
    fn numeric_grading_is_exact() {
        let mut session = QuizSession::new(vec![numeric("Half of 25?", "12.5")]).unwrap();
        assert!(session.submit_answer("12.5").unwrap().is_correct());

        let mut session = QuizSession::new(vec![numeric("Half of 25?", "12.5")]).unwrap();
        assert!(!session.submit_answer("12.4999").unwrap().is_correct());
    }

    #[test]
    fn numeric_answer_as_wire_string_still_grades() {
        let mut session = QuizSession::new(vec![numeric("1+1?", "\"2\"")]).unwrap();
        assert!(session.submit_answer(" 2 ").unwrap().is_correct());
    }

    #[test]
    fn unparseable_numeric_input_is_wrong_not_an_error() {
        let mut session = QuizSession::new(vec![numeric("1+1?", "2")]).unwrap();
        let record = session.submit_answer("two").unwrap();
        assert!(!record.is_correct());
        assert_eq!(session.state(), SessionState::ShowingResult);
    }

    #[test]
    fn text_grading_trims_and_ignores_case() {
        let mut session = QuizSession::new(vec![text("Capital of France?", "Paris")]).unwrap();
        assert!(session.submit_answer("paris ").unwrap().is_correct());
    }

    #[test]
    fn blank_answers_leave_the_state_untouched() {
        let mut session = five_question_session();
        assert!(matches!(
            session.submit_answer(""),
            Err(SessionError::EmptyAnswer)
        ));
        assert!(matches!(
            session.submit_answer("   "),
            Err(SessionError::EmptyAnswer)
        ));
        assert_eq!(session.state(), SessionState::AwaitingAnswer);
        assert_eq!(session.progress(), (0, 5));
        assert_eq!(session.score().graded, 0);
    }

    #[test]
    fn resubmitting_overwrites_the_record() {
        let mut session = QuizSession::new(vec![numeric("1+1?", "2"), numeric("2+2?", "4")])
            .unwrap();
        assert!(!session.submit_answer("3").unwrap().is_correct());
        assert!(session.submit_answer("2").unwrap().is_correct());
        assert_eq!(session.score(), Score { correct: 1, graded: 1 });
        assert_eq!(session.progress(), (0, 2));
    }

    #[test]
    fn advance_past_the_last_question_completes() {
        let mut session = QuizSession::new(vec![numeric("1+1?", "2")]).unwrap();
        session.submit_answer("2").unwrap();
        assert_eq!(session.advance().unwrap(), SessionState::Completed);
        assert!(session.current_question().is_none());
        assert!(matches!(
            session.submit_answer("2"),
            Err(SessionError::InvalidTransition { op: "submit_answer", .. })
        ));
        assert!(matches!(
            session.advance(),
            Err(SessionError::InvalidTransition { op: "advance", .. })
        ));
        assert!(session.is_completed());
    }

    #[test]
    fn advance_while_awaiting_an_answer_is_a_contract_violation() {
        let mut session = five_question_session();
        assert!(matches!(
            session.advance(),
            Err(SessionError::InvalidTransition { op: "advance", .. })
        ));
        assert_eq!(session.state(), SessionState::AwaitingAnswer);
    }

    #[test]
    fn score_counts_graded_not_total() {
        let mut session = five_question_session();
        session.submit_answer("2").unwrap(); // correct
        session.advance().unwrap();
        session.submit_answer("5").unwrap(); // wrong
        session.advance().unwrap();
        session.submit_answer("PARIS").unwrap(); // correct
        assert_eq!(session.score(), Score { correct: 2, graded: 3 });
        assert_eq!(session.total(), 5);
    }

    #[test]
    fn full_walkthrough() {
        let mut session =
            QuizSession::new(vec![numeric("1+1?", "12"), text("Capital?", "Paris")]).unwrap();
        assert_eq!(session.progress(), (0, 2));
        assert!(session.submit_answer("12").unwrap().is_correct());
        assert_eq!(session.advance().unwrap(), SessionState::AwaitingAnswer);
        assert_eq!(session.progress(), (1, 2));
        assert!(!session.submit_answer("London").unwrap().is_correct());
        assert_eq!(session.advance().unwrap(), SessionState::Completed);
        assert_eq!(session.score(), Score { correct: 1, graded: 2 });
    }
}
