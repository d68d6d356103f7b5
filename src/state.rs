use crate::session::QuizSession;

/// Dialogue state for one chat. Setup states collect the configuration piece
/// by piece; `Generating` parks the chat while the service call is
/// outstanding so a second request cannot be issued; the running states carry
/// the session itself.
#[derive(Debug, Clone, Default)]
pub enum QuizState {
    #[default]
    Start,

    // PART FOR --- CONFIGURING A QUIZ ---
    ReceiveTheme,
    ReceiveMathCount {
        theme: String,
    },
    ReceiveGrammarCount {
        theme: String,
        math_count: u8,
    },
    ReceiveTier {
        theme: String,
        math_count: u8,
        grammar_count: u8,
    },
    Generating,

    // PART FOR --- RUNNING A QUIZ ---
    AwaitingAnswer {
        session: QuizSession,
    },
    ShowingResult {
        session: QuizSession,
    },
}
