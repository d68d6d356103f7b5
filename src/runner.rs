use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{ChatId, Message, ReplyMarkup},
    Bot,
};
use tracing::instrument;

use crate::{
    keyboard::{next_keyboard, play_again_keyboard},
    session::{QuizSession, SessionError, SessionState},
    state::QuizState,
    HandlerResult, UserDialogue,
};

pub(crate) async fn send_question(
    bot: &Bot,
    chat_id: ChatId,
    session: &QuizSession,
) -> HandlerResult {
    let (idx, total) = session.progress();
    if let Some(question) = session.current_question() {
        log::info!(
            "asking question #{} of {} in chat {}: '{}'",
            idx + 1,
            total,
            chat_id,
            question.prompt()
        );
        bot.send_message(
            chat_id,
            format!(
                "Question {} of {} — {}\n\n{}",
                idx + 1,
                total,
                question.category(),
                question
            ),
        )
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;
    }
    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, session))]
pub async fn take_answer(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    mut session: QuizSession,
) -> HandlerResult {
    let Some(raw) = msg.text() else {
        bot.send_message(msg.chat.id, "Please send your answer as a text message.")
            .await?;
        return Ok(());
    };

    match session.submit_answer(raw) {
        Ok(record) => {
            let (idx, total) = session.progress();
            let question = session
                .current_question()
                .expect("a just-graded session always has a current question");
            log::info!(
                "chat {} answered '{}' to question #{}. Correctness: {}",
                msg.chat.id,
                record.submitted(),
                idx + 1,
                record.is_correct()
            );

            let text = if record.is_correct() {
                format!("🌟 Brilliant! You got it right!\n\n{}", question.explanation())
            } else {
                let unit = question
                    .unit()
                    .map(|u| format!(" {}", u))
                    .unwrap_or_default();
                format!(
                    "💪 Keep going! You can do this!\n\nThe correct answer is: {}{}\n\n{}",
                    question.correct_answer(),
                    unit,
                    question.explanation()
                )
            };

            bot.send_message(msg.chat.id, text)
                .reply_markup(next_keyboard(idx + 1 == total))
                .await?;
            dialogue.update(QuizState::ShowingResult { session }).await?;
        }
        Err(SessionError::EmptyAnswer) => {
            bot.send_message(msg.chat.id, "Your answer is empty. Please type an answer.")
                .await?;
        }
        Err(e) => {
            log::error!("session contract violation in chat {}: {}", msg.chat.id, e);
            bot.send_message(msg.chat.id, "Something went wrong. Send /start to begin again.")
                .await?;
            dialogue.update(QuizState::Start).await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, session))]
pub async fn next_question(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    mut session: QuizSession,
) -> HandlerResult {
    match msg.text() {
        Some("Next➡️") | Some("Finish🎉") => match session.advance() {
            Ok(SessionState::Completed) => {
                let score = session.score();
                let total = session.total();
                log::info!(
                    "chat {} completed a quiz with score {}/{}",
                    msg.chat.id,
                    score.correct,
                    total
                );
                let mut text = format!(
                    "Adventure complete! 🎉 You scored {} out of {}.",
                    score.correct, total
                );
                if score.correct == total {
                    text.push_str("\n🌟 Perfect score! 🌟");
                }
                bot.send_message(msg.chat.id, text)
                    .reply_markup(play_again_keyboard())
                    .await?;
                dialogue.update(QuizState::Start).await?;
            }
            Ok(_) => {
                send_question(&bot, msg.chat.id, &session).await?;
                dialogue.update(QuizState::AwaitingAnswer { session }).await?;
            }
            Err(e) => {
                log::error!("session contract violation in chat {}: {}", msg.chat.id, e);
                bot.send_message(msg.chat.id, "Something went wrong. Send /start to begin again.")
                    .await?;
                dialogue.update(QuizState::Start).await?;
            }
        },
        _ => {
            let (idx, total) = session.progress();
            bot.send_message(msg.chat.id, "Please tap the button to continue.")
                .reply_markup(next_keyboard(idx + 1 == total))
                .await?;
        }
    }

    Ok(())
}
