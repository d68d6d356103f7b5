use std::sync::Arc;

use teloxide::types::ReplyMarkup;
use teloxide::{payloads::SendMessageSetters, prelude::Requester, types::Message, Bot};
use tracing::instrument;

use crate::generator::{GenerateError, GenerateQuiz};
use crate::keyboard::{count_keyboard, tier_keyboard};
use crate::quiz::{QuizConfig, Tier, ALLOWED_COUNTS};
use crate::runner::send_question;
use crate::session::QuizSession;
use crate::state::QuizState;
use crate::{HandlerResult, UserDialogue};

fn parse_count(text: &str) -> Option<u8> {
    text.split_whitespace()
        .next()?
        .parse()
        .ok()
        .filter(|count| ALLOWED_COUNTS.contains(count))
}

#[instrument(level = "info", skip(bot, dialogue))]
pub async fn receive_theme(bot: Bot, dialogue: UserDialogue, msg: Message) -> HandlerResult {
    match msg.text() {
        Some(theme) if !theme.trim().is_empty() => {
            log::info!("theme '{}' chosen in chat {}", theme.trim(), msg.chat.id);
            bot.send_message(msg.chat.id, "Great theme! How many math questions?")
                .reply_markup(count_keyboard())
                .await?;
            dialogue
                .update(QuizState::ReceiveMathCount {
                    theme: theme.trim().to_owned(),
                })
                .await?;
        }
        _ => {
            bot.send_message(
                msg.chat.id,
                "Please send a theme for the quiz: 🚀 Space, 🌊 Ocean, 🦁 Animals...",
            )
            .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue))]
pub async fn receive_math_count(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    theme: String,
) -> HandlerResult {
    match msg.text().and_then(parse_count) {
        Some(math_count) => {
            bot.send_message(msg.chat.id, "And how many grammar questions?")
                .reply_markup(count_keyboard())
                .await?;
            dialogue
                .update(QuizState::ReceiveGrammarCount { theme, math_count })
                .await?;
        }
        None => {
            log::info!("rejected math count input in chat {}", msg.chat.id);
            bot.send_message(msg.chat.id, "Please pick one of the offered counts.")
                .reply_markup(count_keyboard())
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue))]
pub async fn receive_grammar_count(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    (theme, math_count): (String, u8),
) -> HandlerResult {
    match msg.text().and_then(parse_count) {
        Some(grammar_count) => {
            bot.send_message(msg.chat.id, "Which level is the quiz for?")
                .reply_markup(tier_keyboard())
                .await?;
            dialogue
                .update(QuizState::ReceiveTier {
                    theme,
                    math_count,
                    grammar_count,
                })
                .await?;
        }
        None => {
            log::info!("rejected grammar count input in chat {}", msg.chat.id);
            bot.send_message(msg.chat.id, "Please pick one of the offered counts.")
                .reply_markup(count_keyboard())
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, client))]
pub async fn receive_tier<G: GenerateQuiz>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    (theme, math_count, grammar_count): (String, u8, u8),
    client: Arc<G>,
) -> HandlerResult {
    let tier = match msg
        .text()
        .map(|text| text.split_whitespace().next().unwrap_or(text))
        .map(str::parse::<Tier>)
    {
        Some(Ok(tier)) => tier,
        _ => {
            bot.send_message(msg.chat.id, "Please pick KS2 or KS3.")
                .reply_markup(tier_keyboard())
                .await?;
            return Ok(());
        }
    };

    let config = match QuizConfig::new(&theme, math_count, grammar_count, tier) {
        Ok(config) => config,
        Err(e) => {
            log::error!("configuration rejected in chat {}: {}", msg.chat.id, e);
            bot.send_message(msg.chat.id, format!("{}. Let's start over: what theme?", e))
                .await?;
            dialogue.update(QuizState::ReceiveTheme).await?;
            return Ok(());
        }
    };

    // Park the dialogue before the call so a second tap cannot trigger a
    // second billed request while this one is outstanding.
    dialogue.update(QuizState::Generating).await?;
    bot.send_message(
        msg.chat.id,
        format!("Creating your {} quiz... ✨", config.theme()),
    )
    .reply_markup(ReplyMarkup::kb_remove())
    .await?;

    match client.generate(&config).await {
        Ok(questions) => {
            log::info!(
                "generated {} questions for chat {} (requested {}+{})",
                questions.len(),
                msg.chat.id,
                math_count,
                grammar_count
            );
            match QuizSession::new(questions) {
                Ok(session) => {
                    bot.send_message(
                        msg.chat.id,
                        format!(
                            "Your {} quiz is ready: {} questions. Let's begin!",
                            config.theme(),
                            session.total()
                        ),
                    )
                    .await?;
                    send_question(&bot, msg.chat.id, &session).await?;
                    dialogue.update(QuizState::AwaitingAnswer { session }).await?;
                }
                Err(e) => {
                    log::error!("generation returned no usable quiz: {}", e);
                    bot.send_message(
                        msg.chat.id,
                        "The service sent back an empty quiz. Pick a tier to try again.",
                    )
                    .reply_markup(tier_keyboard())
                    .await?;
                    dialogue
                        .update(QuizState::ReceiveTier {
                            theme,
                            math_count,
                            grammar_count,
                        })
                        .await?;
                }
            }
        }
        Err(e) => {
            log::error!("quiz generation failed for chat {}: {}", msg.chat.id, e);
            let reason = match e {
                GenerateError::Unauthorized => "The quiz service rejected our credentials.",
                GenerateError::Unreachable(_) => "Couldn't reach the quiz service.",
                GenerateError::MalformedResponse(_) | GenerateError::InvalidQuestion { .. } => {
                    "The quiz service sent back something unusable."
                }
            };
            bot.send_message(
                msg.chat.id,
                format!("{} Pick a tier to try again.", reason),
            )
            .reply_markup(tier_keyboard())
            .await?;
            dialogue
                .update(QuizState::ReceiveTier {
                    theme,
                    math_count,
                    grammar_count,
                })
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot))]
pub async fn still_generating(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "Still working on your quiz, one moment... ✨")
        .await?;
    Ok(())
}
