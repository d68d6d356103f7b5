use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use teloxide::dispatching::dialogue::{self, InMemStorage};
use teloxide::dispatching::{DpHandlerDescription, UpdateHandler};
use teloxide::error_handlers::IgnoringErrorHandlerSafe;
use teloxide::prelude::*;
use teloxide::types::ReplyMarkup;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::{instrument, level_filters};
use tracing_subscriber::fmt::format::FmtSpan;
use url::Url;

use learnquizbot::commands::{cancel, help, start, Command};
use learnquizbot::generator::OpenAiClient;
use learnquizbot::state::QuizState;
use learnquizbot::{runner, setup, HandlerResult, UserDialogue};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

#[tokio::main]
async fn main() {
    dotenv().ok();
    let rust_log = std::env::var("LOG_LEVEL").unwrap_or("info".into());
    tracing_subscriber::fmt()
        .with_max_level(level_filters::LevelFilter::from_level(
            rust_log.parse().expect("LOG_LEVEL can't be parsed."),
        ))
        .json()
        .with_span_events(FmtSpan::ENTER)
        .log_internal_errors(true)
        .with_ansi(true)
        .with_line_number(true)
        .with_target(false)
        .init();

    let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY should be set.");
    let base_url = std::env::var("OPENAI_BASE_URL")
        .unwrap_or_else(|_| DEFAULT_BASE_URL.into())
        .parse::<Url>()
        .expect("OPENAI_BASE_URL can't be parsed.");
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    let client = Arc::new(OpenAiClient::new(base_url, api_key, model));

    let teloxide_token = std::env::var("TELOXIDE_TOKEN").expect("TELOXIDE_TOKEN should be set.");
    let bot = Bot::new(teloxide_token);
    log::info!("Starting bot...");

    let ngrok_url = std::env::var("NGROK_URL").map(|d| d.parse::<Url>().unwrap()).ok();
    let ngrok_addr = std::env::var("NGROK_ADDR")
        .map(|d| d.parse::<SocketAddr>().expect("NGROK_ADDR can't be parsed."))
        .ok();

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![InMemStorage::<QuizState>::new(), client])
        .enable_ctrlc_handler()
        .build();

    if let (Some(ngrok_url), Some(ngrok_addr)) = (ngrok_url, ngrok_addr) {
        let listener = webhooks::axum(bot, Options::new(ngrok_addr, ngrok_url))
            .await
            .expect("Failed to build a listener.");
        dispatcher
            .dispatch_with_listener(listener, Arc::new(IgnoringErrorHandlerSafe))
            .await
    } else {
        dispatcher.dispatch().await
    }
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(help))
        .branch(case![Command::Start].endpoint(start))
        .branch(case![Command::Cancel].endpoint(cancel));

    let handler = Update::filter_message()
        .branch(command_handler)
        .branch(case![QuizState::Start].endpoint(choose_what_to_do))
        .branch(setup_scheme())
        .branch(running_scheme())
        .endpoint(invalid_state);

    dialogue::enter::<Update, InMemStorage<QuizState>, QuizState, _>().branch(handler)
}

async fn choose_what_to_do(bot: Bot, msg: Message, dialogue: UserDialogue) -> HandlerResult {
    match msg.text() {
        Some("New quiz📝") => {
            log::info!("chat {} starts building a quiz", msg.chat.id);
            bot.send_message(
                msg.chat.id,
                "Let's build a quiz! Pick a theme: 🚀 Space, 🌊 Ocean, 🦁 Animals...",
            )
            .reply_markup(ReplyMarkup::kb_remove())
            .await?;
            dialogue.update(QuizState::ReceiveTheme).await?;
        }
        other => {
            log::info!("invalid message {:?} in chat {}", other, msg.chat.id);
            bot.send_message(msg.chat.id, "Invalid input. Please try again.")
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "debug")]
fn setup_scheme() -> Handler<
    'static,
    DependencyMap,
    Result<(), Box<(dyn Error + Send + Sync + 'static)>>,
    DpHandlerDescription,
> {
    use dptree::case;
    log::debug!("Building a dispatch tree for setup");
    Update::filter_message()
        .branch(case![QuizState::ReceiveTheme].endpoint(setup::receive_theme))
        .branch(case![QuizState::ReceiveMathCount { theme }].endpoint(setup::receive_math_count))
        .branch(
            case![QuizState::ReceiveGrammarCount { theme, math_count }]
                .endpoint(setup::receive_grammar_count),
        )
        .branch(
            case![QuizState::ReceiveTier {
                theme,
                math_count,
                grammar_count
            }]
            .endpoint(setup::receive_tier::<OpenAiClient>),
        )
        .branch(case![QuizState::Generating].endpoint(setup::still_generating))
}

#[instrument(level = "debug")]
fn running_scheme() -> Handler<
    'static,
    DependencyMap,
    Result<(), Box<(dyn Error + Send + Sync + 'static)>>,
    DpHandlerDescription,
> {
    use dptree::case;
    log::debug!("Building a dispatch tree for runner");
    Update::filter_message()
        .branch(case![QuizState::AwaitingAnswer { session }].endpoint(runner::take_answer))
        .branch(case![QuizState::ShowingResult { session }].endpoint(runner::next_question))
}

#[instrument(level = "info")]
async fn invalid_state(bot: Bot, msg: Message) -> HandlerResult {
    log::info!("chat {}: invalid input '{:?}'", msg.chat.id, msg.text());
    bot.send_message(
        msg.chat.id,
        "Unable to handle the message. Enter /help to see usages.",
    )
    .await?;
    Ok(())
}
