use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::dispatching::dialogue::{self, InMemStorage};
use teloxide::dispatching::UpdateHandler;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::Document;
use teloxide::utils::command::BotCommands;

use crate::ccdb::Database;
use crate::config::Config;
use crate::glot::GlotClient;

pub mod active;
pub mod commands;
pub mod errors;
pub mod membership;
pub mod newchallenge;
pub mod submission;

use active::ActiveChallenge;
use newchallenge::State;

pub type HandlerResult = Result<()>;

/// Everything a handler needs besides the update itself.
#[derive(Clone)]
pub struct BotState {
    pub config: Arc<Config>,
    pub db: Database,
    pub glot: GlotClient,
    pub active: ActiveChallenge,
}

impl BotState {
    /// Opens (and if needed creates) the database and loads the newest challenge.
    pub fn new(config: Config) -> Result<Self> {
        let db = Database::new(&config.db_path);
        db.initialize().context("Could not initialize the database.")?;

        let active = ActiveChallenge::load(&db).context("Could not load the latest challenge.")?;
        let glot = GlotClient::new(&config.glot_url, &config.glot_authorization, config.grading_timeout)?;

        Ok(Self { config: Arc::new(config), db, glot, active })
    }
}

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case", description = "Commands:")]
pub enum Command {
    #[command(description = "register and get started")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
    #[command(description = "today's challenge")]
    Today,
    #[command(description = "solution of today's challenge")]
    Solution,
    #[command(description = "all-time leaderboard")]
    Top,
    #[command(description = "today's leaderboard")]
    TodayTop,
    #[command(description = "add a new challenge (admin)")]
    NewChallenge,
    #[command(description = "stop adding a challenge (admin)")]
    Cancel,
    #[command(description = "chats the bot is in (admin)")]
    ShowChats,
}

pub async fn run_bot(config: Config) -> Result<()> {
    let state = BotState::new(config)?;
    let bot = Bot::new(&state.config.telegram_token);

    if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
        log::warn!("Could not register bot commands: {err}");
    }

    let reporter = errors::AdminReporter::new(bot.clone(), ChatId(state.config.admin_chat_id));

    log::info!("Bot is connected and ready!");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state, InMemStorage::<State>::new()])
        .error_handler(Arc::new(reporter))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Routing: membership updates, then commands. A plain message feeds the chat's
/// challenge dialogue only when the administrator sent it; anything else is a submission.
pub fn schema() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(commands::start))
        .branch(case![Command::Help].endpoint(commands::help))
        .branch(case![Command::Today].endpoint(commands::today))
        .branch(case![Command::Solution].endpoint(commands::solution))
        .branch(case![Command::Top].endpoint(commands::top))
        .branch(case![Command::TodayTop].endpoint(commands::today_top))
        .branch(case![Command::NewChallenge].endpoint(newchallenge::start))
        .branch(case![Command::Cancel].endpoint(newchallenge::cancel))
        .branch(case![Command::ShowChats].endpoint(membership::show_chats));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(
            dptree::filter(|msg: Message| !is_command(&msg))
                .branch(
                    dptree::filter(|msg: Message, current: State, state: BotState| {
                        feeds_dialogue(&current, &state.config, &msg)
                    })
                    .endpoint(newchallenge::receive),
                )
                .branch(dptree::endpoint(submission::handle)),
        );

    dptree::entry()
        .branch(Update::filter_my_chat_member().endpoint(membership::track_chats))
        .branch(dialogue::enter::<Update, InMemStorage<State>, State, _>().branch(message_handler))
}

/// Dialogue state is kept per chat, so in a group only the administrator's own
/// messages may move a draft forward.
pub(crate) fn feeds_dialogue(current: &State, config: &Config, msg: &Message) -> bool {
    *current != State::Idle && config.is_admin(sender_id(msg))
}

/// Unknown `/commands` are still commands, never submissions.
fn is_command(msg: &Message) -> bool {
    msg.text().is_some_and(|text| text.starts_with('/'))
}

pub(crate) fn is_python_file(document: &Document) -> bool {
    document.file_name.as_deref().is_some_and(|name| name.ends_with(".py"))
        || document.mime_type.as_ref().is_some_and(|mime| mime.essence_str() == "text/x-python")
}

/// Identity of whoever sent `msg`: the user when known, the chat otherwise.
/// In private chats these are the same number.
pub(crate) fn sender_id(msg: &Message) -> i64 {
    msg.from
        .as_ref()
        .and_then(|user| i64::try_from(user.id.0).ok())
        .unwrap_or(msg.chat.id.0)
}

/// Message text, or the contents of an uploaded `.py` file. `None` for anything else.
pub(crate) async fn read_source(bot: &Bot, msg: &Message) -> Result<Option<String>> {
    if let Some(text) = msg.text() {
        return Ok(Some(text.to_string()));
    }

    let Some(document) = msg.document().filter(|document| is_python_file(document)) else {
        return Ok(None);
    };

    let file = bot.get_file(document.file.id.clone()).await?;
    let mut contents = Vec::new();
    bot.download_file(&file.path, &mut contents)
        .await
        .with_context(|| format!("Could not download {}", file.path))?;

    Ok(Some(String::from_utf8_lossy(&contents).into_owned()))
}

/// Context attached to handler errors so the admin report says where it happened.
pub(crate) fn describe(msg: &Message) -> String {
    let update = serde_json::to_string_pretty(msg).unwrap_or_else(|err| format!("<unserializable: {err}>"));
    format!(
        "Failed handling a message in chat {} from {}\nmessage = {update}",
        msg.chat.id,
        sender_id(msg)
    )
}
