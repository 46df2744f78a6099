use anyhow::Context;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::utils::render::RenderMessageTextHelper;

use crate::ccbot::{self, BotState, HandlerResult};
use crate::ccdb;
use crate::models::{ChallengeSolution, NewChallenge};

pub type ChallengeDialogue = Dialogue<State, InMemStorage<State>>;

/// Where a chat is in authoring a challenge. Everyone but the administrator stays `Idle`.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum State {
    #[default]
    Idle,
    AwaitingDescription,
    AwaitingSolution {
        description: String,
    },
    AwaitingTests {
        description: String,
        solution: ChallengeSolution,
    },
}

/// One message, reduced to what the dialogue cares about.
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    Text { plain: String, html: String },
    /// File id of the largest photo size.
    Photo(String),
    PythonFile(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Wrong kind of message for this state.
    Stay,
    Advance(State),
    Finish(NewChallenge),
}

/// The authoring state machine. Any well-formed input moves it forward.
pub fn advance(state: State, input: Input) -> Step {
    match (state, input) {
        (State::AwaitingDescription, Input::Text { html, .. }) => {
            Step::Advance(State::AwaitingSolution { description: html })
        }
        (State::AwaitingSolution { description }, Input::Photo(photo_id)) => {
            Step::Advance(State::AwaitingTests {
                description,
                solution: ChallengeSolution { photo_id: Some(photo_id), text: None },
            })
        }
        (State::AwaitingSolution { description }, Input::Text { html, .. }) => {
            Step::Advance(State::AwaitingTests {
                description,
                solution: ChallengeSolution { photo_id: None, text: Some(html) },
            })
        }
        (State::AwaitingTests { description, solution }, Input::Text { plain: tests, .. } | Input::PythonFile(tests)) => {
            Step::Finish(NewChallenge { description, solution, tests })
        }
        _ => Step::Stay,
    }
}

pub async fn start(bot: Bot, dialogue: ChallengeDialogue, msg: Message, state: BotState) -> HandlerResult {
    log::info!("/new_challenge from user: {}", msg.chat.id);

    if !state.config.is_admin(ccbot::sender_id(&msg)) {
        return Ok(());
    }

    bot.send_message(msg.chat.id, "Hello, Developer!\n\nSend description of new challenge").await?;
    dialogue.update(State::AwaitingDescription).await?;
    Ok(())
}

pub async fn cancel(bot: Bot, dialogue: ChallengeDialogue, msg: Message, state: BotState) -> HandlerResult {
    if !state.config.is_admin(ccbot::sender_id(&msg)) {
        return Ok(());
    }

    if dialogue.get_or_default().await? != State::Idle {
        dialogue.exit().await?;
        bot.send_message(msg.chat.id, "Challenge creation cancelled.").await?;
    }

    Ok(())
}

/// Any non-command message while the dialogue is past `Idle`.
pub async fn receive(
    bot: Bot,
    dialogue: ChallengeDialogue,
    msg: Message,
    current: State,
    state: BotState,
) -> HandlerResult {
    let Some(input) = read_input(&bot, &msg, &current).await.with_context(|| ccbot::describe(&msg))? else {
        log::debug!("[receive] Ignoring unexpected message in state {current:?}");
        return Ok(());
    };

    match advance(current, input) {
        Step::Stay => {
            log::debug!("[receive] Input doesn't fit the current state, waiting for another.");
        }
        Step::Advance(next) => {
            let prompt = match next {
                State::AwaitingSolution { .. } => "Send solution picture or text",
                _ => "Send test file",
            };
            log::info!("[receive] Challenge draft moved to {next:?}");
            dialogue.update(next).await?;
            bot.send_message(msg.chat.id, prompt).await?;
        }
        Step::Finish(challenge) => {
            log::info!("[receive] challenge tests:\n{}", challenge.tests);

            let created = ccdb::challenges::insert_challenge(&state.db, &challenge)
                .with_context(|| ccbot::describe(&msg))?;
            state.active
                .reload(&state.db)
                .await
                .with_context(|| format!("Could not reload after adding challenge {}", created.id))?;

            log::info!("added new challenge");
            dialogue.exit().await?;
            bot.send_message(msg.chat.id, "New challenge added").await?;
        }
    }

    Ok(())
}

/// Only downloads a document when the tests are what's being waited for.
async fn read_input(bot: &Bot, msg: &Message, current: &State) -> anyhow::Result<Option<Input>> {
    if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
        return Ok(Some(Input::Photo(largest.file.id.0.clone())));
    }

    if let Some(text) = msg.text() {
        return Ok(Some(Input::Text {
            plain: text.to_string(),
            html: msg.html_text().unwrap_or_else(|| text.to_string()),
        }));
    }

    match (current, msg.document()) {
        (State::AwaitingTests { .. }, Some(document)) if ccbot::is_python_file(document) => {
            let file = bot.get_file(document.file.id.clone()).await?;
            let mut contents = Vec::new();
            bot.download_file(&file.path, &mut contents).await?;
            Ok(Some(Input::PythonFile(String::from_utf8_lossy(&contents).into_owned())))
        }
        _ => Ok(None),
    }
}
