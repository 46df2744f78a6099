use anyhow::Context;
use itertools::Itertools;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, ParseMode};

use crate::ccbot::{self, BotState, HandlerResult};
use crate::ccdb;
use crate::models::{self, LEADERBOARD_LIMIT};

const NOT_DETERMINED: &str = "Not determined yet.";

pub async fn start(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    log::info!("/start from {}", msg.chat.id);

    if let Some(from) = msg.from.as_ref() {
        let user = models::User {
            chat_id: ccbot::sender_id(&msg),
            username: from.username.clone(),
            full_name: from.full_name(),
            solved_challenges: Vec::new(),
            points: 0,
        };
        ccdb::users::insert_user(&state.db, &user).with_context(|| ccbot::describe(&msg))?;
    }

    bot.send_message(msg.chat.id, get_welcome()).await?;
    Ok(())
}

pub async fn help(bot: Bot, msg: Message) -> HandlerResult {
    log::info!("/help from {}", msg.chat.id);
    bot.send_message(msg.chat.id, get_help()).await?;
    Ok(())
}

pub async fn today(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    log::info!("/today from {}", msg.chat.id);

    match state.active.current().await {
        Some(challenge) => {
            bot.send_message(msg.chat.id, challenge.to_string())
                .parse_mode(ParseMode::Html)
                .await?;
        }
        None => {
            bot.send_message(msg.chat.id, "Challenge not found.").await?;
        }
    }

    Ok(())
}

/// The administrator gets the stored solution back; everyone else is pointed at the channel.
pub async fn solution(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    log::info!("/solution from {}", msg.chat.id);

    if !state.config.is_admin(ccbot::sender_id(&msg)) {
        bot.send_message(
            msg.chat.id,
            format!("The solution to this challenge is published in the {} telegram channel.",
                    state.config.solution_channel),
        )
        .await?;
        return Ok(());
    }

    let solution = state.active.current().await.map(|c| c.solution).unwrap_or_default();

    match solution {
        models::ChallengeSolution { photo_id: Some(photo_id), .. } => {
            bot.send_photo(msg.chat.id, InputFile::file_id(FileId(photo_id))).await?;
        }
        models::ChallengeSolution { text: Some(text), .. } => {
            bot.send_message(msg.chat.id, text).parse_mode(ParseMode::Html).await?;
        }
        _ => {
            bot.send_message(msg.chat.id, "No solution found.").await?;
        }
    }

    Ok(())
}

pub async fn top(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    log::info!("/top from {}", msg.chat.id);

    let users = ccdb::users::query_top_users(&state.db, LEADERBOARD_LIMIT)
        .with_context(|| ccbot::describe(&msg))?;
    let text = format_global_leaderboard(&users).unwrap_or_else(|| String::from(NOT_DETERMINED));

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn today_top(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    log::info!("/today_top from {}", msg.chat.id);

    let Some(challenge) = state.active.current().await else {
        bot.send_message(msg.chat.id, "No challenge found for today.").await?;
        return Ok(());
    };

    let fastest = ccdb::solvers::query_fastest(&state.db, challenge.id, LEADERBOARD_LIMIT)
        .with_context(|| ccbot::describe(&msg))?;
    let shortest = ccdb::solvers::query_shortest(&state.db, challenge.id, LEADERBOARD_LIMIT)
        .with_context(|| ccbot::describe(&msg))?;
    let text = format_challenge_leaderboard(&fastest, &shortest)
        .unwrap_or_else(|| String::from(NOT_DETERMINED));

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// `None` when nobody has a point yet.
pub fn format_global_leaderboard(users: &[models::User]) -> Option<String> {
    if users.is_empty() {
        return None;
    }

    Some(users.iter().enumerate().map(|(i, user)| format!("{}. {user}", i + 1)).join("\n"))
}

/// Speed ranking, then length ranking. `None` when the challenge has no solvers yet.
pub fn format_challenge_leaderboard(
    fastest: &[models::SolverRecord],
    shortest: &[models::SolverRecord],
) -> Option<String> {
    let mut sections = Vec::new();

    if !fastest.is_empty() {
        sections.push(format!(
            "Speed:\n{}",
            fastest.iter().enumerate()
                .map(|(i, solver)| format!("{}. {} - {}s", i + 1, solver.display_name, solver.result))
                .join("\n")
        ));
    }

    if !shortest.is_empty() {
        sections.push(format!(
            "Length:\n{}",
            shortest.iter().enumerate()
                .map(|(i, solver)| format!("{}. {} - {} chars", i + 1, solver.display_name, solver.code_length))
                .join("\n")
        ));
    }

    (!sections.is_empty()).then(|| sections.join("\n\n---\n\n"))
}

pub fn get_welcome() -> String {
    String::from(
r#"Welcome to the code checker bot!

Send /today to see today's challenge.
Send /help for help using the bot.

You can send your code as text or as a .py file."#)
}

/// Gets a help string. Should be updated after a new command is added
pub fn get_help() -> String {
    String::from(
r#"You can send your code as text or as a .py file.

/today: show today's challenge.
/top: show the all-time leaderboard.
/today_top: show the leaderboard for today's challenge."#)
}
