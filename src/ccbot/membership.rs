use anyhow::Context;
use itertools::Itertools;
use teloxide::prelude::*;
use teloxide::types::{Chat, ChatMemberUpdated, Me};

use crate::ccbot::{self, BotState, HandlerResult};
use crate::ccdb;
use crate::models::{ChatKind, TrackedChat};

/// `Some(is_member)` when membership flipped, `None` when it didn't.
pub fn membership_change(was_member: bool, is_member: bool) -> Option<bool> {
    (was_member != is_member).then_some(is_member)
}

pub fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::User
    } else if chat.is_group() || chat.is_supergroup() {
        ChatKind::Group
    } else {
        ChatKind::Channel
    }
}

/// Keeps the `chats` table in sync with the chats the bot was added to or removed from.
pub async fn track_chats(update: ChatMemberUpdated, state: BotState) -> HandlerResult {
    let was_member = update.old_chat_member.kind.is_present();
    let is_member = update.new_chat_member.kind.is_present();

    let Some(is_member) = membership_change(was_member, is_member) else {
        return Ok(());
    };

    let cause = update.from.full_name();
    let kind = chat_kind(&update.chat);
    let title = update.chat.title().map(String::from);
    let chat_id = update.chat.id.0;

    if is_member {
        log::info!("{cause} added the bot to {} {} ({})", kind.as_str(), chat_id, title.as_deref().unwrap_or("-"));
        ccdb::chats::insert_chat(&state.db, &TrackedChat { chat_id, kind, title })
            .with_context(|| format!("Failed tracking chat {chat_id} after {cause} added the bot"))?;
    } else {
        log::info!("{cause} removed the bot from {} {} ({})", kind.as_str(), chat_id, title.as_deref().unwrap_or("-"));
        ccdb::chats::remove_chat(&state.db, chat_id)
            .with_context(|| format!("Failed untracking chat {chat_id} after {cause} removed the bot"))?;
    }

    Ok(())
}

pub async fn show_chats(bot: Bot, msg: Message, me: Me, state: BotState) -> HandlerResult {
    if !state.config.is_admin(ccbot::sender_id(&msg)) {
        bot.send_message(msg.chat.id, "Sorry, I do not know this command").await?;
        return Ok(());
    }

    let chats = |kind| ccdb::chats::query_chats(&state.db, kind).with_context(|| ccbot::describe(&msg));
    let users = chats(ChatKind::User)?;
    let groups = chats(ChatKind::Group)?;
    let channels = chats(ChatKind::Channel)?;

    bot.send_message(msg.chat.id, format_chats(me.username(), &users, &groups, &channels)).await?;
    Ok(())
}

pub fn format_chats(bot_name: &str, users: &[TrackedChat], groups: &[TrackedChat], channels: &[TrackedChat]) -> String {
    let ids = |chats: &[TrackedChat]| chats.iter().map(|chat| chat.chat_id).join(", ");

    format!(
        "@{bot_name} is currently in a conversation with the user IDs {}. \
         Moreover it is a member of the groups with IDs {} \
         and administrator in the channels with IDs {}.",
        ids(users), ids(groups), ids(channels)
    )
}
