use rusqlite::types::Type;

use crate::{ccdb::{DBResult, Database}, models};

/////*============== MEMBERSHIP QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::TrackedChat {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        let kind: String = row.get("kind")?;

        Ok(Self {
            chat_id: row.get("chat_id")?,
            kind: kind.parse().map_err(|err: anyhow::Error| {
                rusqlite::Error::FromSqlConversionFailure(
                    row.as_ref().column_index("kind").unwrap_or_default(),
                    Type::Text,
                    err.into(),
                )
            })?,
            title: row.get("title")?,
        })
    }
}

/// Remembers that the bot is a member of `chat`. Re-adding a chat refreshes its kind and title.
pub fn insert_chat(db: &Database, chat: &models::TrackedChat) -> DBResult<()> {
    let connection = db.connect()?;

    log::trace!("[insert_chat] Tracking {} chat {}", chat.kind.as_str(), chat.chat_id);

    connection
        .prepare(
            "INSERT OR REPLACE INTO chats ( chat_id,  kind,  title)
             VALUES                       (:chat_id, :kind, :title)",
        )?
        .execute(rusqlite::named_params! {
            ":chat_id": chat.chat_id,
            ":kind":    chat.kind.as_str(),
            ":title":   chat.title,
        })?;

    Ok(())
}

/// Forgets a chat. Returns `true` if it was being tracked.
pub fn remove_chat(db: &Database, chat_id: i64) -> DBResult<bool> {
    let connection = db.connect()?;

    log::trace!("[remove_chat] Untracking chat {chat_id}");

    let removed = connection
        .prepare("DELETE FROM chats WHERE chat_id = :chat_id")?
        .execute(rusqlite::named_params! { ":chat_id": chat_id })?;

    Ok(removed > 0)
}

/// All tracked chats of one kind, oldest chat id first.
pub fn query_chats(db: &Database, kind: models::ChatKind) -> DBResult<Vec<models::TrackedChat>> {
    let connection = db.connect()?;

    let mut stmt = connection.prepare("SELECT * FROM chats WHERE kind = :kind ORDER BY chat_id")?;
    let chats = stmt
        .query_map(rusqlite::named_params! { ":kind": kind.as_str() }, |row| {
            models::TrackedChat::try_from(row)
        })?
        .collect::<DBResult<Vec<models::TrackedChat>>>()?;

    Ok(chats)
}
