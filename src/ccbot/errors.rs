use std::sync::Arc;

use futures_util::future::BoxFuture;
use teloxide::error_handlers::ErrorHandler;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::html;

/// Keeps the report under Telegram's message limit once escaped and wrapped.
const MAX_REPORT_CHARS: usize = 3000;

/// Dispatcher-wide error handler: logs the failure and forwards it to the administrator chat.
pub struct AdminReporter {
    bot: Bot,
    admin_chat: ChatId,
}

impl AdminReporter {
    pub fn new(bot: Bot, admin_chat: ChatId) -> Self {
        Self { bot, admin_chat }
    }
}

impl ErrorHandler<anyhow::Error> for AdminReporter {
    fn handle_error(self: Arc<Self>, error: anyhow::Error) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            log::error!("Exception while handling an update: {error:?}");

            if let Err(why) = self.bot
                .send_message(self.admin_chat, format_report(&error))
                .parse_mode(ParseMode::Html)
                .await
            {
                log::error!("Could not report the error to the admin chat: {why:?}");
            }
        })
    }
}

/// The error chain (and backtrace, if one was captured) in a `<pre>` block.
pub fn format_report(error: &anyhow::Error) -> String {
    let details = format!("{error:?}");
    let details = if details.chars().count() > MAX_REPORT_CHARS {
        let head: String = details.chars().take(MAX_REPORT_CHARS).collect();
        format!("{head}\n[truncated]")
    } else {
        details
    };

    format!(
        "An exception was raised while handling an update\n<pre>{}</pre>",
        html::escape(&details)
    )
}
