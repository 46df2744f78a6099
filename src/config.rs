use anyhow::{Context, Result};

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "code_checker.db";
const DEFAULT_GRADING_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SOLUTION_CHANNEL: &str = "@yangibaevs";

/// Settings read from the environment (and `.env`, if present) at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,

    /// The only chat allowed to author challenges. Errors are reported here too.
    pub admin_chat_id: i64,

    pub glot_url: String,
    pub glot_authorization: String,
    pub grading_timeout: Duration,

    pub db_path: PathBuf,

    /// Where solutions get published; named in the reply to non-admin `/solution`.
    pub solution_channel: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, so tests don't have to touch the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).with_context(|| format!("Expected '{key}=<value>' in .env in project root."))
        };

        let admin_chat_id = required("DEVELOPER_CHAT_ID")?
            .trim()
            .parse()
            .context("DEVELOPER_CHAT_ID must be a numeric chat id.")?;

        let grading_timeout = match lookup("GRADING_TIMEOUT_SECS") {
            Some(secs) => secs.trim().parse().context("GRADING_TIMEOUT_SECS must be a whole number of seconds.")?,
            None => DEFAULT_GRADING_TIMEOUT_SECS,
        };

        Ok(Self {
            telegram_token: required("TELEGRAM_TOKEN")?,
            admin_chat_id,
            glot_url: required("GLOT_URL")?,
            glot_authorization: required("GLOT_AUTHORIZATION")?,
            grading_timeout: Duration::from_secs(grading_timeout),
            db_path: lookup("DB_PATH").map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from),
            solution_channel: lookup("SOLUTION_CHANNEL").unwrap_or_else(|| String::from(DEFAULT_SOLUTION_CHANNEL)),
        })
    }

    pub fn is_admin(&self, chat_id: i64) -> bool {
        chat_id == self.admin_chat_id
    }
}
