use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::html;

use crate::ccbot::{self, BotState, HandlerResult};
use crate::ccdb;
use crate::models::{self, SolverRecord};

/// Separator unittest prints between per-test chatter and the summary.
pub const DIVIDER: &str = "----------------------------------------------------------------------";
const DIVIDER_REPLACEMENT: &str = "---";
const PASSING_SUFFIX: &str = "OK\n";

/// Telegram caps messages at 4096 characters; leave room for markup.
const MAX_OUTPUT_CHARS: usize = 3500;

static ELAPSED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.\d+").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([^>]+)>").unwrap());

/// Who sent a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Submitter {
    pub chat_id: i64,
    pub display_name: String,
}

impl Submitter {
    pub fn from_message(msg: &Message) -> Self {
        match msg.from.as_ref() {
            Some(user) => Self {
                chat_id: ccbot::sender_id(msg),
                display_name: models::display_name(user.username.as_deref(), &user.full_name()),
            },
            None => Self {
                chat_id: ccbot::sender_id(msg),
                display_name: msg.chat.title().unwrap_or("anonymous").to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Tests failed or the code didn't run.
    Failed,
    /// Passing run by the administrator; never counted.
    AdminRun,
    /// Passing run whose report had no elapsed time in it, so there is nothing to rank.
    Untimed,
    Solved { result: f64, first_solve: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// The grading report with the unittest preamble cut off.
    pub output: String,
    pub outcome: Outcome,
}

impl Verdict {
    pub fn solved(&self) -> bool {
        matches!(self.outcome, Outcome::Solved { .. })
    }

    /// The report as an HTML `<code>` block.
    pub fn render(&self) -> String {
        render_output(&self.output)
    }
}

/// Cuts everything before the divider and shortens the divider itself.
/// Output without a divider is returned unchanged.
pub fn trim_divider(output: &str) -> String {
    match output.find(DIVIDER) {
        Some(start) => output[start..].replace(DIVIDER, DIVIDER_REPLACEMENT),
        None => output.to_string(),
    }
}

pub fn is_passing(output: &str) -> bool {
    output.ends_with(PASSING_SUFFIX)
}

/// First decimal number in the report: unittest's "Ran N tests in X.XXXs".
pub fn parse_elapsed(output: &str) -> Option<f64> {
    ELAPSED_RE.find(output)?.as_str().parse().ok()
}

/// `<module>` becomes `module`, so tracebacks can't inject markup.
pub fn strip_tags(output: &str) -> String {
    TAG_RE.replace_all(output, "$1").into_owned()
}

pub fn render_output(output: &str) -> String {
    let stripped = strip_tags(output);

    let text = if stripped.trim().is_empty() {
        String::from("(no output)")
    } else if stripped.chars().count() > MAX_OUTPUT_CHARS {
        let head: String = stripped.chars().take(MAX_OUTPUT_CHARS).collect();
        format!("{head}\n…")
    } else {
        stripped
    };

    format!("<code>{}</code>", html::escape(&text))
}

/// Grades `code` against the active challenge and records the solve if it passed.
///
/// Returns `None` when there's no active challenge to grade against.
pub async fn process_submission(
    state: &BotState,
    submitter: &Submitter,
    code: &str,
) -> Result<Option<Verdict>> {
    let Some(challenge) = state.active.current().await.filter(|c| c.accepts_submissions()) else {
        log::debug!("[process_submission] No active challenge, ignoring code from {}", submitter.chat_id);
        return Ok(None);
    };

    if code.trim().is_empty() {
        return Ok(None);
    }

    log::info!("[process_submission] Received code from {} for challenge {}", submitter.chat_id, challenge.id);
    log::debug!("[process_submission] code:\n{code}");

    let report = state.glot.run(&challenge.tests, code).await?;
    let output = trim_divider(&report);

    let outcome = if !is_passing(&output) {
        Outcome::Failed
    } else if state.config.is_admin(submitter.chat_id) {
        Outcome::AdminRun
    } else if let Some(result) = parse_elapsed(&output) {
        let record = SolverRecord {
            challenge_id: challenge.id,
            chat_id: submitter.chat_id,
            display_name: submitter.display_name.clone(),
            result,
            solution: code.to_string(),
            code_length: code.chars().count(),
        };

        let first_solve = ccdb::solvers::record_solve(&state.db, &record)
            .context("Could not record the solve.")?;

        log::info!(
            "[process_submission] {} solved challenge {} in {result}s{}",
            submitter.display_name,
            challenge.id,
            if first_solve { " for the first time" } else { "" }
        );

        Outcome::Solved { result, first_solve }
    } else {
        log::warn!("[process_submission] Passing report without an elapsed time, not recording it:\n{output}");
        Outcome::Untimed
    };

    Ok(Some(Verdict { output, outcome }))
}

/// Plain text or `.py` uploads that aren't commands.
pub async fn handle(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    let Some(code) = ccbot::read_source(&bot, &msg).await.with_context(|| ccbot::describe(&msg))? else {
        return Ok(());
    };

    let submitter = Submitter::from_message(&msg);
    let Some(verdict) = process_submission(&state, &submitter, &code)
        .await
        .with_context(|| ccbot::describe(&msg))?
    else {
        return Ok(());
    };

    if verdict.solved() {
        bot.send_message(msg.chat.id, "✅").await?;
    }

    bot.send_message(msg.chat.id, verdict.render())
        .parse_mode(ParseMode::Html)
        .await?;

    Ok(())
}
