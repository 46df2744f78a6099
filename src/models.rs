use chrono::{DateTime, Utc};

/// How many rows any leaderboard shows.
pub const LEADERBOARD_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub chat_id: i64,
    pub username: Option<String>,
    pub full_name: String,

    pub solved_challenges: Vec<i64>,
    pub points: u32,
}

impl User {
    /// `@username` when the user has one, their full name otherwise.
    pub fn display_name(&self) -> String {
        display_name(self.username.as_deref(), &self.full_name)
    }
}

/// Shared by [`User`] and the submission path, which only has the raw Telegram fields.
pub fn display_name(username: Option<&str>, full_name: &str) -> String {
    match username {
        Some(username) if !username.is_empty() => format!("@{username}"),
        _ => full_name.to_string(),
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} points",
            self.display_name(), self.points
        )
    }
}

/// Reference solution attached to a challenge. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChallengeSolution {
    pub photo_id: Option<String>,
    pub text: Option<String>,
}

/// A challenge that has not been written to the database yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChallenge {
    pub description: String,
    pub solution: ChallengeSolution,
    pub tests: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub id: i64,
    pub description: String,
    pub solution: ChallengeSolution,
    pub tests: String,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    /// Only challenges with a test suite can grade anything.
    pub fn accepts_submissions(&self) -> bool {
        !self.tests.trim().is_empty()
    }
}

impl std::fmt::Display for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<b>Challenge #{}</b> ({})\n\n{}",
            self.id,
            self.created_at.format("%Y-%m-%d"),
            self.description
        )
    }
}

/// Latest passing run of one user for one challenge.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverRecord {
    pub challenge_id: i64,
    pub chat_id: i64,
    pub display_name: String,

    /// Elapsed time reported by the test runner, in seconds.
    pub result: f64,
    pub solution: String,
    pub code_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    User,
    Group,
    Channel,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::User => "user",
            ChatKind::Group => "group",
            ChatKind::Channel => "channel",
        }
    }
}

impl std::str::FromStr for ChatKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ChatKind::User),
            "group" => Ok(ChatKind::Group),
            "channel" => Ok(ChatKind::Channel),
            other => Err(anyhow::anyhow!("Unknown chat kind: {other}")),
        }
    }
}

/// A chat the bot is currently a member of.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedChat {
    pub chat_id: i64,
    pub kind: ChatKind,
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: Option<&str>) -> User {
        User {
            chat_id: 1,
            username: username.map(String::from),
            full_name: String::from("Ada Lovelace"),
            solved_challenges: vec![],
            points: 3,
        }
    }

    #[test]
    fn display_name_prefers_username() {
        assert_eq!(user(Some("ada")).display_name(), "@ada");
        assert_eq!(user(None).display_name(), "Ada Lovelace");
        assert_eq!(user(Some("")).display_name(), "Ada Lovelace");
    }

    #[test]
    fn user_display_shows_points() {
        assert_eq!(user(Some("ada")).to_string(), "@ada - 3 points");
    }

    #[test]
    fn chat_kind_round_trips_through_str() {
        for kind in [ChatKind::User, ChatKind::Group, ChatKind::Channel] {
            assert_eq!(kind.as_str().parse::<ChatKind>().unwrap(), kind);
        }
        assert!("supergroup".parse::<ChatKind>().is_err());
    }

    #[test]
    fn blank_tests_do_not_accept_submissions() {
        let challenge = Challenge {
            id: 1,
            description: String::from("Sum two numbers"),
            solution: ChallengeSolution::default(),
            tests: String::from("  \n"),
            created_at: Utc::now(),
        };
        assert!(!challenge.accepts_submissions());
    }
}
