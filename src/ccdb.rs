use rusqlite::Connection;

use std::path::PathBuf;

pub mod challenges;
pub mod chats;
pub mod schema;
pub mod solvers;
pub mod users;

pub type DBResult<T> = rusqlite::Result<T>;

/// Handle to the bot's SQLite file. Every query opens its own connection.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn connect(&self) -> DBResult<Connection> {
        Connection::open(&self.path)
    }

    /// Creates every table that doesn't exist yet.
    pub fn initialize(&self) -> DBResult<()> {
        let connection = self.connect()?;

        for (table, schema) in [
            ("users", schema::USERS_SCHEMA),
            ("challenges", schema::CHALLENGES_SCHEMA),
            ("solvers", schema::SOLVERS_SCHEMA),
            ("chats", schema::CHATS_SCHEMA),
        ] {
            log::debug!("[initialize] creating {table} table...");
            connection.execute(schema, [])?;
        }

        Ok(())
    }
}

/// Turns a UNIQUE/PRIMARY KEY violation into `Ok(false)` so idempotent inserts can
/// report "already there" instead of failing.
pub(crate) fn swallow_constraint_violation(err: rusqlite::Error) -> DBResult<bool> {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            log::trace!("[swallow_constraint_violation] ignoring: {err}");
            Ok(false)
        }
        err => Err(err),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Database;
    use tempfile::TempDir;

    /// Fresh database in a temp dir. Keep the `TempDir` alive for the test's duration.
    pub fn database() -> (TempDir, Database) {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let db = Database::new(dir.path().join("test.db"));
        db.initialize().expect("failed to initialize database");
        (dir, db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_is_idempotent() {
        let (_dir, db) = testing::database();
        db.initialize().unwrap();

        let tables: Vec<String> = db
            .connect()
            .unwrap()
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<DBResult<_>>()
            .unwrap();

        assert_eq!(tables, ["challenges", "chats", "solvers", "users"]);
    }
}
