pub const USERS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS users (
        chat_id            INTEGER     PRIMARY KEY,
        username           TEXT,
        full_name          TEXT        NOT NULL,

        solved_challenges  TEXT        NOT NULL    DEFAULT '[]',
        points             INTEGER     NOT NULL    DEFAULT 0
    )";

pub const CHALLENGES_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS challenges (
        id                 INTEGER     PRIMARY KEY AUTOINCREMENT,
        description        TEXT        NOT NULL,
        solution_photo_id  TEXT,
        solution_text      TEXT,
        tests              TEXT        NOT NULL,
        created_at         TIMESTAMP   NOT NULL
    )";

pub const SOLVERS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS solvers (
        challenge_id   INTEGER     NOT NULL    REFERENCES challenges(id),
        chat_id        INTEGER     NOT NULL,
        display_name   TEXT        NOT NULL,

        result         REAL        NOT NULL,
        solution       TEXT        NOT NULL,
        code_length    INTEGER     NOT NULL,

        UNIQUE (challenge_id, chat_id)
    )";

pub const CHATS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS chats (
        chat_id        INTEGER     PRIMARY KEY,
        kind           TEXT        NOT NULL,
        title          TEXT
    )";
