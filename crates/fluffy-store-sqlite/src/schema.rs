//! SQL schema for the Fluffy SQLite store.
//!
//! Handle uniqueness lives on `users.handle_lower` and visit de-duplication on
//! the `UNIQUE (target, session_id)` pairs; the store treats violations of
//! either as expected outcomes. Links, visits and login sessions cascade with
//! their user.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id        TEXT PRIMARY KEY,   -- identity provider id
    name           TEXT NOT NULL,
    handle         TEXT NOT NULL,
    handle_lower   TEXT NOT NULL,
    bio            TEXT NOT NULL DEFAULT '',
    theme          TEXT NOT NULL DEFAULT 'pastel',
    theme_json     TEXT NOT NULL DEFAULT '',
    banner_url     TEXT NOT NULL DEFAULT '',
    image          TEXT NOT NULL DEFAULT '',
    provider_image TEXT NOT NULL DEFAULT '',
    is_public      INTEGER NOT NULL DEFAULT 1,
    profile_tag    TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (handle_lower)
);

-- `ord` is deliberately not UNIQUE per user; density is restored by reindexing.
CREATE TABLE IF NOT EXISTS links (
    link_id    TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    platform   TEXT NOT NULL,
    title      TEXT NOT NULL,
    url        TEXT NOT NULL,
    subtitle   TEXT NOT NULL DEFAULT '',
    icon       TEXT NOT NULL,
    enabled    INTEGER NOT NULL DEFAULT 1,
    ord        INTEGER NOT NULL CHECK (ord >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- One counted click per (link, session).
CREATE TABLE IF NOT EXISTS link_visits (
    link_id    TEXT NOT NULL REFERENCES links(link_id) ON DELETE CASCADE,
    session_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (link_id, session_id)
);

-- One counted profile view per (user, session).
CREATE TABLE IF NOT EXISTS profile_visits (
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    session_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, session_id)
);

-- Append-only. No foreign keys: entries outlive the users they mention.
CREATE TABLE IF NOT EXISTS logs (
    log_id         TEXT PRIMARY KEY,
    kind           TEXT NOT NULL,
    message        TEXT NOT NULL,
    actor_user_id  TEXT,
    target_user_id TEXT,
    ip             TEXT NOT NULL DEFAULT '',
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,       -- SHA-256 of the bearer token
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS links_user_idx    ON links(user_id, ord);
CREATE INDEX IF NOT EXISTS sessions_user_idx ON sessions(user_id);

PRAGMA user_version = 1;
";
