//! SQL schema for the Leaflet SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- Only the SHA-256 digest of a secret is ever stored.
CREATE TABLE IF NOT EXISTS api_tokens (
    token_id     TEXT PRIMARY KEY,
    owner_id     TEXT NOT NULL REFERENCES users(user_id),
    label        TEXT NOT NULL,
    digest       TEXT NOT NULL UNIQUE,
    revoked      INTEGER NOT NULL DEFAULT 0,
    last_used_at TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

-- Shares are soft-deleted; every read filters on deleted_at IS NULL.
CREATE TABLE IF NOT EXISTS shares (
    share_id         TEXT PRIMARY KEY,
    owner_id         TEXT NOT NULL,
    document_id      TEXT NOT NULL,
    title            TEXT NOT NULL,
    body             TEXT NOT NULL,
    references_json  TEXT NOT NULL DEFAULT '[]',
    parent_share_id  TEXT,
    require_password INTEGER NOT NULL DEFAULT 0,
    password_hash    TEXT,           -- NULL unless require_password = 1
    is_public        INTEGER NOT NULL DEFAULT 0,
    view_count       INTEGER NOT NULL DEFAULT 0,
    expires_at       TEXT NOT NULL,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    deleted_at       TEXT
);

CREATE INDEX IF NOT EXISTS tokens_owner_idx   ON api_tokens(owner_id);
CREATE INDEX IF NOT EXISTS shares_owner_idx   ON shares(owner_id, created_at);
CREATE INDEX IF NOT EXISTS shares_doc_idx     ON shares(owner_id, document_id);
CREATE INDEX IF NOT EXISTS shares_deleted_idx ON shares(deleted_at);

PRAGMA user_version = 1;
";
