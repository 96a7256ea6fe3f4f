//! SQL schema for the Perch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS cards (
    uid         TEXT PRIMARY KEY,
    name        TEXT,            -- NULL until personalised
    first_seen  TEXT NOT NULL
);

-- One row per station that has ever changed. Stations absent here are free.
CREATE TABLE IF NOT EXISTS stations (
    name            TEXT PRIMARY KEY,
    occupant        TEXT,        -- card uid; NULL when free
    since           TEXT,
    leave_time      TEXT,        -- HH:MM:SS; NULL without estimate
    leave_occupant  TEXT,
    leave_set_at    TEXT,
    CHECK (occupant IS NOT NULL OR leave_time IS NULL)
);

-- Appended only. Rows are removed by an administrative reset alone.
CREATE TABLE IF NOT EXISTS history (
    seq        INTEGER PRIMARY KEY,
    uid        TEXT NOT NULL,
    name       TEXT,
    station    TEXT NOT NULL,
    action     TEXT NOT NULL,   -- 'enter' | 'leave'
    timestamp  TEXT NOT NULL    -- RFC 3339 UTC
);

CREATE TABLE IF NOT EXISTS meta (
    key    TEXT PRIMARY KEY,
    value  TEXT NOT NULL
);

PRAGMA user_version = 1;
";
