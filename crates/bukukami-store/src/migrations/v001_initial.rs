//! v001 -- Initial schema creation.
//!
//! Creates the three original collections: `subscriptions`, `stories` and
//! `pending_stories`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Push subscriptions
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS subscriptions (
    endpoint TEXT PRIMARY KEY NOT NULL,   -- push service endpoint URL
    p256dh   TEXT NOT NULL,               -- base64url client public key
    auth     TEXT NOT NULL                -- base64url auth secret
);

-- ----------------------------------------------------------------
-- Cached stories (read model of GET /stories)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS stories (
    id          TEXT PRIMARY KEY NOT NULL,
    name        TEXT NOT NULL,
    description TEXT NOT NULL,
    photo_url   TEXT NOT NULL,
    created_at  TEXT NOT NULL,            -- as sent by the server
    lat         REAL,
    lon         REAL
);

-- ----------------------------------------------------------------
-- Pending story submissions (outbox)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS pending_stories (
    temp_id     INTEGER PRIMARY KEY AUTOINCREMENT,  -- never reused
    description TEXT NOT NULL,
    photo       BLOB NOT NULL,
    photo_name  TEXT NOT NULL,
    photo_type  TEXT NOT NULL,
    lat         REAL,
    lon         REAL,
    created_at  TEXT NOT NULL             -- RFC-3339
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
