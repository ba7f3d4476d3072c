use rusqlite::Connection;

const UP_SQL: &str = r#"
-- Named response caches of the background worker
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_name  TEXT NOT NULL,            -- cache generation, e.g. pwa-api-cache-v1
    request_key TEXT NOT NULL,            -- "METHOD URL"
    status      INTEGER NOT NULL,
    headers     TEXT NOT NULL,            -- JSON array of [name, value]
    body        BLOB NOT NULL,
    stored_at   TEXT NOT NULL,            -- RFC-3339

    PRIMARY KEY (cache_name, request_key)
);

-- Small durable key/value hints (subscribed flag, access token)
CREATE TABLE IF NOT EXISTS flags (
    key   TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
