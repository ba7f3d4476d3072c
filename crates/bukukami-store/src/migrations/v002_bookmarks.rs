use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS bookmarks (
    id          TEXT PRIMARY KEY NOT NULL,   -- story id
    name        TEXT NOT NULL,
    description TEXT NOT NULL,
    photo_url   TEXT NOT NULL
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
