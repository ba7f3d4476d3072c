//! Small durable key/value flags.

use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;

/// Set while a push subscription is believed to be active. Only a resume
/// hint; the platform subscription is authoritative.
pub const FLAG_SUBSCRIBED: &str = "subscribed";

/// Access token of the signed-in user.
pub const FLAG_ACCESS_TOKEN: &str = "access_token";

impl Database {
    pub fn set_flag(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO flags (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_flag(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT value FROM flags WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Returns whether the flag was present.
    pub fn remove_flag(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM flags WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_set_overwrite_remove() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        assert_eq!(db.get_flag(FLAG_SUBSCRIBED).unwrap(), None);
        db.set_flag(FLAG_SUBSCRIBED, "true").unwrap();
        db.set_flag(FLAG_ACCESS_TOKEN, "abc").unwrap();
        db.set_flag(FLAG_ACCESS_TOKEN, "def").unwrap();

        assert_eq!(db.get_flag(FLAG_SUBSCRIBED).unwrap().as_deref(), Some("true"));
        assert_eq!(db.get_flag(FLAG_ACCESS_TOKEN).unwrap().as_deref(), Some("def"));

        assert!(db.remove_flag(FLAG_SUBSCRIBED).unwrap());
        assert!(!db.remove_flag(FLAG_SUBSCRIBED).unwrap());
        assert_eq!(db.get_flag(FLAG_SUBSCRIBED).unwrap(), None);
    }

    #[test]
    fn flags_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        Database::open_at(&path)
            .unwrap()
            .set_flag(FLAG_SUBSCRIBED, "true")
            .unwrap();

        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.get_flag(FLAG_SUBSCRIBED).unwrap().as_deref(), Some("true"));
    }
}
