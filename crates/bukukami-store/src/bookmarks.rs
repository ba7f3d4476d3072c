use bukukami_shared::types::Bookmark;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::collection::{Collection, Record};
use crate::database::Database;
use crate::error::Result;

impl Record for Bookmark {
    type Key = String;

    const COLLECTION: Collection = Collection::Bookmarks;

    fn upsert(&self, conn: &Connection) -> rusqlite::Result<String> {
        conn.execute(
            "INSERT OR REPLACE INTO bookmarks (id, name, description, photo_url)
             VALUES (?1, ?2, ?3, ?4)",
            params![self.id, self.name, self.description, self.photo_url],
        )?;
        Ok(self.id.clone())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Bookmark {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            photo_url: row.get("photo_url")?,
        })
    }
}

impl Database {
    /// Save the bookmark if it is absent, remove it if present.
    ///
    /// Returns the new state: `true` when the story is now bookmarked.
    pub fn toggle_bookmark(&self, bookmark: &Bookmark) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;
        let exists = tx
            .query_row(
                "SELECT 1 FROM bookmarks WHERE id = ?1",
                params![bookmark.id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        if exists {
            tx.execute("DELETE FROM bookmarks WHERE id = ?1", params![bookmark.id])?;
        } else {
            bookmark.upsert(&tx)?;
        }
        tx.commit()?;

        tracing::debug!(id = %bookmark.id, saved = !exists, "bookmark toggled");
        Ok(!exists)
    }

    pub fn is_bookmarked(&self, id: &str) -> Result<bool> {
        Ok(self.get::<Bookmark>(&id.to_string())?.is_some())
    }

    pub fn bookmarks(&self) -> Result<Vec<Bookmark>> {
        self.get_all()
    }
}
