use bukukami_shared::types::Story;
use rusqlite::{params, Connection, Row};

use crate::collection::{Collection, Record};
use crate::database::Database;
use crate::error::Result;

impl Record for Story {
    type Key = String;

    const COLLECTION: Collection = Collection::Stories;

    fn upsert(&self, conn: &Connection) -> rusqlite::Result<String> {
        conn.execute(
            "INSERT OR REPLACE INTO stories (id, name, description, photo_url, created_at, lat, lon)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                self.id,
                self.name,
                self.description,
                self.photo_url,
                self.created_at,
                self.lat,
                self.lon,
            ],
        )?;
        Ok(self.id.clone())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Story {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            photo_url: row.get("photo_url")?,
            created_at: row.get("created_at")?,
            lat: row.get("lat")?,
            lon: row.get("lon")?,
        })
    }
}

impl Database {
    /// Merge a fetched page into the story cache in one transaction.
    pub fn save_stories(&self, stories: &[Story]) -> Result<usize> {
        let keys = self.put_all(stories)?;
        tracing::debug!(count = keys.len(), "cached stories");
        Ok(keys.len())
    }

    pub fn cached_stories(&self) -> Result<Vec<Story>> {
        self.get_all()
    }

    pub fn clear_stories(&self) -> Result<usize> {
        self.clear::<Story>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(id: &str, description: &str) -> Story {
        Story {
            id: id.into(),
            name: "Ana".into(),
            description: description.into(),
            photo_url: format!("https://example.com/{id}.png"),
            created_at: "2024-05-01T10:00:00.000Z".into(),
            lat: Some(-6.2),
            lon: None,
        }
    }

    fn open() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn save_stories_upserts_wholesale() {
        let (db, _dir) = open();
        db.save_stories(&[story("a", "first"), story("b", "second")])
            .unwrap();
        db.save_stories(&[story("b", "edited"), story("c", "third")])
            .unwrap();

        let all = db.cached_stories().unwrap();
        let ids: Vec<_> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(all[1].description, "edited");
        assert_eq!(all[0].lat, Some(-6.2));
        assert_eq!(all[0].lon, None);
    }

    #[test]
    fn get_by_key_and_clear() {
        let (db, _dir) = open();
        db.put(&story("a", "first")).unwrap();

        let found: Option<Story> = db.get(&"a".to_string()).unwrap();
        assert_eq!(found.unwrap().description, "first");
        let missing: Option<Story> = db.get(&"zzz".to_string()).unwrap();
        assert!(missing.is_none());

        assert_eq!(db.clear_stories().unwrap(), 1);
        assert!(db.cached_stories().unwrap().is_empty());
    }
}
