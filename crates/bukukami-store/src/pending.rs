use bukukami_shared::types::{NewStory, Photo};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::collection::{Collection, Record};
use crate::database::Database;
use crate::error::Result;
use crate::models::PendingStory;

impl Record for PendingStory {
    type Key = i64;

    const COLLECTION: Collection = Collection::PendingStories;

    fn upsert(&self, conn: &Connection) -> rusqlite::Result<i64> {
        let created_at = self.created_at.to_rfc3339();
        match self.temp_id {
            Some(temp_id) => {
                conn.execute(
                    "INSERT OR REPLACE INTO pending_stories
                        (temp_id, description, photo, photo_name, photo_type, lat, lon, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        temp_id,
                        self.description,
                        self.photo.data.as_ref(),
                        self.photo.file_name,
                        self.photo.content_type,
                        self.lat,
                        self.lon,
                        created_at,
                    ],
                )?;
                Ok(temp_id)
            }
            None => {
                conn.execute(
                    "INSERT INTO pending_stories
                        (description, photo, photo_name, photo_type, lat, lon, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        self.description,
                        self.photo.data.as_ref(),
                        self.photo.file_name,
                        self.photo.content_type,
                        self.lat,
                        self.lon,
                        created_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            }
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let photo: Vec<u8> = row.get("photo")?;
        let created_str: String = row.get("created_at")?;
        let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    7,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(PendingStory {
            temp_id: Some(row.get("temp_id")?),
            description: row.get("description")?,
            photo: Photo {
                file_name: row.get("photo_name")?,
                content_type: row.get("photo_type")?,
                data: Bytes::from(photo),
            },
            lat: row.get("lat")?,
            lon: row.get("lon")?,
            created_at,
        })
    }
}

impl Database {
    /// Queue a submission and return its generated temp id.
    pub fn add_pending_story(&self, story: NewStory) -> Result<i64> {
        let temp_id = self.put(&PendingStory::new(story))?;
        tracing::info!(temp_id, "story queued for later submission");
        Ok(temp_id)
    }

    /// Pending submissions in insertion order.
    pub fn pending_stories(&self) -> Result<Vec<PendingStory>> {
        self.get_all()
    }

    pub fn remove_pending_story(&self, temp_id: i64) -> Result<bool> {
        self.delete::<PendingStory>(&temp_id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn new_story(description: &str) -> NewStory {
        NewStory {
            description: description.into(),
            photo: Photo::jpeg(vec![0xFF, 0xD8, 0xFF]),
            lat: Some(-7.25),
            lon: Some(112.75),
        }
    }

    fn open() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn temp_ids_follow_insertion_order() {
        let (db, _dir) = open();
        let a = db.add_pending_story(new_story("one")).unwrap();
        let b = db.add_pending_story(new_story("two")).unwrap();
        let c = db.add_pending_story(new_story("three")).unwrap();
        assert!(a < b && b < c);

        let pending = db.pending_stories().unwrap();
        let descriptions: Vec<_> = pending.iter().map(|p| p.description.as_str()).collect();
        assert_eq!(descriptions, vec!["one", "two", "three"]);
        assert_eq!(pending[0].photo.data.as_ref(), &[0xFF, 0xD8, 0xFF]);
        assert_eq!(pending[0].to_new_story(), new_story("one"));
    }

    #[test]
    fn temp_ids_are_not_reused_after_delete() {
        let (db, _dir) = open();
        let a = db.add_pending_story(new_story("one")).unwrap();
        assert!(db.remove_pending_story(a).unwrap());
        let b = db.add_pending_story(new_story("two")).unwrap();
        assert!(b > a);
    }

    #[test]
    fn deleting_twice_is_harmless() {
        let (db, _dir) = open();
        let a = db.add_pending_story(new_story("one")).unwrap();
        let b = db.add_pending_story(new_story("two")).unwrap();

        assert!(db.remove_pending_story(a).unwrap());
        assert!(!db.remove_pending_story(a).unwrap());

        let remaining: Vec<_> = db
            .pending_stories()
            .unwrap()
            .into_iter()
            .filter_map(|p| p.temp_id)
            .collect();
        assert_eq!(remaining, vec![b]);
    }

    #[test]
    fn get_all_reflects_puts_minus_deletes() {
        let (db, _dir) = open();
        let mut expected = BTreeSet::new();

        // Interleave inserts and deletes in an arbitrary but fixed pattern.
        for round in 0..12 {
            let id = db.add_pending_story(new_story(&format!("s{round}"))).unwrap();
            expected.insert(id);
            if round % 3 == 2 {
                let victim = *expected.iter().next().unwrap();
                db.remove_pending_story(victim).unwrap();
                expected.remove(&victim);
            }
            if round % 4 == 1 {
                // Delete of an already-absent key.
                db.remove_pending_story(-1).unwrap();
            }
        }

        let actual: BTreeSet<_> = db
            .pending_stories()
            .unwrap()
            .into_iter()
            .filter_map(|p| p.temp_id)
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn put_with_existing_key_replaces_whole_record() {
        let (db, _dir) = open();
        let id = db.add_pending_story(new_story("draft")).unwrap();

        let mut record: PendingStory = db.get(&id).unwrap().unwrap();
        record.description = "final".into();
        record.lat = None;
        assert_eq!(db.put(&record).unwrap(), id);

        let stored: PendingStory = db.get(&id).unwrap().unwrap();
        assert_eq!(stored.description, "final");
        assert_eq!(stored.lat, None);
        assert_eq!(db.count::<PendingStory>().unwrap(), 1);
    }
}
