//! Generic keyed-collection operations.
//!
//! Every collection supports exactly insert-or-replace, get, get-all,
//! delete-by-key and clear. Each mutating call runs in its own transaction,
//! so concurrent readers observe either the state before or after the call.

use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::database::Database;
use crate::error::{Result, StoreError};

/// The logical collections of the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Subscriptions,
    Stories,
    PendingStories,
    Bookmarks,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Subscriptions => "subscriptions",
            Collection::Stories => "stories",
            Collection::PendingStories => "pending_stories",
            Collection::Bookmarks => "bookmarks",
        }
    }

    pub fn key_column(&self) -> &'static str {
        match self {
            Collection::Subscriptions => "endpoint",
            Collection::Stories | Collection::Bookmarks => "id",
            Collection::PendingStories => "temp_id",
        }
    }
}

/// A record type stored in one [`Collection`].
pub trait Record: Sized {
    type Key: ToSql;

    const COLLECTION: Collection;

    /// Insert or replace the whole record and return its key.
    fn upsert(&self, conn: &Connection) -> rusqlite::Result<Self::Key>;

    /// Decode a record from a `SELECT *` row.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

impl Database {
    /// Insert or replace a record.
    pub fn put<R: Record>(&self, record: &R) -> Result<R::Key> {
        let tx = self.conn().unchecked_transaction()?;
        let key = record.upsert(&tx)?;
        tx.commit()?;
        Ok(key)
    }

    /// Insert or replace several records in a single transaction.
    pub fn put_all<R: Record>(&self, records: &[R]) -> Result<Vec<R::Key>> {
        let tx = self.conn().unchecked_transaction()?;
        let mut keys = Vec::with_capacity(records.len());
        for record in records {
            keys.push(record.upsert(&tx)?);
        }
        tx.commit()?;
        Ok(keys)
    }

    /// All records of a collection, in key order.
    pub fn get_all<R: Record>(&self) -> Result<Vec<R>> {
        let collection = R::COLLECTION;
        let sql = format!(
            "SELECT * FROM {} ORDER BY {} ASC",
            collection.table(),
            collection.key_column()
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], R::from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn get<R: Record>(&self, key: &R::Key) -> Result<Option<R>> {
        let collection = R::COLLECTION;
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1",
            collection.table(),
            collection.key_column()
        );
        Ok(self
            .conn()
            .query_row(&sql, params![key], R::from_row)
            .optional()?)
    }

    /// Delete by key. Deleting an absent key is not an error; the return
    /// value tells whether a record was removed.
    pub fn delete<R: Record>(&self, key: &R::Key) -> Result<bool> {
        let collection = R::COLLECTION;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            collection.table(),
            collection.key_column()
        );
        let tx = self.conn().unchecked_transaction()?;
        let affected = tx.execute(&sql, params![key])?;
        tx.commit()?;
        Ok(affected > 0)
    }

    /// Remove every record of a collection, returning how many were removed.
    pub fn clear<R: Record>(&self) -> Result<usize> {
        let sql = format!("DELETE FROM {}", R::COLLECTION.table());
        let tx = self.conn().unchecked_transaction()?;
        let affected = tx.execute(&sql, [])?;
        tx.commit()?;
        Ok(affected)
    }

    pub fn count<R: Record>(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", R::COLLECTION.table());
        let count: i64 = self.conn().query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
