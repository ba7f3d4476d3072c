//! Named response caches used by the background worker.
//!
//! A cache generation is every entry sharing one `cache_name`. Entries are
//! keyed by the request's method and full URL.

use bukukami_shared::http::HttpResponse;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::CachedResponse;

const SELECT_ENTRY: &str = "SELECT status, headers, body, stored_at FROM cache_entries";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<(u16, String, Vec<u8>, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode_entry(raw: (u16, String, Vec<u8>, String)) -> Result<CachedResponse> {
    let (status, headers, body, stored_at) = raw;
    let headers: Vec<(String, String)> = serde_json::from_str(&headers)?;
    let stored_at = DateTime::parse_from_rfc3339(&stored_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("cache timestamp: {e}")))?;
    Ok(CachedResponse {
        status,
        headers,
        body: Bytes::from(body),
        stored_at,
    })
}

impl Database {
    /// Store a response under `(cache_name, request_key)`, replacing any
    /// previous entry.
    pub fn cache_put(
        &self,
        cache_name: &str,
        request_key: &str,
        response: &HttpResponse,
    ) -> Result<()> {
        let entry = CachedResponse::from_response(response);
        let headers = serde_json::to_string(&entry.headers)?;
        let stored_at = entry.stored_at.to_rfc3339_opts(SecondsFormat::Micros, true);

        self.conn().execute(
            "INSERT INTO cache_entries (cache_name, request_key, status, headers, body, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(cache_name, request_key) DO UPDATE SET
                status = excluded.status,
                headers = excluded.headers,
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![
                cache_name,
                request_key,
                entry.status,
                headers,
                entry.body.as_ref(),
                stored_at,
            ],
        )?;
        tracing::trace!(cache = cache_name, key = request_key, "cache entry stored");
        Ok(())
    }

    /// Look up one entry in a specific cache generation.
    pub fn cache_match(&self, cache_name: &str, request_key: &str) -> Result<Option<CachedResponse>> {
        let sql = format!("{SELECT_ENTRY} WHERE cache_name = ?1 AND request_key = ?2");
        let raw = self
            .conn()
            .query_row(&sql, params![cache_name, request_key], entry_from_row)
            .optional()?;
        raw.map(decode_entry).transpose()
    }

    /// Look up an entry in any cache generation. The most recently stored
    /// entry wins.
    pub fn cache_match_any(&self, request_key: &str) -> Result<Option<CachedResponse>> {
        let sql = format!(
            "{SELECT_ENTRY} WHERE request_key = ?1 ORDER BY stored_at DESC, rowid DESC LIMIT 1"
        );
        let raw = self
            .conn()
            .query_row(&sql, params![request_key], entry_from_row)
            .optional()?;
        raw.map(decode_entry).transpose()
    }

    /// Names of every cache generation holding at least one entry.
    pub fn cache_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT DISTINCT cache_name FROM cache_entries ORDER BY cache_name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Delete a whole cache generation, returning the number of entries removed.
    pub fn cache_delete(&self, cache_name: &str) -> Result<usize> {
        let tx = self.conn().unchecked_transaction()?;
        let removed = tx.execute(
            "DELETE FROM cache_entries WHERE cache_name = ?1",
            params![cache_name],
        )?;
        tx.commit()?;
        Ok(removed)
    }
}
