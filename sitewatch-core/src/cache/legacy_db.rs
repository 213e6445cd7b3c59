use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use super::{CacheBackend, CacheStore, Entries, close_conn, table_names};
use crate::domain::CacheEntry;
use crate::error::{Result, WatchError};

/// Table name of the single-snapshot schema.
pub const LEGACY_TABLE: &str = "CacheEntry";

/// SQLite cache with one `CacheEntry` row per job. Opened read-only.
pub struct LegacyDbCache {
    conn: Connection,
    path: PathBuf,
}

impl LegacyDbCache {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| WatchError::corrupt(path, e))?;
        let tables = table_names(&conn).map_err(|e| WatchError::corrupt(path, e))?;
        if !tables.iter().any(|t| t == LEGACY_TABLE) {
            return Err(WatchError::corrupt(path, format!("no {LEGACY_TABLE} table")));
        }
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Distinct guids in first-seen order.
    pub fn guids(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT guid FROM CacheEntry WHERE guid IS NOT NULL GROUP BY guid ORDER BY MIN(rowid)")?;
        let guids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(guids)
    }

    /// Newest row for `guid`; older duplicates are ignored.
    pub fn load(&self, guid: &str) -> Result<Option<CacheEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT data, timestamp, tries, etag FROM CacheEntry
                 WHERE guid = ?1 ORDER BY timestamp DESC, tries DESC LIMIT 1",
                params![guid],
                |row| {
                    Ok(CacheEntry {
                        guid: guid.to_string(),
                        data: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        timestamp: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                        tries: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                        etag: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }
}

impl CacheStore for LegacyDbCache {
    fn backend(&self) -> CacheBackend {
        CacheBackend::LegacyDb
    }

    fn backup(&self) -> Result<Entries<'_>> {
        let guids = self.guids()?;
        Ok(Box::new(guids.into_iter().filter_map(move |guid| {
            self.load(&guid).transpose()
        })))
    }

    fn close(self: Box<Self>) -> Result<()> {
        let this = *self;
        close_conn(this.conn, &this.path)
    }
}
