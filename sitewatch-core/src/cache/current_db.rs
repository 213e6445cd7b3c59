use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::legacy_db::LEGACY_TABLE;
use super::{CacheBackend, CacheStore, Entries, close_conn, table_names};
use crate::codec::{self, CodecId};
use crate::domain::CacheEntry;
use crate::error::{Result, WatchError};

pub const SNAPSHOT_TABLE: &str = "CacheSnapshot";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS CacheSnapshot (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      guid TEXT NOT NULL,
      timestamp REAL NOT NULL,
      codec INTEGER NOT NULL,
      data BLOB NOT NULL,
      tries INTEGER NOT NULL DEFAULT 0,
      etag TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_snapshot_guid ON CacheSnapshot(guid, timestamp);
"#;

const SELECT_SNAPSHOT: &str = "SELECT guid, timestamp, codec, data, tries, etag FROM CacheSnapshot";

/// Live cache: every fetch appends a snapshot, `clean`/`gc` trim history.
pub struct CurrentDbCache {
    conn: Connection,
    path: PathBuf,
    min_gain: f32,
}

/// Result of a `gc` pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Jobs no longer in the job list whose snapshots were removed.
    pub dropped_guids: usize,
    /// Old snapshots removed from jobs that are still listed.
    pub trimmed: usize,
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<(String, f64, u8, Vec<u8>, i64, Option<String>)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode_snapshot(
    (guid, timestamp, codec, data, tries, etag): (String, f64, u8, Vec<u8>, i64, Option<String>),
) -> Result<CacheEntry> {
    Ok(CacheEntry {
        guid,
        data: codec::decode(CodecId::from_u8(codec)?, &data)?,
        timestamp,
        tries,
        etag,
    })
}

impl CurrentDbCache {
    /// Open or create the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| WatchError::corrupt(path, e))?;
        let tables = table_names(&conn).map_err(|e| WatchError::corrupt(path, e))?;
        if tables.iter().any(|t| t == LEGACY_TABLE) {
            return Err(WatchError::corrupt(
                path,
                format!("{LEGACY_TABLE} table found, the cache needs migrating first"),
            ));
        }
        conn.execute_batch(SCHEMA)
            .map_err(|e| WatchError::corrupt(path, e))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            min_gain: 0.05,
        })
    }

    pub fn with_min_gain(mut self, min_gain: f32) -> Self {
        self.min_gain = min_gain;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Newest snapshot for `guid`.
    pub fn load(&self, guid: &str) -> Result<Option<CacheEntry>> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_SNAPSHOT} WHERE guid = ?1 ORDER BY timestamp DESC, id DESC LIMIT 1"),
                params![guid],
                snapshot_from_row,
            )
            .optional()?;
        raw.map(decode_snapshot).transpose()
    }

    /// Up to `count` snapshots for `guid`, newest first.
    pub fn history(&self, guid: &str, count: usize) -> Result<Vec<CacheEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_SNAPSHOT} WHERE guid = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![guid, count as i64], snapshot_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_snapshot).collect()
    }

    pub fn save(&self, entry: &CacheEntry) -> Result<()> {
        insert_snapshot(&self.conn, entry, self.min_gain)
    }

    /// Distinct guids in first-stored order.
    pub fn guids(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT guid FROM CacheSnapshot GROUP BY guid ORDER BY MIN(id)")?;
        let guids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(guids)
    }

    pub fn snapshot_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM CacheSnapshot", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn delete(&self, guid: &str) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM CacheSnapshot WHERE guid = ?1", params![guid])?)
    }

    /// Keep only the newest `keep` snapshots of `guid`.
    pub fn clean(&self, guid: &str, keep: usize) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM CacheSnapshot WHERE guid = ?1 AND id NOT IN (
               SELECT id FROM CacheSnapshot WHERE guid = ?1
               ORDER BY timestamp DESC, id DESC LIMIT ?2)",
            params![guid, keep as i64],
        )?)
    }

    /// Drop jobs not in `keep_guids`, trim the rest to `retain` snapshots.
    pub fn gc(&mut self, keep_guids: &HashSet<String>, retain: usize) -> Result<GcStats> {
        let guids = self.guids()?;
        let tx = self.conn.transaction()?;
        let mut stats = GcStats::default();
        for guid in guids {
            if keep_guids.contains(&guid) {
                stats.trimmed += tx.execute(
                    "DELETE FROM CacheSnapshot WHERE guid = ?1 AND id NOT IN (
                       SELECT id FROM CacheSnapshot WHERE guid = ?1
                       ORDER BY timestamp DESC, id DESC LIMIT ?2)",
                    params![guid, retain.max(1) as i64],
                )?;
            } else {
                tx.execute("DELETE FROM CacheSnapshot WHERE guid = ?1", params![guid])?;
                stats.dropped_guids += 1;
            }
        }
        tx.commit()?;
        tracing::info!(
            dropped = stats.dropped_guids,
            trimmed = stats.trimmed,
            "cache garbage collected"
        );
        Ok(stats)
    }

    pub fn close(self) -> Result<()> {
        close_conn(self.conn, &self.path)
    }

    fn load_by_id(&self, id: i64) -> Result<Option<CacheEntry>> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_SNAPSHOT} WHERE id = ?1"),
                params![id],
                snapshot_from_row,
            )
            .optional()?;
        raw.map(decode_snapshot).transpose()
    }
}

fn insert_snapshot(conn: &Connection, entry: &CacheEntry, min_gain: f32) -> Result<()> {
    let (codec, bytes) = codec::encode(&entry.data, min_gain)?;
    conn.execute(
        "INSERT INTO CacheSnapshot (guid, timestamp, codec, data, tries, etag)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.guid,
            entry.timestamp,
            codec as u8,
            bytes,
            entry.tries,
            entry.etag
        ],
    )?;
    Ok(())
}

/// True if a snapshot with the same guid, timestamp and content is stored.
fn already_stored(conn: &Connection, entry: &CacheEntry) -> Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT guid, timestamp, codec, data, tries, etag FROM CacheSnapshot
         WHERE guid = ?1 AND timestamp = ?2",
    )?;
    let rows = stmt
        .query_map(params![entry.guid, entry.timestamp], snapshot_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for raw in rows {
        if decode_snapshot(raw)?.data == entry.data {
            return Ok(true);
        }
    }
    Ok(false)
}

impl CacheStore for CurrentDbCache {
    fn backend(&self) -> CacheBackend {
        CacheBackend::CurrentDb
    }

    /// Every snapshot, oldest insert first.
    fn backup(&self) -> Result<Entries<'_>> {
        let mut stmt = self.conn.prepare("SELECT id FROM CacheSnapshot ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Box::new(
            ids.into_iter()
                .filter_map(move |id| self.load_by_id(id).transpose()),
        ))
    }

    /// All-or-nothing import in one transaction. Snapshots already present
    /// are skipped, so replaying an interrupted import adds nothing twice.
    fn restore(&mut self, entries: Entries<'_>) -> Result<usize> {
        let min_gain = self.min_gain;
        let tx = self.conn.transaction()?;
        let mut inserted = 0usize;
        let mut skipped = 0usize;
        for entry in entries {
            let entry = entry?;
            if already_stored(&tx, &entry)? {
                skipped += 1;
                continue;
            }
            insert_snapshot(&tx, &entry, min_gain)?;
            inserted += 1;
        }
        tx.commit()?;
        tracing::debug!(
            path = %self.path.display(),
            inserted,
            skipped,
            "cache restore committed"
        );
        Ok(inserted)
    }

    fn close(self: Box<Self>) -> Result<()> {
        CurrentDbCache::close(*self)
    }
}

#[cfg(test)]
#[path = "current_db_tests.rs"]
mod tests;
