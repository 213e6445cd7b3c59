//! Builders for legacy on-disk layouts.

use std::fs;
use std::path::Path;

use rusqlite::{Connection, params};

use crate::domain::CacheEntry;

/// Create a single-snapshot `CacheEntry` database holding `entries`.
pub fn write_legacy_db(path: &Path, entries: &[CacheEntry]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE CacheEntry (
           id INTEGER PRIMARY KEY,
           guid TEXT,
           timestamp INTEGER,
           data TEXT,
           tries INTEGER,
           etag TEXT
         );",
    )
    .unwrap();
    for e in entries {
        conn.execute(
            "INSERT INTO CacheEntry (guid, timestamp, data, tries, etag) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![e.guid, e.timestamp, e.data, e.tries, e.etag],
        )
        .unwrap();
    }
    conn.close().unwrap();
}

/// Create a `cache/` directory with one file per entry.
pub fn write_cache_dir(dir: &Path, entries: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (guid, data) in entries {
        fs::write(dir.join(guid), data).unwrap();
    }
}

pub fn sample_entries(n: usize) -> Vec<CacheEntry> {
    (0..n)
        .map(|i| CacheEntry {
            guid: format!("guid-{i}"),
            data: format!("<html>page {i}</html>"),
            timestamp: 1_500_000_000.0 + i as f64,
            tries: i as i64 % 2,
            etag: (i % 2 == 0).then(|| format!("\"etag-{i}\"")),
        })
        .collect()
}
