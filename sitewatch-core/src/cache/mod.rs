//! Cache storage backends.
//!
//! Three on-disk layouts have existed over time. Each one is opened through
//! [`open_cache`] and exposes the same backup/restore capability, which is
//! how entries move between layouts that share no native format.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};

use crate::domain::CacheEntry;
use crate::error::{Result, WatchError};
use crate::util::atomic::atomic_rename;

pub mod current_db;
pub mod dir;
pub mod legacy_db;

pub use current_db::CurrentDbCache;
pub use dir::DirCache;
pub use legacy_db::LegacyDbCache;

/// Lazy, fallible sequence of cache entries.
pub type Entries<'a> = Box<dyn Iterator<Item = Result<CacheEntry>> + 'a>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheBackend {
    /// One file per job under a directory.
    Dir,
    /// SQLite, single-snapshot `CacheEntry` table.
    LegacyDb,
    /// SQLite, multi-snapshot `CacheSnapshot` table.
    CurrentDb,
}

pub trait CacheStore {
    fn backend(&self) -> CacheBackend;

    fn backup(&self) -> Result<Entries<'_>>;

    /// Import every entry of `entries`. Read-only backends refuse.
    fn restore(&mut self, _entries: Entries<'_>) -> Result<usize> {
        Err(WatchError::Unsupported("restore into a read-only cache backend"))
    }

    /// Release the backing file handles. Must happen before the backing
    /// path is renamed or removed.
    fn close(self: Box<Self>) -> Result<()>;
}

pub fn open_cache(backend: CacheBackend, path: &Path) -> Result<Box<dyn CacheStore>> {
    match backend {
        CacheBackend::Dir => Ok(Box::new(DirCache::open(path)?)),
        CacheBackend::LegacyDb => Ok(Box::new(LegacyDbCache::open(path)?)),
        CacheBackend::CurrentDb => Ok(Box::new(CurrentDbCache::open(path)?)),
    }
}

/// Names of all tables in the SQLite file at `path`.
///
/// Opens read-only, so a missing file is an error rather than a new
/// database, and nothing on disk changes.
pub fn list_tables(path: &Path) -> Result<Vec<String>> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| WatchError::corrupt(path, e))?;
    let tables = table_names(&conn).map_err(|e| WatchError::corrupt(path, e))?;
    conn.close().map_err(|(_, e)| WatchError::corrupt(path, e))?;
    Ok(tables)
}

pub(crate) fn table_names(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

pub(crate) fn close_conn(conn: Connection, path: &Path) -> Result<()> {
    conn.close().map_err(|(_, e)| {
        tracing::warn!(path = %path.display(), error = %e, "closing cache database failed");
        WatchError::Sqlite(e)
    })
}

const SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// `path` with a SQLite sidecar suffix appended to the file name.
fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    name.into()
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed stale file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Remove the journal sidecars of `path`, leaving the database itself.
/// A stale `-journal` next to a newly placed file would be replayed into it.
pub(crate) fn remove_db_sidecars(path: &Path) -> Result<()> {
    for suffix in SIDECAR_SUFFIXES {
        remove_if_present(&sidecar(path, suffix))?;
    }
    Ok(())
}

/// Remove a SQLite file together with its journal sidecars.
pub(crate) fn remove_db_files(path: &Path) -> Result<()> {
    remove_db_sidecars(path)?;
    remove_if_present(path)
}

/// Rename a SQLite file and whatever sidecars it has. Sidecars move
/// first, so an interruption never leaves them behind at `from`'s name
/// once the database itself has moved.
pub(crate) fn move_db_files(from: &Path, to: &Path) -> Result<()> {
    for suffix in SIDECAR_SUFFIXES {
        let src = sidecar(from, suffix);
        if src.exists() {
            atomic_rename(&src, &sidecar(to, suffix))?;
        }
    }
    atomic_rename(from, to)
}

#[cfg(test)]
#[path = "../cache_tests.rs"]
mod tests;
