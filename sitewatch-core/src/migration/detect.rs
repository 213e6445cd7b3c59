//! Read-only classification of what is on disk.

use std::fs;

use crate::cache::legacy_db::LEGACY_TABLE;
use crate::cache::list_tables;
use crate::config::WatchPaths;
use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaState {
    /// The canonical cache file still uses the single-snapshot schema.
    Legacy,
    /// A previous run moved the legacy file aside and did not finish.
    Interrupted,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Detection {
    pub legacy_urls: bool,
    pub cache_schema: Option<SchemaState>,
    pub cache_dir: bool,
}

impl Detection {
    pub fn is_current(&self) -> bool {
        !self.legacy_urls && self.cache_schema.is_none() && !self.cache_dir
    }
}

pub fn detect(paths: &WatchPaths) -> Result<Detection> {
    Ok(Detection {
        legacy_urls: legacy_urls(paths),
        cache_schema: cache_schema(paths)?,
        cache_dir: legacy_cache_dir(paths),
    })
}

/// `urls.txt` exists and `urls.yaml` does not.
pub fn legacy_urls(paths: &WatchPaths) -> bool {
    paths.legacy_urls().is_file() && !paths.urls.is_file()
}

pub fn cache_schema(paths: &WatchPaths) -> Result<Option<SchemaState>> {
    if paths.cache.is_file() {
        let tables = list_tables(&paths.cache)?;
        if tables.iter().any(|t| t == LEGACY_TABLE) {
            return Ok(Some(SchemaState::Legacy));
        }
    }
    if paths.cache_old().is_file() {
        return Ok(Some(SchemaState::Interrupted));
    }
    Ok(None)
}

/// The legacy `cache/` directory needs importing.
///
/// On case-insensitive filesystems the legacy directory can resolve to the
/// directory that holds the canonical cache file. It is never treated as
/// legacy in that case.
pub fn legacy_cache_dir(paths: &WatchPaths) -> bool {
    let dir = paths.legacy_cache_dir();
    if !dir.is_dir() {
        return false;
    }
    if let Some(name) = paths.cache.file_name() {
        if dir.join(name).is_file() {
            return false;
        }
    }
    if let Some(parent) = paths.cache.parent() {
        if let (Ok(a), Ok(b)) = (fs::canonicalize(&dir), fs::canonicalize(parent)) {
            if a == b {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;
