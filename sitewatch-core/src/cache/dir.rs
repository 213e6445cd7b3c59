use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use walkdir::WalkDir;

use super::{CacheBackend, CacheStore, Entries};
use crate::domain::CacheEntry;
use crate::error::{Result, WatchError};

/// Oldest layout: `cache/<guid>` holds the last fetched data, the file's
/// mtime is the fetch time. Read-only.
pub struct DirCache {
    root: PathBuf,
}

impl DirCache {
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(WatchError::corrupt(root, "not a cache directory"));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn read_entry(path: &Path, guid: String) -> Result<CacheEntry> {
    let data = String::from_utf8(fs::read(path)?)
        .map_err(|e| WatchError::corrupt(path, format!("cache file is not UTF-8: {e}")))?;
    let timestamp = fs::metadata(path)?
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Ok(CacheEntry::new(guid, data, timestamp))
}

impl CacheStore for DirCache {
    fn backend(&self) -> CacheBackend {
        CacheBackend::Dir
    }

    fn backup(&self) -> Result<Entries<'_>> {
        let walk = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter();
        let entries = walk.filter_map(|item| {
            let entry = match item {
                Ok(e) => e,
                Err(e) => return Some(Err(WatchError::Io(e.into()))),
            };
            if !entry.file_type().is_file() {
                return None;
            }
            let guid = entry.file_name().to_string_lossy().into_owned();
            if guid.starts_with('.') {
                return None;
            }
            Some(read_entry(entry.path(), guid))
        });
        Ok(Box::new(entries))
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
