use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Result, WatchError};

/// Move `from` to `to` with a single `rename(2)`.
///
/// Observers see either the old layout or the new one. Cross-device moves
/// fail instead of degrading to copy + delete.
pub fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    tracing::debug!(from = %from.display(), to = %to.display(), "atomic rename");
    fs::rename(from, to).map_err(|source| WatchError::RenameFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// Write `bytes` to a temp file next to `path`, then persist it over `path`.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| WatchError::RenameFailed {
        from: e.file.path().to_path_buf(),
        to: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
