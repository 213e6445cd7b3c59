//! First-run setup of the state directory.

use std::fs;
use std::io::Write;

use crate::config::{PKGNAME, Settings, WatchPaths};
use crate::error::{Result, WatchError};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bootstrap {
    pub created_state_dir: bool,
    pub wrote_default_config: bool,
}

/// Create the state directory and a default config if they are missing.
pub fn ensure_state(paths: &WatchPaths, console: &mut dyn Write) -> Result<Bootstrap> {
    let mut done = Bootstrap::default();
    if !paths.state_dir.is_dir() {
        fs::create_dir_all(&paths.state_dir)?;
        tracing::info!(dir = %paths.state_dir.display(), "created state directory");
        done.created_state_dir = true;
    }
    if !paths.config.exists() {
        if let Some(parent) = paths.config.parent() {
            fs::create_dir_all(parent)?;
        }
        Settings::write_default(&paths.config)?;
        writeln!(
            console,
            "A default config has been written to {}.\nEdit it to customize {PKGNAME}.",
            paths.config.display()
        )?;
        done.wrote_default_config = true;
    }
    Ok(done)
}

/// Fail with guidance when there is no job list to work on.
pub fn check_urls(paths: &WatchPaths, console: &mut dyn Write) -> Result<()> {
    if paths.urls.is_file() {
        return Ok(());
    }
    writeln!(
        console,
        "You need to create {} in order to use {PKGNAME}.\nAdd one YAML document per job, e.g. \"url: https://example.com/\".",
        paths.urls.display()
    )?;
    Err(WatchError::MissingJobs(paths.urls.clone()))
}
