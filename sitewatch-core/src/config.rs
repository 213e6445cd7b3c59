use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::util::atomic::atomic_write;

pub const PKGNAME: &str = "sitewatch";

/// Every on-disk location the tool reads or writes.
#[derive(Clone, Debug)]
pub struct WatchPaths {
    pub state_dir: PathBuf,
    pub urls: PathBuf,
    pub config: PathBuf,
    pub hooks: PathBuf,
    pub cache: PathBuf,
}

impl WatchPaths {
    /// Default layout: everything lives directly under `state_dir`.
    pub fn under(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            urls: state_dir.join("urls.yaml"),
            config: state_dir.join("config.yaml"),
            hooks: state_dir.join("hooks.py"),
            cache: state_dir.join("cache.db"),
            state_dir,
        }
    }

    /// `<config dir>/sitewatch`, falling back to `./.sitewatch`.
    pub fn default_state_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join(PKGNAME))
            .unwrap_or_else(|| PathBuf::from(format!(".{PKGNAME}")))
    }

    pub fn legacy_urls(&self) -> PathBuf {
        self.state_dir.join("urls.txt")
    }

    pub fn legacy_cache_dir(&self) -> PathBuf {
        self.state_dir.join("cache")
    }

    /// `cache-old.db`: the legacy-schema file while its content is copied out.
    pub fn cache_old(&self) -> PathBuf {
        sibling_with_suffix(&self.cache, "-old")
    }

    /// `cache-migrated.db`: archived legacy-schema file.
    pub fn cache_migrated(&self) -> PathBuf {
        sibling_with_suffix(&self.cache, "-migrated")
    }

    /// `cache-new.db`: restore target before it is renamed to `cache`.
    pub fn cache_staging(&self) -> PathBuf {
        sibling_with_suffix(&self.cache, "-new")
    }
}

/// `dir/root.ext` -> `dir/root{suffix}.ext`
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}

/// Append `.migrated` to the full file name.
pub fn migrated_name(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".migrated");
    path.with_file_name(name)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub new: bool,
    pub error: bool,
    pub unchanged: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            new: true,
            error: true,
            unchanged: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextReport {
    pub line_length: u32,
    pub details: bool,
    pub footer: bool,
}

impl Default for TextReport {
    fn default() -> Self {
        Self {
            line_length: 75,
            details: true,
            footer: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StdoutReport {
    pub enabled: bool,
    pub color: bool,
}

impl Default for StdoutReport {
    fn default() -> Self {
        Self {
            enabled: true,
            color: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub text: TextReport,
    pub stdout: StdoutReport,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Snapshots kept per job by `gc-cache`.
    pub history: usize,
    /// Only accept zstd if it saves at least this fraction.
    pub min_gain: f32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            history: 1,
            min_gain: 0.05,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub display: DisplaySettings,
    pub report: ReportSettings,
    pub cache: CacheSettings,
}

impl Settings {
    /// Read `path`; fields missing from the file take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&text)?)
    }

    pub fn write_default(path: &Path) -> Result<()> {
        let doc = serde_yaml::to_string(&Self::default())?;
        atomic_write(path, doc.as_bytes())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
