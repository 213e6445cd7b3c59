// sitewatch_core/src/domain.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Keys a job carries that migration does not interpret.
pub type Extra = BTreeMap<String, serde_yaml::Value>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UrlJob {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// POST body, a string or a mapping of form fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_yaml::Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShellJob {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrowserJob {
    pub navigate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One entry of the job list. Position in the list is significant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobRecord {
    Url(UrlJob),
    Shell(ShellJob),
    Browser(BrowserJob),
}

impl JobRecord {
    pub fn url(url: impl Into<String>) -> Self {
        JobRecord::Url(UrlJob {
            url: url.into(),
            name: None,
            data: None,
            extra: Extra::new(),
        })
    }

    pub fn shell(command: impl Into<String>) -> Self {
        JobRecord::Shell(ShellJob {
            command: command.into(),
            name: None,
            extra: Extra::new(),
        })
    }

    pub fn location(&self) -> &str {
        match self {
            JobRecord::Url(j) => &j.url,
            JobRecord::Shell(j) => &j.command,
            JobRecord::Browser(j) => &j.navigate,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            JobRecord::Url(j) => j.name.as_deref(),
            JobRecord::Shell(j) => j.name.as_deref(),
            JobRecord::Browser(j) => j.name.as_deref(),
        }
    }

    pub fn is_shell(&self) -> bool {
        matches!(self, JobRecord::Shell(_))
    }

    /// Stable cache key, shared with caches written by earlier releases.
    pub fn guid(&self) -> String {
        fingerprint(self.location())
    }
}

/// Lowercase hex SHA-1 of `location`.
pub fn fingerprint(location: &str) -> String {
    hex::encode(Sha1::digest(location.as_bytes()))
}

/// Most recent fetched content of one job.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub guid: String,
    pub data: String,
    /// Seconds since the epoch
    pub timestamp: f64,
    pub tries: i64,
    pub etag: Option<String>,
}

impl CacheEntry {
    pub fn new(guid: impl Into<String>, data: impl Into<String>, timestamp: f64) -> Self {
        Self {
            guid: guid.into(),
            data: data.into(),
            timestamp,
            tries: 0,
            etag: None,
        }
    }
}
