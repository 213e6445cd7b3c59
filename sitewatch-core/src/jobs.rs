//! Job list files: the canonical multi-document YAML file and the legacy
//! one-job-per-line text file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::JobRecord;
use crate::error::{Result, WatchError};
use crate::util::atomic::atomic_write;

/// Legacy `urls.txt`: `url`, `url post-data`, or `|command` per line.
pub struct UrlsTxt {
    path: PathBuf,
}

impl UrlsTxt {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<JobRecord>> {
        let text = fs::read_to_string(&self.path)?;
        parse_txt(&text).map_err(|reason| WatchError::corrupt(&self.path, reason))
    }

    pub fn load_secure(&self) -> Result<Vec<JobRecord>> {
        drop_unsafe_shell_jobs(&self.path, self.load()?)
    }
}

fn parse_txt(text: &str) -> std::result::Result<Vec<JobRecord>, String> {
    let mut jobs = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(command) = line.strip_prefix('|') {
            jobs.push(JobRecord::shell(command));
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let job = match fields.as_slice() {
            [url] => JobRecord::url(*url),
            [url, post] => {
                let mut job = JobRecord::url(*url);
                if let JobRecord::Url(u) = &mut job {
                    u.data = Some(serde_yaml::Value::String(post.to_string()));
                }
                job
            }
            _ => return Err(format!("line {}: unsupported format: {line:?}", lineno + 1)),
        };
        jobs.push(job);
    }
    Ok(jobs)
}

/// Canonical `urls.yaml`: one YAML document per job, in order.
pub struct UrlsYaml {
    path: PathBuf,
}

impl UrlsYaml {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<JobRecord>> {
        let text = fs::read_to_string(&self.path)?;
        let mut jobs = Vec::new();
        for (idx, doc) in serde_yaml::Deserializer::from_str(&text).enumerate() {
            let value = serde_yaml::Value::deserialize(doc)
                .map_err(|e| WatchError::corrupt(&self.path, format!("document {}: {e}", idx + 1)))?;
            if value.is_null() {
                continue;
            }
            let job: JobRecord = serde_yaml::from_value(value).map_err(|e| {
                WatchError::corrupt(&self.path, format!("document {}: not a job ({e})", idx + 1))
            })?;
            jobs.push(job);
        }
        Ok(jobs)
    }

    pub fn load_secure(&self) -> Result<Vec<JobRecord>> {
        drop_unsafe_shell_jobs(&self.path, self.load()?)
    }

    pub fn save(&self, jobs: &[JobRecord]) -> Result<()> {
        let docs = jobs
            .iter()
            .map(serde_yaml::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        atomic_write(&self.path, docs.join("---\n").as_bytes())
    }
}

fn drop_unsafe_shell_jobs(path: &Path, jobs: Vec<JobRecord>) -> Result<Vec<JobRecord>> {
    if !jobs.iter().any(JobRecord::is_shell) {
        return Ok(jobs);
    }
    let problems = shell_job_security_problems(path)?;
    if problems.is_empty() {
        return Ok(jobs);
    }
    tracing::warn!(
        file = %path.display(),
        "removing shell jobs, because {}",
        problems.join(" and ")
    );
    Ok(jobs.into_iter().filter(|j| !j.is_shell()).collect())
}

/// Shell jobs only run from files that nobody else can edit.
#[cfg(unix)]
fn shell_job_security_problems(path: &Path) -> Result<Vec<String>> {
    use std::os::unix::fs::MetadataExt;

    const GROUP_OR_WORLD_WRITABLE: u32 = 0o022;

    let uid = nix::unistd::getuid().as_raw();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut problems = Vec::new();
    for target in [dir, path] {
        let md = fs::metadata(target)?;
        if md.mode() & GROUP_OR_WORLD_WRITABLE != 0 {
            problems.push(format!("{} is group/world-writable", target.display()));
        }
        if md.uid() != uid {
            problems.push(format!("{} not owned by uid {uid}", target.display()));
        }
    }
    Ok(problems)
}

#[cfg(not(unix))]
fn shell_job_security_problems(_path: &Path) -> Result<Vec<String>> {
    Ok(Vec::new())
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
