use std::collections::HashSet;
use std::io::Write;

use crate::bootstrap;
use crate::cache::CurrentDbCache;
use crate::cache::current_db::GcStats;
use crate::config::{Settings, WatchPaths};
use crate::domain::JobRecord;
use crate::error::Result;
use crate::jobs::UrlsYaml;
use crate::migration::{MigrationReport, Migrator};

/// State established at process start: directories exist, config is
/// loaded, and every migration has finished. Only a `Session` hands out
/// the cache.
pub struct Session {
    pub paths: WatchPaths,
    pub settings: Settings,
    pub migration: MigrationReport,
}

impl Session {
    pub fn start(paths: WatchPaths, console: &mut dyn Write) -> Result<Self> {
        tracing::info!(path = %paths.urls.display(), "using URLs file");
        tracing::info!(path = %paths.hooks.display(), "using hooks file");
        tracing::info!(path = %paths.cache.display(), "using cache database");

        bootstrap::ensure_state(&paths, console)?;
        let settings = Settings::load(&paths.config)?;
        let migration = Migrator::new(&paths, &mut *console)
            .with_min_gain(settings.cache.min_gain)
            .run()?;
        Ok(Self {
            paths,
            settings,
            migration,
        })
    }

    /// Jobs in file order; an absent job list is empty.
    pub fn load_jobs(&self) -> Result<Vec<JobRecord>> {
        if !self.paths.urls.is_file() {
            tracing::warn!(path = %self.paths.urls.display(), "no jobs file found");
            return Ok(Vec::new());
        }
        let jobs = UrlsYaml::new(&self.paths.urls).load_secure()?;
        tracing::info!(count = jobs.len(), "found jobs");
        Ok(jobs)
    }

    pub fn open_cache(&self) -> Result<CurrentDbCache> {
        Ok(CurrentDbCache::open(&self.paths.cache)?.with_min_gain(self.settings.cache.min_gain))
    }

    /// Remove cache data of jobs no longer listed and trim history to
    /// `retain` snapshots (config default when `None`).
    pub fn gc_cache(&self, retain: Option<usize>) -> Result<GcStats> {
        let keep: HashSet<String> = self.load_jobs()?.iter().map(JobRecord::guid).collect();
        let mut cache = self.open_cache()?;
        let stats = cache.gc(&keep, retain.unwrap_or(self.settings.cache.history))?;
        cache.close()?;
        Ok(stats)
    }
}
