//! Conversion of legacy on-disk state to the current layout.
//!
//! Every step follows the same order: populate and close the new artifact,
//! then retire the old one with a rename. An interrupted run leaves the
//! legacy artifact under a name that detection picks up again.

use std::io::Write;
use std::path::Path;

use crate::cache::{
    CacheBackend, CacheStore, CurrentDbCache, move_db_files, open_cache, remove_db_files,
    remove_db_sidecars,
};
use crate::config::{WatchPaths, migrated_name};
use crate::error::{Result, WatchError};
use crate::jobs::{UrlsTxt, UrlsYaml};
use crate::util::atomic::atomic_rename;

pub mod detect;

use detect::SchemaState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MigrationStep {
    UrlsMigrated { jobs: usize },
    CacheSchemaMigrated { entries: usize },
    /// Transfer had already committed; only the old file was archived.
    CacheSchemaFinished,
    CacheDirMigrated { entries: usize },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub steps: Vec<MigrationStep>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Runs the migrations for one state directory. Announcements go to
/// `console` before each step touches the filesystem.
pub struct Migrator<'a, W: Write> {
    paths: &'a WatchPaths,
    console: W,
    min_gain: f32,
}

impl<'a, W: Write> Migrator<'a, W> {
    pub fn new(paths: &'a WatchPaths, console: W) -> Self {
        Self {
            paths,
            console,
            min_gain: 0.05,
        }
    }

    pub fn with_min_gain(mut self, min_gain: f32) -> Self {
        self.min_gain = min_gain;
        self
    }

    pub fn into_console(self) -> W {
        self.console
    }

    /// Job list, then cache schema, then cache directory.
    pub fn run(&mut self) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();
        report.steps.extend(self.migrate_urls()?);
        report.steps.extend(self.migrate_cache_schema()?);
        report.steps.extend(self.migrate_cache_dir()?);
        Ok(report)
    }

    pub fn migrate_urls(&mut self) -> Result<Option<MigrationStep>> {
        if !detect::legacy_urls(self.paths) {
            return Ok(None);
        }
        let txt = self.paths.legacy_urls();
        let yaml = &self.paths.urls;
        writeln!(
            self.console,
            "Migrating URLs: {} -> {}",
            txt.display(),
            yaml.display()
        )?;

        let jobs = UrlsTxt::new(&txt).load_secure()?;
        UrlsYaml::new(yaml).save(&jobs)?;
        atomic_rename(&txt, &migrated_name(&txt))?;

        tracing::info!(jobs = jobs.len(), from = %txt.display(), to = %yaml.display(), "job list migrated");
        Ok(Some(MigrationStep::UrlsMigrated { jobs: jobs.len() }))
    }

    pub fn migrate_cache_schema(&mut self) -> Result<Option<MigrationStep>> {
        let Some(state) = detect::cache_schema(self.paths)? else {
            return Ok(None);
        };
        let cache = &self.paths.cache;
        let old = self.paths.cache_old();
        let archived = self.paths.cache_migrated();
        refuse_to_overwrite(&archived)?;

        match state {
            SchemaState::Legacy => {
                refuse_to_overwrite(&old)?;
                writeln!(
                    self.console,
                    "Migrating cache database to new format: {} (original kept as {})",
                    cache.display(),
                    archived.display()
                )?;
                move_db_files(cache, &old)?;
            }
            SchemaState::Interrupted if cache.exists() => {
                // Only the staging rename creates the canonical file while
                // `old` exists, so the transfer already committed.
                writeln!(
                    self.console,
                    "Finishing cache database migration: {} -> {}",
                    old.display(),
                    archived.display()
                )?;
                move_db_files(&old, &archived)?;
                return Ok(Some(MigrationStep::CacheSchemaFinished));
            }
            SchemaState::Interrupted => {
                writeln!(
                    self.console,
                    "Resuming cache database migration: {} -> {}",
                    old.display(),
                    cache.display()
                )?;
            }
        }

        let staging = self.paths.cache_staging();
        remove_db_files(&staging)?;
        let entries = self.transfer(CacheBackend::LegacyDb, &old, &staging)?;
        commit_staging(&staging, cache)?;
        move_db_files(&old, &archived)?;

        tracing::info!(entries, cache = %cache.display(), "cache schema migrated");
        Ok(Some(MigrationStep::CacheSchemaMigrated { entries }))
    }

    pub fn migrate_cache_dir(&mut self) -> Result<Option<MigrationStep>> {
        if !detect::legacy_cache_dir(self.paths) {
            return Ok(None);
        }
        let dir = self.paths.legacy_cache_dir();
        let cache = &self.paths.cache;
        let archived = migrated_name(&dir);
        refuse_to_overwrite(&archived)?;
        writeln!(
            self.console,
            "Migrating cache: {} -> {}",
            dir.display(),
            cache.display()
        )?;

        // A populated canonical cache takes the entries in place; restore
        // is transactional and skips snapshots it already holds.
        let entries = if cache.exists() {
            self.transfer(CacheBackend::Dir, &dir, cache)?
        } else {
            let staging = self.paths.cache_staging();
            remove_db_files(&staging)?;
            let n = self.transfer(CacheBackend::Dir, &dir, &staging)?;
            commit_staging(&staging, cache)?;
            n
        };
        atomic_rename(&dir, &archived)?;

        tracing::info!(entries, from = %dir.display(), "cache directory migrated");
        Ok(Some(MigrationStep::CacheDirMigrated { entries }))
    }

    /// Stream every entry of the `source` store into a current store at
    /// `dest`. Both handles are closed before this returns.
    fn transfer(&self, source: CacheBackend, from: &Path, dest: &Path) -> Result<usize> {
        let old = open_cache(source, from)?;
        let mut new: Box<dyn CacheStore> =
            Box::new(CurrentDbCache::open(dest)?.with_min_gain(self.min_gain));
        let restored = new.restore(old.backup()?)?;
        old.close()?;
        new.close()?;
        Ok(restored)
    }
}

/// Put a fully written, closed staging database at the canonical path.
/// Only called while nothing lives at `cache`, so sidecars found there are
/// leftovers of an earlier file.
fn commit_staging(staging: &Path, cache: &Path) -> Result<()> {
    remove_db_sidecars(cache)?;
    atomic_rename(staging, cache)
}

fn refuse_to_overwrite(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(WatchError::MigrationConflict {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
