use std::io::Write;

use sitewatch_core::bootstrap::check_urls;
use sitewatch_core::error::Result;
use sitewatch_core::{MigrationStep, Session, WatchPaths};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

fn start(paths: WatchPaths) -> Result<Session> {
    let mut console = std::io::stderr().lock();
    Session::start(paths, &mut console)
}

fn format_timestamp(ts: f64) -> String {
    OffsetDateTime::from_unix_timestamp(ts as i64)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| format!("{ts}"))
}

pub fn handle_migrate(paths: WatchPaths) -> Result<()> {
    let session = start(paths)?;
    if session.migration.is_empty() {
        eprintln!("migrate: nothing to do");
        return Ok(());
    }
    for step in &session.migration.steps {
        match step {
            MigrationStep::UrlsMigrated { jobs } => eprintln!("migrate: {jobs} job(s) converted"),
            MigrationStep::CacheSchemaMigrated { entries } => {
                eprintln!("migrate: {entries} cache entries converted")
            }
            MigrationStep::CacheSchemaFinished => {
                eprintln!("migrate: finished an interrupted cache conversion")
            }
            MigrationStep::CacheDirMigrated { entries } => {
                eprintln!("migrate: {entries} cache file(s) imported")
            }
        }
    }
    Ok(())
}

pub fn handle_list(paths: WatchPaths, show_guid: bool) -> Result<()> {
    let session = start(paths)?;
    check_urls(&session.paths, &mut std::io::stderr().lock())?;
    let jobs = session.load_jobs()?;
    let cache = session.open_cache()?;

    let mut out = std::io::stdout().lock();
    for (idx, job) in jobs.iter().enumerate() {
        let guid = job.guid();
        let label = match job.name() {
            Some(name) => format!("{name} ({})", job.location()),
            None => job.location().to_string(),
        };
        let seen = match cache.load(&guid)? {
            Some(entry) => format_timestamp(entry.timestamp),
            None => "never".to_string(),
        };
        if show_guid {
            writeln!(out, "{:>3}: {label}  last={seen}  guid={guid}", idx + 1)?;
        } else {
            writeln!(out, "{:>3}: {label}  last={seen}", idx + 1)?;
        }
    }
    cache.close()
}

pub fn handle_gc_cache(paths: WatchPaths, retain: Option<usize>) -> Result<()> {
    let session = start(paths)?;
    check_urls(&session.paths, &mut std::io::stderr().lock())?;
    let stats = session.gc_cache(retain)?;
    eprintln!(
        "gc-cache: removed {} job(s), trimmed {} snapshot(s)",
        stats.dropped_guids, stats.trimmed
    );
    Ok(())
}
