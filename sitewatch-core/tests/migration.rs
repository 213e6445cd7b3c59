use std::fs;
use std::path::Path;

use rusqlite::{Connection, params};
use sitewatch_core::jobs::UrlsYaml;
use sitewatch_core::{
    CacheBackend, CacheEntry, JobRecord, MigrationStep, Session, WatchPaths, open_cache,
};

const URLS: [&str; 2] = ["https://example.com/news", "https://example.org/status"];

fn legacy_db(path: &Path, rows: &[(&str, &str, f64)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE CacheEntry (
           id INTEGER PRIMARY KEY,
           guid TEXT,
           timestamp INTEGER,
           data TEXT,
           tries INTEGER,
           etag TEXT
         );",
    )
    .unwrap();
    for (guid, data, ts) in rows {
        conn.execute(
            "INSERT INTO CacheEntry (guid, timestamp, data, tries) VALUES (?1, ?2, ?3, 0)",
            params![guid, ts, data],
        )
        .unwrap();
    }
    conn.close().unwrap();
}

fn snapshots(path: &Path) -> Vec<CacheEntry> {
    let store = open_cache(CacheBackend::CurrentDb, path).unwrap();
    let entries = store
        .backup()
        .unwrap()
        .collect::<sitewatch_core::Result<Vec<_>>>()
        .unwrap();
    store.close().unwrap();
    entries
}

/// A state directory as an old release left it: text job list, single
/// snapshot database and a per-file cache directory.
fn legacy_state(root: &Path) -> WatchPaths {
    let paths = WatchPaths::under(root);
    fs::write(paths.legacy_urls(), format!("{}\n{}\n", URLS[0], URLS[1])).unwrap();

    let news = JobRecord::url(URLS[0]).guid();
    let status = JobRecord::url(URLS[1]).guid();
    legacy_db(
        &paths.cache,
        &[
            (news.as_str(), "news v1", 1_600_000_000.0),
            ("0000dropped", "orphan", 1_600_000_001.0),
        ],
    );
    let dir = paths.legacy_cache_dir();
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join(&status), "status page").unwrap();
    paths
}

#[test]
fn startup_migrates_everything_once() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = legacy_state(tmp.path());

    let mut console = Vec::new();
    let session = Session::start(paths.clone(), &mut console).unwrap();
    let console = String::from_utf8(console).unwrap();

    assert!(console.contains("A default config has been written"));
    assert!(console.contains("Migrating URLs"));
    assert!(console.contains("Migrating cache database to new format"));
    assert!(console.contains("Migrating cache:"));
    assert_eq!(
        session.migration.steps,
        vec![
            MigrationStep::UrlsMigrated { jobs: 2 },
            MigrationStep::CacheSchemaMigrated { entries: 2 },
            MigrationStep::CacheDirMigrated { entries: 1 },
        ]
    );

    let jobs = UrlsYaml::new(&paths.urls).load().unwrap();
    assert_eq!(jobs, vec![JobRecord::url(URLS[0]), JobRecord::url(URLS[1])]);
    assert_eq!(snapshots(&paths.cache).len(), 3);
    assert!(paths.cache_migrated().is_file());
    assert!(!paths.legacy_urls().exists());
    assert!(!paths.legacy_cache_dir().exists());

    drop(session);
    let mut console = Vec::new();
    let again = Session::start(paths.clone(), &mut console).unwrap();
    assert!(again.migration.is_empty());
    assert!(console.is_empty());
    assert_eq!(snapshots(&paths.cache).len(), 3);
}

#[test]
fn gc_drops_snapshots_of_removed_jobs() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = legacy_state(tmp.path());
    let session = Session::start(paths.clone(), &mut Vec::new()).unwrap();

    let cache = session.open_cache().unwrap();
    let news = JobRecord::url(URLS[0]).guid();
    cache
        .save(&CacheEntry::new(news.as_str(), "news v2", 1_600_000_100.0))
        .unwrap();
    cache.close().unwrap();

    let stats = session.gc_cache(Some(1)).unwrap();

    assert_eq!(stats.dropped_guids, 1);
    assert_eq!(stats.trimmed, 1);
    let left = snapshots(&paths.cache);
    assert_eq!(left.len(), 2);
    assert!(left.iter().all(|e| e.guid != "0000dropped"));
    assert!(left.iter().any(|e| e.data == "news v2"));
}

#[test]
fn migrated_cache_files_stay_attached_to_their_jobs() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = WatchPaths::under(tmp.path());
    fs::write(paths.legacy_urls(), "https://example.com/\n").unwrap();
    // Earlier releases keyed cache files by the SHA-1 of the URL.
    let dir = paths.legacy_cache_dir();
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("b559c7edd3fb67374c1a25e739cdd7edd1d79949"), "cached page").unwrap();

    let session = Session::start(paths.clone(), &mut Vec::new()).unwrap();
    let jobs = session.load_jobs().unwrap();
    assert_eq!(jobs.len(), 1);

    let cache = session.open_cache().unwrap();
    let entry = cache.load(&jobs[0].guid()).unwrap();
    assert_eq!(entry.map(|e| e.data).as_deref(), Some("cached page"));
    cache.close().unwrap();

    let stats = session.gc_cache(None).unwrap();
    assert_eq!(stats.dropped_guids, 0);
    assert_eq!(snapshots(&paths.cache).len(), 1);
}
