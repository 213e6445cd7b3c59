#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod cache;
pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod jobs;
pub mod migration;
pub mod session;

pub mod util {
    pub mod atomic;
}

#[cfg(test)]
mod test_support;

// Re-exports: stable API surface
pub use cache::{CacheBackend, CacheStore, CurrentDbCache, open_cache};
pub use config::{Settings, WatchPaths};
pub use domain::{CacheEntry, JobRecord};
pub use error::{Result, WatchError};
pub use migration::{MigrationReport, MigrationStep, Migrator};
pub use session::Session;
