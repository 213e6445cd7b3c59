use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}: not a valid store ({reason})", path.display())]
    CorruptStore { path: PathBuf, reason: String },

    #[error("cannot rename {} -> {}: {source}", from.display(), to.display())]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} already exists, refusing to overwrite it", path.display())]
    MigrationConflict { path: PathBuf },

    #[error("no jobs file at {}", .0.display())]
    MissingJobs(PathBuf),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Format error: {0}")]
    Format(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl WatchError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        WatchError::CorruptStore {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, WatchError>;
