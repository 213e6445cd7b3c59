use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "sitewatch: watch web pages and commands for changes", long_about = None)]
pub struct Cli {
    /// State directory (defaults to the per-user config directory)
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Job list to use instead of <state-dir>/urls.yaml
    #[arg(long, global = true)]
    pub urls: Option<PathBuf>,

    /// Config file to use instead of <state-dir>/config.yaml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache database to use instead of <state-dir>/cache.db
    #[arg(long, global = true)]
    pub cache: Option<PathBuf>,

    /// Hooks file to use instead of <state-dir>/hooks.py
    #[arg(long, global = true)]
    pub hooks: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bring on-disk state up to date and exit
    Migrate,

    /// List jobs with their cache status
    List {
        /// Show the job fingerprint
        #[arg(long)]
        guid: bool,
    },

    /// Drop cache data of removed jobs and trim snapshot history
    GcCache {
        /// Snapshots to keep per job (defaults to cache.history in the config)
        #[arg(long)]
        retain: Option<usize>,
    },
}
