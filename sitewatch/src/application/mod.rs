pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use sitewatch_core::error::Result;
use sitewatch_core::WatchPaths;

pub fn run(cli: Cli) -> Result<()> {
    let paths = paths_from_args(&cli);
    match cli.command {
        Commands::Migrate => handlers::handle_migrate(paths),
        Commands::List { guid } => handlers::handle_list(paths, guid),
        Commands::GcCache { retain } => handlers::handle_gc_cache(paths, retain),
    }
}

/// Default layout under the state directory, with per-file overrides.
pub fn paths_from_args(cli: &Cli) -> WatchPaths {
    let state_dir = cli
        .state_dir
        .clone()
        .unwrap_or_else(WatchPaths::default_state_dir);
    let mut paths = WatchPaths::under(state_dir);
    if let Some(p) = &cli.urls {
        paths.urls = p.clone();
    }
    if let Some(p) = &cli.config {
        paths.config = p.clone();
    }
    if let Some(p) = &cli.cache {
        paths.cache = p.clone();
    }
    if let Some(p) = &cli.hooks {
        paths.hooks = p.clone();
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn overrides_replace_single_paths() {
        let cli = Cli::parse_from([
            "sitewatch",
            "--state-dir",
            "/tmp/sw",
            "--cache",
            "/var/cache/sw.db",
            "list",
        ]);
        let paths = paths_from_args(&cli);
        assert_eq!(paths.state_dir, PathBuf::from("/tmp/sw"));
        assert_eq!(paths.urls, PathBuf::from("/tmp/sw/urls.yaml"));
        assert_eq!(paths.cache, PathBuf::from("/var/cache/sw.db"));
        assert_eq!(paths.cache_old(), PathBuf::from("/var/cache/sw-old.db"));
    }

    #[test]
    fn gc_cache_takes_retain() {
        let cli = Cli::parse_from(["sitewatch", "gc-cache", "--retain", "3", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::GcCache { retain: Some(3) }));
    }
}
