//! `geonorm cache` — inspect or clear the on-disk geocode cache.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use geonorm_geocode::SqliteCache;

use crate::CliError;

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show entry counts per provider
    #[command(after_help = "\
Examples:
  geonorm cache stats geonorm-cache.sqlite3
  geonorm cache stats geonorm-cache.sqlite3 --json")]
    Stats {
        /// Path to the cache file
        path: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete every cached lookup
    Clear {
        /// Path to the cache file
        path: PathBuf,
    },
}

pub fn cmd_cache(cmd: CacheCommands) -> Result<(), CliError> {
    match cmd {
        CacheCommands::Stats { path, json } => cmd_cache_stats(&path, json),
        CacheCommands::Clear { path } => cmd_cache_clear(&path),
    }
}

/// Open an existing cache; never creates one.
fn open_existing(path: &Path) -> Result<SqliteCache, CliError> {
    if !path.is_file() {
        return Err(CliError::io(format!("no cache file at {}", path.display())));
    }
    SqliteCache::open(path).map_err(|e| CliError::io(e.to_string()))
}

fn cmd_cache_stats(path: &Path, json: bool) -> Result<(), CliError> {
    let stats = open_existing(path)?
        .stats()
        .map_err(|e| CliError::io(e.to_string()))?;

    if json {
        let out = serde_json::to_string_pretty(&stats)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    println!("cache:     {}", stats.path.display());
    println!("entries:   {}", stats.total);
    println!("not found: {}", stats.not_found);
    for (provider, count) in &stats.by_provider {
        println!("  {provider:<15} {count}");
    }
    Ok(())
}

fn cmd_cache_clear(path: &Path) -> Result<(), CliError> {
    let removed = open_existing(path)?
        .clear()
        .map_err(|e| CliError::io(e.to_string()))?;
    println!("removed {removed} entries from {}", path.display());
    Ok(())
}
