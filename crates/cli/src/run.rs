//! `geonorm run` / `geonorm validate` — config-driven CSV geocoding.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use geonorm_geocode::{GoogleClient, GsiClient, SqliteCache, DEFAULT_CACHE_FILE};
use geonorm_recon::{
    CachedLookup, GeoConfig, ProviderError, Providers, Reconciler, RowPipeline, Throttle,
};

use crate::{CliError, ProviderArgs};

/// A validated config with every path made absolute.
#[derive(Debug)]
pub(crate) struct LoadedConfig {
    pub config: GeoConfig,
    pub cache_path: PathBuf,
}

/// Resolve `path` against the config file's directory unless it is absolute.
fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

pub(crate) fn load_config(config_path: &Path, providers: &ProviderArgs) -> Result<LoadedConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", config_path.display())))?;

    let mut config = GeoConfig::parse(&config_str).map_err(CliError::recon)?;

    if config.api.api_key().is_none() {
        config.api.key = providers.api_key.clone();
    }
    config.validate().map_err(CliError::recon)?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    config.input = resolve(base_dir, &config.input);
    config.output = resolve(base_dir, &config.output);
    let cache_path = match &config.cache {
        Some(path) => resolve(base_dir, path),
        None => base_dir.join(DEFAULT_CACHE_FILE),
    };

    Ok(LoadedConfig { config, cache_path })
}

fn provider_err(err: ProviderError) -> CliError {
    CliError::general(format!("cannot set up geocoding client: {err}"))
}

fn build_reconciler(loaded: &LoadedConfig, args: &ProviderArgs) -> Result<Reconciler, CliError> {
    let api = &loaded.config.api;
    let key = api.api_key().unwrap_or_default().to_string();

    let google = || match &args.google_url {
        Some(url) => GoogleClient::with_url(key.clone(), url.clone()),
        None => GoogleClient::new(key.clone()),
    };
    let gsi = match &args.gsi_url {
        Some(url) => GsiClient::with_url(url.clone()),
        None => GsiClient::new(),
    }
    .map_err(provider_err)?;

    let providers = Providers {
        google: Box::new(google().map_err(provider_err)?),
        gsi: Box::new(gsi),
        reverse: Box::new(google().map_err(provider_err)?),
    };

    let cache = SqliteCache::open(&loaded.cache_path).map_err(|e| CliError::io(e.to_string()))?;
    info!(path = %loaded.cache_path.display(), mode = %api.mode, "geocode cache ready");

    let lookup = CachedLookup::new(Arc::new(cache), Throttle::from_millis(api.sleep));
    Ok(Reconciler::new(api.clone(), providers, Arc::new(lookup)))
}

pub fn cmd_run(config_path: PathBuf, quiet: bool, args: ProviderArgs) -> Result<(), CliError> {
    let loaded = load_config(&config_path, &args)?;
    let config = &loaded.config;

    let reconciler = if config.format.needs_coordinates() {
        Some(build_reconciler(&loaded, &args)?)
    } else {
        None
    };
    let mut pipeline = RowPipeline::new(config, reconciler).map_err(CliError::recon)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(&config.input)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", config.input.display())))?;

    let mut writer = csv::Writer::from_path(&config.output)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", config.output.display())))?;
    let write_err = |e: &dyn std::fmt::Display| CliError::io(format!("cannot write {}: {e}", config.output.display()));

    writer.write_record(pipeline.header()).map_err(|e| write_err(&e))?;
    writer.flush().map_err(|e| write_err(&e))?;

    for record in reader.records() {
        let record = record.map_err(|e| CliError::io(format!("{}: {e}", config.input.display())))?;
        let row: Vec<String> = record.iter().map(str::to_string).collect();

        let rendered = pipeline.process(&row).map_err(CliError::recon)?;

        // Flush per row so completed rows survive a later abort.
        writer.write_record(&rendered.values).map_err(|e| write_err(&e))?;
        writer.flush().map_err(|e| write_err(&e))?;
    }

    let summary = pipeline.summary();
    info!(
        rows = summary.rows,
        google = summary.google,
        gsi = summary.gsi,
        unresolved = summary.unresolved,
        suspect = summary.suspect,
        "run complete"
    );
    if let Some(lookup) = pipeline.reconciler().map(|r| r.lookup()) {
        let stats = lookup.stats();
        info!(hits = stats.hits, calls = stats.calls, degraded = stats.degraded, "lookup stats");
    }

    if !quiet {
        eprintln!("wrote {} rows → {}", summary.rows, config.output.display());
        if pipeline.reconciler().is_some() {
            eprintln!(
                "sources: {} google, {} gsi, {} unresolved ({} flagged suspect)",
                summary.google, summary.gsi, summary.unresolved, summary.suspect,
            );
        }
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf, args: ProviderArgs) -> Result<(), CliError> {
    let loaded = load_config(&config_path, &args)?;
    let config = &loaded.config;

    println!("config:   {}", config_path.display());
    println!("input:    {}", config.input.display());
    println!("output:   {}", config.output.display());
    println!("columns:  {}", config.format.header().join(","));
    println!("normalize_address_digits: {}", config.normalize_address_digits);
    if config.format.needs_coordinates() {
        let check = &config.api.gsi_check;
        println!("geocoding: mode={}, sleep={}ms", config.api.mode, config.api.sleep);
        println!(
            "gsi_check: check={}, distance={}m, priority={}",
            check.check, check.distance, check.priority
        );
        println!("reverse_geocode_check: {}", config.api.reverse_geocode_check);
        println!("cache:    {}", loaded.cache_path.display());
    } else {
        println!("geocoding: not needed (no {{lat}} / {{long}} columns)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("geo.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    const WITH_COORDS: &str = r#"{
        "input": "in.csv",
        "output": "out/out.csv",
        "format": {"prefecture": "東京都", "city": "渋谷区", "address": "{1}", "lat": "{lat}"}
    }"#;

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, WITH_COORDS);
        let args = ProviderArgs { api_key: Some("k".into()), ..Default::default() };
        let loaded = load_config(&path, &args).unwrap();
        assert_eq!(loaded.config.input, dir.path().join("in.csv"));
        assert_eq!(loaded.config.output, dir.path().join("out/out.csv"));
        assert_eq!(loaded.cache_path, dir.path().join(DEFAULT_CACHE_FILE));
    }

    #[test]
    fn env_key_fills_missing_config_key() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, WITH_COORDS);
        let err = load_config(&path, &ProviderArgs::default()).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_MISSING_API_KEY);

        let args = ProviderArgs { api_key: Some("from-env".into()), ..Default::default() };
        let loaded = load_config(&path, &args).unwrap();
        assert_eq!(loaded.config.api.api_key(), Some("from-env"));
    }

    #[test]
    fn config_key_wins_over_env() {
        let dir = TempDir::new().unwrap();
        let json = WITH_COORDS.replace(r#""output""#, r#""api": {"key": "from-config"}, "output""#);
        let path = write_config(&dir, &json);
        let args = ProviderArgs { api_key: Some("from-env".into()), ..Default::default() };
        assert_eq!(load_config(&path, &args).unwrap().config.api.api_key(), Some("from-config"));
    }

    #[test]
    fn explicit_cache_path_is_resolved() {
        let dir = TempDir::new().unwrap();
        let json = WITH_COORDS.replace(r#""output""#, r#""cache": "c/geo.sqlite3", "output""#);
        let path = write_config(&dir, &json);
        let args = ProviderArgs { api_key: Some("k".into()), ..Default::default() };
        assert_eq!(load_config(&path, &args).unwrap().cache_path, dir.path().join("c/geo.sqlite3"));
    }

    #[test]
    fn missing_config_is_usage_error() {
        let err = load_config(Path::new("/nonexistent/geo.json"), &ProviderArgs::default()).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_USAGE);
    }
}
