// geonorm CLI - Japanese address normalization and dual-source geocoding

mod cache_cmd;
mod concat;
mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "geonorm")]
#[command(about = "Normalize Japanese addresses and geocode them against Google and GSI")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the input CSV, normalize and geocode every row, write the output CSV
    #[command(after_help = "\
Examples:
  geonorm run shibuya.json
  geonorm run shibuya.json --quiet
  GEONORM_API_KEY=... geonorm run shibuya.json
  RUST_LOG=debug geonorm run shibuya.json")]
    Run {
        /// Path to the JSON config file
        config: PathBuf,

        /// Only log warnings and errors; no summary line
        #[arg(long, short = 'q')]
        quiet: bool,

        #[command(flatten)]
        providers: ProviderArgs,
    },

    /// Load and validate a config without touching the network
    #[command(after_help = "\
Examples:
  geonorm validate shibuya.json")]
    Validate {
        /// Path to the JSON config file
        config: PathBuf,

        #[command(flatten)]
        providers: ProviderArgs,
    },

    /// Concatenate <prefix>*.csv part files into <prefix>.csv
    #[command(after_help = "\
Examples:
  geonorm concat out/shibuya_
  (joins out/shibuya_01.csv, out/shibuya_02.csv, ... into out/shibuya_.csv)")]
    Concat {
        /// File name prefix shared by the part files
        prefix: String,
    },

    /// Inspect or clear the on-disk geocode cache
    #[command(subcommand)]
    Cache(cache_cmd::CacheCommands),

    /// Print the canonical form of an address
    #[command(after_help = "\
Examples:
  geonorm normalize '東京都渋谷区神南一丁目二番三号 ３F'")]
    Normalize {
        /// Address text
        address: String,
    },
}

/// Credentials and endpoints for the geocoding providers.
#[derive(Args, Debug, Clone, Default)]
pub struct ProviderArgs {
    /// Google API key, used when the config has no `api.key`
    #[arg(long, env = "GEONORM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Override the Google Geocoding endpoint
    #[arg(long, env = "GEONORM_GOOGLE_URL", hide = true)]
    pub google_url: Option<String>,

    /// Override the GSI address search endpoint
    #[arg(long, env = "GEONORM_GSI_URL", hide = true)]
    pub gsi_url: Option<String>,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ncore:    geonorm-core ", env!("CARGO_PKG_VERSION"),
    )
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second init (tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, quiet, providers } => {
            init_logging(quiet);
            run::cmd_run(config, quiet, providers)
        }
        Commands::Validate { config, providers } => {
            init_logging(false);
            run::cmd_validate(config, providers)
        }
        Commands::Concat { prefix } => concat::cmd_concat(&prefix),
        Commands::Cache(cmd) => cache_cmd::cmd_cache(cmd),
        Commands::Normalize { address } => {
            println!("{}", geonorm_core::canonicalize(&address));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Create error from a ReconError with the registry's exit code.
    pub fn recon(err: geonorm_recon::ReconError) -> Self {
        use geonorm_recon::ReconError;

        let code = exit_codes::recon_exit_code(&err);
        let hint = match &err {
            ReconError::MissingApiKey => {
                Some("set api.key in the config or the GEONORM_API_KEY environment variable".to_string())
            }
            ReconError::ProviderAuth(_) => Some("check that the key has the Geocoding API enabled".to_string()),
            ReconError::ConfigParse(msg) if msg.contains("unknown variant") => {
                Some("api.mode is distance | reverse_geocode | simple; gsi_check.priority is gsi | google".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
