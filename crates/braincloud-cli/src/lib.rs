//! # brainCloud CLI
//!
//! Command-line tool for measuring latency to brainCloud lobby regions, using
//! the same probing code as the SDK.
//!
//! ## Features
//!
//! - Load region definitions saved from a `GET_REGIONS_FOR_LOBBIES` response
//! - Probe every region over HTTP with bounded parallelism
//! - Ping settings from a JSON file, overridable per flag
//! - JSON and human-readable output formats
//!
//! ## Usage
//!
//! ```bash
//! # Ping every region in a saved response
//! braincloud-cli ping --regions regions.json
//!
//! # Four regions at a time, machine-readable output
//! braincloud-cli ping --regions regions.json --parallelism 4 --json
//!
//! # Settings from a file, with debug logging
//! RUST_LOG=braincloud_client=debug braincloud-cli ping --regions regions.json --config ping.json
//! ```

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use braincloud_client::lobby::ping::{PingCoordinator, PingData, RegionRegistry};
use braincloud_core::{FnCallback, PingConfig};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "braincloud-cli",
    version,
    about = "Measure latency to brainCloud lobby regions."
)]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, env = "BRAINCLOUD_LOG", default_value = "warn")]
    pub log_level: String,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ping every region in a region definition file
    Ping(PingArgs),
}

/// Options of the `ping` subcommand
#[derive(Args, Debug, Clone)]
pub struct PingArgs {
    /// JSON file holding a regionPingData object or a whole GET_REGIONS_FOR_LOBBIES response
    #[arg(long)]
    pub regions: PathBuf,

    /// Regions probed at the same time
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Timed requests per region
    #[arg(long)]
    pub samples: Option<usize>,

    /// Timeout of a single request in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// JSON ping configuration; flags take precedence over it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Emit JSON output
    #[arg(long)]
    pub json: bool,

    /// Milliseconds between callback pumps
    #[arg(long, default_value_t = 16)]
    pub tick_ms: u64,
}

/// Errors reported by the CLI
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Input file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Input file is not JSON
    #[error("{} is not valid JSON: {source}", .path.display())]
    Parse {
        /// File that was parsed
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// Region file holds nothing to ping
    #[error("no PING regions found in {}", .0.display())]
    NoRegions(PathBuf),

    /// Invalid configuration or client setup failure
    #[error(transparent)]
    Sdk(#[from] Box<braincloud_core::Error>),

    /// The ping session reported an error
    #[error("region ping failed ({status_code}/{reason_code}): {message}")]
    PingFailed {
        /// Status code delivered to the callback
        status_code: i32,
        /// Reason code delivered to the callback
        reason_code: i32,
        /// Message delivered to the callback
        message: String,
    },

    /// Ping results were not in the expected shape
    #[error("unexpected ping response: {0}")]
    Response(String),
}

/// Run the CLI application
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Ping(args) => {
            let data = cmd_ping(&args)?;
            print!("{}", render(&data, args.json)?);
        }
    }

    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // Already installed when embedded in a host that set up its own subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Ping configuration from `--config` with flag overrides applied
pub fn effective_config(args: &PingArgs) -> Result<PingConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => PingConfig::from_json_str(&read(path)?)?,
        None => PingConfig::default(),
    };

    if let Some(parallelism) = args.parallelism {
        config.parallelism = parallelism;
    }
    if let Some(samples) = args.samples {
        config.samples_per_region = samples;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.probe_timeout_ms = timeout_ms;
    }

    config.validate()?;
    Ok(config)
}

/// Load a region definition file into a fresh registry
///
/// Accepts the bare `regionPingData` object as well as a complete
/// `GET_REGIONS_FOR_LOBBIES` response.
pub fn load_regions(path: &Path) -> Result<RegionRegistry, CliError> {
    let raw: Value = serde_json::from_str(&read(path)?).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let registry = RegionRegistry::new();
    let count = if raw.pointer("/data/regionPingData").is_some() {
        registry.set_from_response(&raw)
    } else {
        registry.set_regions(&raw)
    };

    if count == 0 {
        return Err(CliError::NoRegions(path.to_path_buf()));
    }

    debug!(regions = count, path = %path.display(), "regions loaded");
    Ok(registry)
}

/// Ping every region in `args.regions` and wait for the results
pub fn cmd_ping(args: &PingArgs) -> Result<PingData, CliError> {
    let config = effective_config(args)?;
    let registry = Arc::new(load_regions(&args.regions)?);
    info!(regions = registry.len(), parallelism = config.parallelism, "pinging regions");

    let coordinator = PingCoordinator::with_http_prober(registry, config)?;

    let (tx, rx) = mpsc::channel();
    let error_tx = tx.clone();
    let callback = FnCallback::shared(
        move |_, _, json| {
            let _ = tx.send(Ok(json.clone()));
        },
        move |_, _, status_code, reason_code, message| {
            let _ = error_tx.send(Err(CliError::PingFailed {
                status_code,
                reason_code,
                message: message.to_string(),
            }));
        },
    );

    coordinator.start_ping(Some(callback));

    let tick = Duration::from_millis(args.tick_ms.max(1));
    let response = loop {
        coordinator.run_callbacks();
        match rx.recv_timeout(tick) {
            Ok(outcome) => break outcome?,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(CliError::Response("callback dropped without result".to_string()));
            }
        }
    };

    serde_json::from_value(response["data"].clone()).map_err(|e| CliError::Response(e.to_string()))
}

/// Format ping results for the terminal
///
/// The table lists the fastest region first.
pub fn render(data: &PingData, json: bool) -> Result<String, CliError> {
    if json {
        let mut out = serde_json::to_string_pretty(data)
            .map_err(|e| CliError::Response(e.to_string()))?;
        out.push('\n');
        return Ok(out);
    }

    let mut rows: Vec<(&String, &u32)> = data.iter().collect();
    rows.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));

    let width = rows
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0)
        .max("REGION".len());

    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  LATENCY", "REGION");
    for (name, latency) in rows {
        let _ = writeln!(out, "{name:<width$}  {latency} ms");
    }
    Ok(out)
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}
