//! sgdata-hc - Hawker centre closure calendars
//!
//! Fetches the NEA closure dataset and the MRT/LRT station list, groups
//! closures within a radius of each station and writes one `.ics` file per
//! station plus the `metadata.json` manifest.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use sgdata_common::config::{resolve_config_path, LoggingConfig};
use sgdata_common::output::write_manifest;
use sgdata_common::ResponseCache;
use sgdata_hc::config::{Config, ConfigOverrides};
use sgdata_hc::pipeline::{write_calendars, HawkerClosures};
use sgdata_hc::Stage;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV_VAR: &str = "SGDATA_CONFIG";

/// Command-line arguments for sgdata-hc
#[derive(Parser, Debug)]
#[command(name = "sgdata-hc")]
#[command(about = "Hawker centre closure calendars grouped by MRT station")]
#[command(version)]
struct Args {
    /// TOML configuration file (default: ./sgdata.toml if present)
    #[arg(short, long, env = "SGDATA_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the calendars and manifest are written to
    #[arg(short, long, env = "SGDATA_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Response cache file
    #[arg(long, env = "SGDATA_CACHE_FILE")]
    cache_file: Option<PathBuf>,

    /// Ignore and do not update the response cache
    #[arg(long)]
    no_cache: bool,

    /// Clustering radius around each station, in kilometres
    #[arg(short, long, env = "SGDATA_RADIUS_KM")]
    radius_km: Option<f64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SGDATA_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let overrides = ConfigOverrides {
        output_dir: args.output_dir,
        cache_file: args.cache_file,
        no_cache: args.no_cache,
        radius_km: args.radius_km,
        log_level: args.log_level,
    };
    let config = Config::load(config_path.as_deref(), overrides).context("Failed to load configuration")?;

    init_tracing(&config.logging)?;

    info!(
        "Starting sgdata hawker closures (sgdata-hc) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!(path = %path.display(), "Using configuration file"),
        None => info!("No configuration file, using defaults"),
    }
    config.log_summary();

    let mut cache = ResponseCache::load(config.cache_file.clone(), config.cache_enabled);
    let processor = HawkerClosures::new(&config).context("Failed to create HTTP clients")?;

    let calendars = match processor.run(&mut cache, Utc::now()).await {
        Ok(calendars) => calendars,
        Err(e) => {
            save_cache(&cache);
            return Err(e).context("Hawker closure run failed");
        }
    };

    let mut meta = processor.meta();
    let failed = write_calendars(&calendars.files, &config.output_dir, &mut meta);
    info!(
        written = meta.files.len(),
        failed = failed.len(),
        dir = %config.output_dir.join(&meta.data_category).display(),
        "Wrote calendars"
    );

    let manifest = write_manifest(&config.output_dir, std::slice::from_ref(&meta));
    save_cache(&cache);

    let report = &calendars.report;
    if report.is_clean() {
        info!("No closure entries skipped");
    } else {
        warn!(
            extract = report.count(Stage::Extract),
            cluster = report.count(Stage::Cluster),
            calendar = report.count(Stage::Calendar),
            "Closure entries skipped"
        );
    }

    let manifest = manifest.context("Failed to write manifest")?;
    info!(path = %manifest.display(), "Wrote manifest");

    if !failed.is_empty() {
        bail!("{} calendar file(s) could not be written: {}", failed.len(), failed.join(", "));
    }

    info!("Done");
    Ok(())
}

/// Install the tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(logging.level.to_ascii_lowercase()))
        .context("Invalid log filter")?;

    match &logging.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Persist the cache; a failure only costs the next run a refetch
fn save_cache(cache: &ResponseCache) {
    if let Err(e) = cache.save() {
        error!(error = %e, "Failed to save response cache");
    }
}
