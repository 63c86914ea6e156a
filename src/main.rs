//! CLI entry point for the weekly epidemiological series generator.
//!
//! Provides subcommands for a single site update, a periodic update loop,
//! and running the pipeline over local or remote documents.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use epi_weekly::analyzers::pipeline::PipelineOptions;
use epi_weekly::cache::FileStore;
use epi_weekly::config::Settings;
use epi_weekly::fetch::{BasicClient, fetch_text};
use epi_weekly::output::{print_json, write_json};
use epi_weekly::site::{prepare, update_site};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "epi_weekly")]
#[command(about = "Normalizes weekly case data and publishes per-country series", long_about = None)]
struct Cli {
    /// Country whose weeks form the time axis
    #[arg(long, global = true)]
    reference_country: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh source documents if stale and regenerate the site
    Update {
        /// Regenerate even when the cached documents are still fresh
        #[arg(short, long, default_value_t = false)]
        force: bool,

        /// Output directory (overrides PUBLIC_DIR)
        #[arg(short, long)]
        public_dir: Option<PathBuf>,
    },
    /// Regenerate the site now, then keep refreshing it periodically
    Watch {
        /// Hours between refreshes (overrides UPDATE_INTERVAL_HOURS)
        #[arg(short, long)]
        interval_hours: Option<u64>,

        /// Output directory (overrides PUBLIC_DIR)
        #[arg(short, long)]
        public_dir: Option<PathBuf>,
    },
    /// Run the pipeline over a primary document and print or save the result
    Prepare {
        /// Path to file or URL of the primary document
        #[arg(value_name = "FILE_OR_URL")]
        primary: String,

        /// Path to file or URL of the hospital/ICU occupancy document
        #[arg(short, long)]
        auxiliary: Option<String>,

        /// JSON file to write {weeks, series, summary} to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/epi_weekly.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("epi_weekly.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;
    if let Some(country) = cli.reference_country {
        settings.reference_country = country;
    }

    match cli.command {
        Commands::Update { force, public_dir } => {
            if let Some(dir) = public_dir {
                settings.public_dir = dir;
            }
            let store = FileStore::new(&settings.public_dir);
            let client = BasicClient::new()?;
            update_site(&settings, &store, &client, force).await?;
        }
        Commands::Watch {
            interval_hours,
            public_dir,
        } => {
            if let Some(dir) = public_dir {
                settings.public_dir = dir;
            }
            if let Some(hours) = interval_hours {
                settings.update_interval = Duration::from_secs(hours * 60 * 60);
            }
            watch(&settings).await?;
        }
        Commands::Prepare {
            primary,
            auxiliary,
            output,
        } => {
            let primary = fetcher(&primary).await?;
            let auxiliary = match auxiliary {
                Some(source) => Some(fetcher(&source).await?),
                None => None,
            };
            let options = PipelineOptions {
                reference_country: settings.reference_country.clone(),
            };
            let prepared = prepare(&primary, auxiliary.as_deref(), &options)?;

            match output {
                Some(path) => {
                    write_json(&path, &prepared)?;
                    info!(path = %path.display(), "Prepared data written");
                }
                None => print_json(&prepared)?,
            }
        }
    }

    Ok(())
}

/// Loads a document from a local file path or fetches it over HTTP.
#[tracing::instrument(skip_all, fields(source = %source))]
async fn fetcher(source: &str) -> Result<String> {
    let text = if source.starts_with("http") {
        let client = BasicClient::new()?;
        fetch_text(&client, source).await?
    } else {
        std::fs::read_to_string(source).with_context(|| format!("failed to read {source}"))?
    };
    Ok(text)
}

/// Forces an update, then refreshes every `update_interval`. Only the first
/// update is allowed to fail the process.
#[tracing::instrument(skip_all, fields(interval_secs = settings.update_interval.as_secs()))]
async fn watch(settings: &Settings) -> Result<()> {
    let store = FileStore::new(&settings.public_dir);
    let client = BasicClient::new()?;

    update_site(settings, &store, &client, true).await?;

    loop {
        info!(
            interval_secs = settings.update_interval.as_secs(),
            "Waiting before next update"
        );
        tokio::time::sleep(settings.update_interval).await;

        if let Err(e) = update_site(settings, &store, &client, false).await {
            error!(error = ?e, "Periodic update failed");
        }
    }
}
