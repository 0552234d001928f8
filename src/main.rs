use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use airtime::config::{Config, ConfigProvider, ENV_CONFIG_PATH};
use airtime::scheduler::RunKind;

mod commands;

use commands::BuildParams;

#[derive(Parser)]
#[command(
    name = "airtime",
    version,
    about = "Content rotation and candidate scoring for broadcast schedules",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = ENV_CONFIG_PATH, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides [logging].format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill the gaps of one or more schedules
    Build {
        /// Gap files (JSON arrays of gaps); each file is an independent run
        #[arg(required = true)]
        gaps: Vec<PathBuf>,

        /// Run kind (daily, weekly, monthly)
        #[arg(short, long, default_value = "daily")]
        kind: RunKind,

        /// Seed for reproducible jitter and daypart rolls
        #[arg(short, long)]
        seed: Option<u64>,

        /// Write the schedule reports to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage the asset catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Import assets from a JSON file
    Import {
        /// JSON array of assets with optional scheduling metadata
        input: PathBuf,
    },

    /// Show catalog statistics
    Stats,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let provider = ConfigProvider::from_file(&cli.config).with_env_overrides(true);
    let config = provider
        .load()
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    config.validate().context("Invalid configuration")?;

    // Initialize tracing/logging
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config, cli.verbose)?;

    // Warnings raised while loading were emitted before the subscriber existed
    for warning in provider.warnings() {
        tracing::warn!(key = %warning.key, reason = %warning.reason, "Config value ignored");
    }

    tracing::info!(source = %provider.source(), "airtime starting");

    match cli.command {
        Commands::Build {
            gaps,
            kind,
            seed,
            output,
        } => {
            tracing::info!(
                runs = gaps.len(),
                kind = %kind,
                seed = ?seed,
                output = ?output,
                "Starting build command"
            );
            commands::build(
                config,
                BuildParams {
                    gap_files: gaps,
                    kind,
                    seed,
                    output,
                },
            )
            .await?;
        }

        Commands::Catalog { action } => match action {
            CatalogAction::Import { input } => {
                tracing::info!(input = %input.display(), "Starting catalog import");
                commands::import(&config, &input).await?;
            }
            CatalogAction::Stats => commands::stats(&config)?,
        },

        Commands::Config { action } => match action {
            ConfigAction::Show => commands::show(&config, &provider.warnings())?,
        },
    }

    tracing::info!("airtime completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, config: &Config, verbose: bool) -> Result<()> {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("airtime={level},warn")))
        .context("Invalid log filter")?;

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
