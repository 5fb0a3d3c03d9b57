//! Zero Scoring - composite quality scoring CLI for the Zero ecosystem.
//!
//! Scores instrument bundles read from JSON files and prints a ranked
//! breakdown.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use zero_common::config::{config_dir, Config};
use zero_common::config_loader::modular_file_status;
use zero_common::logging::{init_from_config, install_panic_hook};
use zero_common::ValidationError;
use zero_scoring::scoring::layer_table;
use zero_scoring::{
    load_bundles, ConfigError, EngineConfig, ReportFormat, ScoreReport, ScoringEngine,
};

/// Layered composite scoring for candidate selection.
#[derive(Parser, Debug)]
#[command(name = "zero-scoring")]
#[command(author = "theonlyhennygod")]
#[command(version)]
#[command(about = "Macro / structural / micro composite scoring", long_about = None)]
struct Cli {
    /// Config directory or file (defaults to ~/.codecoder)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score one or more bundle files and print a ranked report
    Score {
        /// Bundle files (a file may hold a single bundle or a JSON array)
        #[arg(required = true)]
        bundles: Vec<PathBuf>,

        /// Drop instruments below this overall confidence
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: ReportFormat,
    },

    /// Validate configuration and exit non-zero on errors
    ValidateConfig,

    /// Print the effective layer table
    Layers,
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) if p.is_dir() => Config::load_dir(p)?,
        Some(p) => Config::load_from(p)?,
        None => return Config::load_with_env(),
    };
    config.apply_env_overrides();
    Ok(config)
}

fn build_engine(config: &Config) -> Result<ScoringEngine> {
    config.validate().context("Invalid configuration")?;
    let engine_config =
        EngineConfig::from_config(config).context("Invalid scoring configuration")?;
    ScoringEngine::new(engine_config).context("Failed to build scoring engine")
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    init_from_config(&config.observability);
    install_panic_hook();

    tracing::info!("Zero Scoring v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Score {
            bundles,
            min_confidence,
            format,
        } => {
            let engine = build_engine(&config)?;
            let inputs = load_bundles(&bundles)?;
            let min_confidence = min_confidence.unwrap_or(engine.config().min_confidence);

            let batch = engine.evaluate_batch(&inputs);
            let report = ScoreReport::from_batch(&batch, min_confidence);
            println!("{}", report.generate(format));
        }
        Commands::ValidateConfig => {
            let dir = cli.config.unwrap_or_else(config_dir);
            if dir.is_dir() {
                for (file, found) in modular_file_status(&dir) {
                    println!("  {:<14} {}", file, if found { "found" } else { "missing" });
                }
            }
            build_engine(&config)?;
            println!("Configuration OK");
        }
        Commands::Layers => {
            let engine = build_engine(&config)?;
            print!("{}", layer_table(engine.config()));
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(exit_code(&err));
    }
}

/// sysexits-style code: 78 for configuration problems, otherwise the common error's code.
fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() || err.downcast_ref::<ValidationError>().is_some()
    {
        return 78;
    }
    err.downcast_ref::<zero_common::Error>()
        .map(zero_common::Error::exit_code)
        .unwrap_or(1)
}
