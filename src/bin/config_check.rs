//! # Tierhealth Configuration Check
//!
//! Command-line tool that loads the scoring configuration for an environment, validates it and
//! prints the effective result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tierhealth_core::config::ConfigManager;
use tierhealth_core::constants::Layer;
use tierhealth_core::logging::init_structured_logging;
use tracing::info;

#[derive(Parser)]
#[command(name = "tierhealth-config-check")]
#[command(about = "Validate tierhealth scoring configuration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to validate; defaults to TIERHEALTH_ENV / APP_ENV
    #[arg(short, long)]
    environment: Option<String>,

    /// Configuration directory (default: TIERHEALTH_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate and print the effective configuration as JSON
    Show,

    /// Summarize the factor catalog of every layer
    Factors,
}

fn main() -> Result<()> {
    init_structured_logging();
    let cli = Cli::parse();
    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigManager::detect_environment);

    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &environment)
        .with_context(|| format!("Configuration for '{environment}' is invalid"))?;
    info!(environment = %manager.environment(), "✅ Configuration valid");

    match cli.command.unwrap_or(Commands::Show) {
        Commands::Show => {
            println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
        }
        Commands::Factors => {
            for layer in Layer::ALL {
                let layer_config = manager.config().layers.get(layer);
                println!(
                    "{layer} (dynamic weighting: {})",
                    layer_config.dynamic_weighting
                );
                for factor in &layer_config.factors {
                    println!(
                        "  {:<40} {:>5.1}%  {:?}",
                        factor.id, factor.weight, factor.category
                    );
                }
            }
        }
    }
    Ok(())
}
