use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use curio_core::{get_default_config_file, CurioConfig, PerplexityClient, TurnOrchestrator};
use dotenvy::dotenv;
use tracing::debug;

mod app;
mod cli;
mod commands;
mod logging;
mod output;

use crate::cli::Args;
use crate::logging::{init_logging, log_error};
use crate::output::print_usage_instructions;

const APP_NAME: &str = "curio";

/// Loads configuration, then answers one prompt or runs an interactive session
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads PERPLEXITY_API_KEY
    dotenv().ok();

    let args = Args::parse();

    let config_path = match args.config.clone() {
        Some(path) => path,
        None => get_default_config_file(APP_NAME)
            .context("Could not determine the configuration directory")?,
    };
    let file_config = CurioConfig::load_from_file(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    let config = file_config.merge(&args.overrides());
    config.validate().context("Invalid configuration")?;

    init_logging(config.log_level.as_deref(), args.verbose);
    debug!("Using configuration file {}", config_path.display());

    if args.save_config {
        config
            .save_to_file(&config_path)
            .with_context(|| format!("Failed to save configuration to {}", config_path.display()))?;
        println!("Saved configuration to {}", config_path.display());
    }

    let client = PerplexityClient::new(&config).context("Failed to create API client")?;
    let orchestrator = TurnOrchestrator::new(client);

    if args.interactive {
        if let Err(e) =
            crate::app::run_interactive_chat(config, &orchestrator, Some(&config_path)).await
        {
            log_error(&format!("Error in interactive chat: {}", e));
            eprintln!("{}", format!("Interactive chat failed: {}", e).red());
        }
    } else if let Some(prompt) = args.prompt.clone() {
        if let Err(e) = crate::app::run_single_query(prompt, config, &orchestrator).await {
            log_error(&format!("Error processing prompt: {}", e));
        }
    } else if !args.save_config {
        print_usage_instructions();
    }

    Ok(())
}
