use clap::Parser;
use curio_core::{ConfigOverrides, Model, SearchRecency};
use std::path::PathBuf;

/// Curio AI Tutor: free YouTube videos and PDFs for whatever you want to learn
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// What you want to learn, ideally with your grade or skill level
    #[arg(index = 1)] // Positional argument
    pub prompt: Option<String>,

    /// Enter interactive chat mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Model to use (sonar, sonar-pro)
    #[arg(short, long)]
    pub model: Option<Model>,

    /// Sampling temperature between 0.0 and 1.0
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Only use search results from the last day, week, month or year
    #[arg(short, long)]
    pub recency: Option<SearchRecency>,

    /// Perplexity API key
    #[arg(short = 'k', long, env = "PERPLEXITY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path to the config file (defaults to ~/.config/curio/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Turn [n] citation markers into links to the matching source
    #[arg(long, default_value_t = false)]
    pub citations: bool,

    /// Write the effective configuration back to the config file
    #[arg(long, default_value_t = false)]
    pub save_config: bool,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// The configuration values given on the command line
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_key: self.api_key.clone(),
            model: self.model,
            temperature: self.temperature,
            search_recency: self.recency,
            link_citations: self.citations.then_some(true),
            log_level: self.verbose.then(|| "debug".to_string()),
        }
    }
}
