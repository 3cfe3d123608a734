use anyhow::{Context, Result};
use colored::*;
use curio_core::prompts::GREETING;
use curio_core::{ChatBackend, CurioConfig, Session, TurnOrchestrator, TurnOutcome};
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::commands::{parse_command, Command};
use crate::output::{
    print_assistant_response, print_config, print_credential_prompt, print_failed_reply,
    print_history, print_interactive_help, print_sources,
};

const PREVIEW_WIDTH: usize = 72;

/// Single line shown next to the spinner while a reply streams in:
/// the last characters received followed by a cursor block
pub fn stream_preview(content: &str, width: usize) -> String {
    let flattened: String = content
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let chars: Vec<char> = flattened.trim_end().chars().collect();
    let start = chars.len().saturating_sub(width);
    let tail: String = chars[start..].iter().collect();
    format!("{}▌", tail)
}

fn new_spinner() -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner} {msg}")
            .context("Invalid spinner template")?,
    );
    spinner.set_message("Searching for resources...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

/// Runs one turn with a live preview and prints whatever came of it
async fn run_turn<B: ChatBackend>(
    session: &mut Session,
    orchestrator: &TurnOrchestrator<B>,
    text: &str,
) -> Result<TurnOutcome> {
    let spinner = new_spinner()?;
    let mut observer = |content: &str| spinner.set_message(stream_preview(content, PREVIEW_WIDTH));

    debug!("Submitting turn {}", session.history.user_turns() + 1);
    let outcome = session.submit(orchestrator, text, Some(&mut observer)).await;
    spinner.finish_and_clear();

    match &outcome {
        TurnOutcome::Answered { reply, metadata } => {
            print_assistant_response(reply);
            print_sources(metadata.results());
            if let Some(tokens) = metadata.total_tokens() {
                debug!("Turn used {} tokens", tokens);
            }
        }
        TurnOutcome::Failed { reply, error } => {
            warn!("Turn failed: {}", error);
            print_failed_reply(reply);
        }
        TurnOutcome::MissingCredential { prompt, error } => {
            debug!("{}", error);
            print_credential_prompt(prompt);
        }
    }

    Ok(outcome)
}

/// Asks for the API key without echoing it. A blank answer leaves the key unchanged.
fn prompt_api_key(config: &mut CurioConfig) -> Result<bool> {
    let key = Password::new()
        .with_prompt("Perplexity API key")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read API key")?;

    let key = key.trim();
    if key.is_empty() {
        return Ok(false);
    }
    config.api_key = Some(key.to_string());
    info!("API key updated for this session");
    Ok(true)
}

/// Answers one prompt and exits
pub async fn run_single_query<B: ChatBackend>(
    prompt: String,
    config: CurioConfig,
    orchestrator: &TurnOrchestrator<B>,
) -> Result<()> {
    info!("Running single query: {}", prompt);
    let mut session = Session::new(config);
    run_turn(&mut session, orchestrator, &prompt).await?;
    Ok(())
}

/// Interactive tutoring session on stdin/stdout.
///
/// When `config_path` is given, `/key` also stores the new key there. Nothing else
/// from the session (flags, `/model` and friends) is written back.
pub async fn run_interactive_chat<B: ChatBackend>(
    config: CurioConfig,
    orchestrator: &TurnOrchestrator<B>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut session = Session::new(config);

    print_assistant_response(GREETING);
    println!(
        "{}",
        "Type /help for commands, 'exit' or 'quit' to end the session.".dimmed()
    );
    println!();

    loop {
        print!("{}: ", "You".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;
        if read == 0 {
            // EOF
            println!();
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let command = match parse_command(input) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message.red());
                continue;
            }
        };

        match command {
            Command::Exit => {
                println!("Happy learning!");
                break;
            }
            Command::Ask(text) => {
                let outcome = run_turn(&mut session, orchestrator, &text).await?;
                if matches!(outcome, TurnOutcome::MissingCredential { .. })
                    && prompt_api_key(&mut session.config)?
                {
                    println!("{}", "Key saved. Ask again whenever you're ready.".green());
                    persist_api_key(&session.config, config_path);
                }
            }
            Command::Reset => {
                session.reset();
                println!("{}", "Conversation reset.".green());
                print_assistant_response(GREETING);
            }
            Command::History => print_history(&session.history),
            Command::Model(model) => {
                session.config.model = model;
                println!("Model set to {}", model.to_string().cyan());
            }
            Command::Temperature(temperature) => {
                match session.config.set_temperature(temperature) {
                    Ok(()) => println!("Temperature set to {:.1}", temperature),
                    Err(e) => println!("{}", e.to_string().red()),
                }
            }
            Command::Recency(recency) => {
                session.config.search_recency = recency;
                println!("Search recency set to {}", recency.to_string().cyan());
            }
            Command::Key => {
                if prompt_api_key(&mut session.config)? {
                    println!("{}", "Key saved.".green());
                    persist_api_key(&session.config, config_path);
                }
            }
            Command::Config => print_config(&session.config),
            Command::Help => print_interactive_help(),
        }

        println!();
    }

    Ok(())
}

fn persist_api_key(config: &CurioConfig, path: Option<&Path>) {
    let (Some(path), Some(key)) = (path, config.api_key()) else {
        return;
    };
    match CurioConfig::store_api_key(path, key) {
        Ok(()) => info!("Saved API key to {}", path.display()),
        Err(e) => warn!("Could not save API key to {}: {}", path.display(), e),
    }
}
