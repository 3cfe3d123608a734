use curio_core::{Model, SearchRecency};

/// One line of interactive input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Anything that is not a slash command goes to the tutor
    Ask(String),
    Reset,
    History,
    Model(Model),
    Temperature(f32),
    Recency(SearchRecency),
    Key,
    Config,
    Help,
    Exit,
}

/// Parses a trimmed, non-empty input line
pub fn parse_command(input: &str) -> Result<Command, String> {
    if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
        return Ok(Command::Exit);
    }

    let Some(rest) = input.strip_prefix('/') else {
        return Ok(Command::Ask(input.to_string()));
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    match name.as_str() {
        "reset" => Ok(Command::Reset),
        "history" => Ok(Command::History),
        "key" => Ok(Command::Key),
        "config" => Ok(Command::Config),
        "help" => Ok(Command::Help),
        "exit" | "quit" => Ok(Command::Exit),
        "model" => arg
            .parse::<Model>()
            .map(Command::Model)
            .map_err(|e| e.to_string()),
        "temperature" | "temp" => arg
            .parse::<f32>()
            .map(Command::Temperature)
            .map_err(|_| format!("Invalid temperature '{}', expected a number between 0.0 and 1.0", arg)),
        "recency" => arg
            .parse::<SearchRecency>()
            .map(Command::Recency)
            .map_err(|e| e.to_string()),
        other => Err(format!("Unknown command '/{}'. Type /help for a list.", other)),
    }
}
