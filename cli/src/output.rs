use colored::*;
use curio_core::{ConversationStore, CurioConfig, Role, SearchResult};
use lazy_static::lazy_static;
use pulldown_cmark::{
    CodeBlockKind, Event as MdEvent, HeadingLevel, Options, Parser as MdParser, Tag,
};
use regex::Regex;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

lazy_static! {
    static ref IFRAME_RE: Regex =
        Regex::new(r#"<iframe[^>]*?\ssrc="([^"]+)"[^>]*>(?:\s*</iframe>)?"#)
            .expect("iframe regex is valid");
    static ref IFRAME_CLOSE_RE: Regex = Regex::new(r"</iframe>").expect("iframe close regex is valid");
}

/// Print an assistant message to the terminal
pub fn print_assistant_response(response: &str) {
    let rendered_response = render_markdown(response);
    println!("{}: {}", "Curio".blue().bold(), rendered_response.trim_end());
}

/// Print the numbered sources behind the last answer
pub fn print_sources(results: &[SearchResult]) {
    if results.is_empty() {
        return;
    }

    println!("{}", "Sources:".cyan().bold());
    for (i, result) in results.iter().enumerate() {
        println!(
            "  [{}] {} {}",
            i + 1,
            result.display_title(),
            result.url.dimmed()
        );
    }
}

/// Print the whole conversation so far
pub fn print_history(history: &ConversationStore) {
    for message in history.iter() {
        match message.role {
            Role::User => println!("{}: {}", "You".green().bold(), message.content),
            Role::Assistant => print_assistant_response(&message.content),
            Role::System => {}
        }
        println!();
    }
}

/// Shown when a turn is stopped because no API key is set
pub fn print_credential_prompt(prompt: &str) {
    println!("{} {}", "ℹ".yellow().bold(), prompt.yellow());
}

pub fn print_failed_reply(reply: &str) {
    println!("{}: {}", "Curio".blue().bold(), reply.red());
}

pub fn print_config(config: &CurioConfig) {
    let key_state = if config.api_key().is_some() {
        "set".green()
    } else {
        "missing".red()
    };
    println!("{}", "Configuration:".cyan().bold());
    println!("  API key:         {}", key_state);
    println!("  Model:           {}", config.model);
    println!("  Temperature:     {:.1}", config.temperature);
    println!("  Search recency:  {}", config.search_recency);
    println!("  Citation links:  {}", config.link_citations);
}

/// Show usage instructions when no prompt or action is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "curio \"photosynthesis, grade 7\"".green().bold());
    println!("    Ask for learning resources once");
    println!();
    println!("  {}", "curio -i".green().bold());
    println!("    Start an interactive tutoring session");
    println!();
    println!("{}", "Options:".cyan());
    println!("  -m, --model <MODEL>        sonar or sonar-pro");
    println!("  -t, --temperature <TEMP>   0.0 (focused) to 1.0 (creative)");
    println!("  -r, --recency <WINDOW>     day, week, month or year");
    println!("  -k, --api-key <KEY>        Perplexity API key (or PERPLEXITY_API_KEY)");
    println!("  --citations                Link [n] markers to their sources");
    println!("  --help                     Show this help message");
    println!();
}

pub fn print_interactive_help() {
    println!("{}", "Commands:".cyan().bold());
    println!("  /reset               Start the conversation over");
    println!("  /history             Show the conversation so far");
    println!("  /model <name>        Switch between sonar and sonar-pro");
    println!("  /temperature <t>     Set the temperature (0.0-1.0)");
    println!("  /recency <window>    any, day, week, month or year");
    println!("  /key                 Enter your API key");
    println!("  /config              Show the current settings");
    println!("  exit, quit           Leave the session");
}

/// Terminal stand-in for an HTML fragment of a reply: embedded players
/// become a `▶ <url>` line, any other markup passes through
fn describe_html(html: &str) -> String {
    let shown = IFRAME_RE.replace_all(html, |caps: &regex::Captures| {
        format!("{} {}", "▶".red().bold(), caps[1].underline())
    });
    IFRAME_CLOSE_RE.replace_all(&shown, "").into_owned()
}

/// Render markdown in the terminal with syntax highlighting
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = MdParser::new_ext(markdown, options);

    let syntax_set = SyntaxSet::load_defaults_newlines();
    let theme_set = ThemeSet::load_defaults();
    let theme = theme_set
        .themes
        .get("base16-ocean.dark")
        .or_else(|| theme_set.themes.values().next());

    let mut in_code_block = false;
    let mut code_block_lang = String::new();
    let mut code_block_content = String::new();
    let mut output = String::new();

    // Table state tracking
    let mut in_table_cell = false;
    let mut current_row: Vec<String> = Vec::new();
    let mut table_rows: Vec<Vec<String>> = Vec::new();

    for event in parser {
        match event {
            MdEvent::Start(Tag::Table(_)) => {
                table_rows.clear();
                output.push('\n');
            }
            MdEvent::End(Tag::Table(_)) => {
                output.push_str(&render_table(&table_rows));
                table_rows.clear();
            }
            MdEvent::Start(Tag::TableRow) | MdEvent::Start(Tag::TableHead) => {
                current_row.clear();
            }
            MdEvent::End(Tag::TableRow) | MdEvent::End(Tag::TableHead) => {
                if !current_row.is_empty() {
                    table_rows.push(std::mem::take(&mut current_row));
                }
            }
            MdEvent::Start(Tag::TableCell) => {
                in_table_cell = true;
                current_row.push(String::new());
            }
            MdEvent::End(Tag::TableCell) => {
                in_table_cell = false;
            }
            MdEvent::Start(Tag::Heading(level, ..)) => match level {
                HeadingLevel::H1 | HeadingLevel::H2 => {
                    output.push_str(&format!("\n{} ", "#".bright_cyan().bold()))
                }
                _ => output.push('\n'),
            },
            MdEvent::End(Tag::Heading(..)) => {
                output.push('\n');
            }
            MdEvent::Start(Tag::Paragraph) => {
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push_str("\n\n");
                }
            }
            MdEvent::End(Tag::Paragraph) => {
                output.push('\n');
            }
            MdEvent::Start(Tag::CodeBlock(info)) => {
                in_code_block = true;
                code_block_lang = match info {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    _ => String::new(),
                };
                code_block_content.clear();
                output.push('\n');
            }
            MdEvent::End(Tag::CodeBlock(_)) => {
                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push('\n');
                match theme {
                    Some(theme) => {
                        let syntax = syntax_set
                            .find_syntax_by_token(&code_block_lang)
                            .unwrap_or_else(|| syntax_set.find_syntax_plain_text());
                        let mut highlighter = HighlightLines::new(syntax, theme);
                        for line in LinesWithEndings::from(&code_block_content) {
                            let highlighted = highlighter
                                .highlight_line(line, &syntax_set)
                                .unwrap_or_default();
                            output.push_str(&as_24_bit_terminal_escaped(&highlighted, false));
                        }
                    }
                    None => output.push_str(&code_block_content),
                }
                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push_str("\n\n");
                in_code_block = false;
            }
            MdEvent::Start(Tag::List(_)) | MdEvent::End(Tag::List(_)) => {
                output.push('\n');
            }
            MdEvent::Start(Tag::Item) => {
                output.push_str(&format!("{}  ", "•".yellow()));
            }
            MdEvent::End(Tag::Item) => {
                if !output.ends_with('\n') {
                    output.push('\n');
                }
            }
            MdEvent::Start(Tag::Link(..)) => {
                if !in_table_cell {
                    output.push('[');
                }
            }
            MdEvent::End(Tag::Link(_, dest, _)) => {
                if !in_table_cell {
                    output.push_str(&format!("] {}", dest.dimmed()));
                }
            }
            MdEvent::Code(ref code) => {
                if in_table_cell && !current_row.is_empty() {
                    let idx = current_row.len() - 1;
                    current_row[idx].push_str(&format!("`{}`", code));
                } else {
                    output.push_str(&format!("{}", code.on_bright_black().white()));
                }
            }
            MdEvent::Text(ref text) => {
                if in_code_block {
                    code_block_content.push_str(text);
                } else if in_table_cell && !current_row.is_empty() {
                    let idx = current_row.len() - 1;
                    current_row[idx].push_str(text);
                } else {
                    output.push_str(text);
                }
            }
            MdEvent::Html(ref html) => {
                let shown = describe_html(html);
                if !shown.trim().is_empty() {
                    if !output.is_empty() && !output.ends_with('\n') {
                        output.push('\n');
                    }
                    output.push_str(&shown);
                }
            }
            MdEvent::SoftBreak => {
                if !in_table_cell {
                    output.push(' ');
                }
            }
            MdEvent::HardBreak => {
                if !in_table_cell {
                    output.push('\n');
                }
            }
            MdEvent::Rule => {
                output.push_str(&format!("\n{}\n", "─".repeat(40).dimmed()));
            }
            _ => {}
        }
    }

    output
}

fn render_table(rows: &[Vec<String>]) -> String {
    let mut output = String::new();
    let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    if col_count == 0 {
        return output;
    }

    let mut col_widths = vec![0; col_count];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            col_widths[i] = col_widths[i].max(cell.chars().count());
        }
    }

    for (i, row) in rows.iter().enumerate() {
        for (j, cell) in row.iter().enumerate() {
            let padding = col_widths[j].saturating_sub(cell.chars().count());
            if i == 0 {
                output.push_str(&format!("{}{} ", cell.bold(), " ".repeat(padding)));
            } else {
                output.push_str(&format!("{}{} ", cell, " ".repeat(padding)));
            }
        }
        output.push('\n');

        // Separator line after the header
        if i == 0 {
            let separator: Vec<String> = col_widths
                .iter()
                .map(|width| "─".repeat(*width).dimmed().to_string())
                .collect();
            output.push_str(&separator.join(" "));
            output.push('\n');
        }
    }
    output.push('\n');
    output
}
