//! Command parsing for the TUI
//!
//! INPUT ROUTING:
//! - Input starting with "/" is a command, executed immediately
//! - Everything else is chat text sent to the active session
//!
//! EXIT HANDLING:
//! - /quit, /q, /exit work from any state
//! - Ctrl+C exits immediately (handled by the key loop)

/// Parsed command result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    None,
    Quit,            // /quit, /q, /exit
    New,             // /new: start a fresh session
    Sessions,        // /sessions: refresh and show the sidebar
    Open(String),    // /open <n|id>
    Delete(String),  // /delete <n|id>
    Attach(String),  // /attach <path>
    Detach(String),  // /detach <n|id>
    Preview,         // /preview: reopen the HTML preview
    Hide,            // /hide: dismiss the HTML preview
    Dismiss,         // /dismiss: clear notices
    Help,            // /help
    Unknown(String), // any other "/word"
    Chat(String),    // default
}

fn with_arg(arg: Option<&str>, make: fn(String) -> Command) -> Command {
    match arg.map(str::trim) {
        Some(arg) if !arg.is_empty() => make(arg.to_string()),
        _ => Command::None,
    }
}

/// Parse command input string into Command
///
/// # Examples
/// ```
/// use odinchat::ui::input::{parse_command, Command};
///
/// assert_eq!(parse_command("/quit"), Command::Quit);
/// assert_eq!(parse_command("/open 2"), Command::Open("2".to_string()));
/// assert!(matches!(parse_command("hello there"), Command::Chat(_)));
/// ```
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if input.is_empty() {
        return Command::None;
    }

    let Some(rest) = input.strip_prefix('/') else {
        return Command::Chat(input.to_string());
    };

    // "/" alone, or "/ word", is not a command
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        return Command::None;
    }

    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    match name {
        // Exit commands take no arguments
        "quit" | "q" | "exit" => match arg {
            None => Command::Quit,
            Some(_) => Command::None,
        },
        "new" | "n" => Command::New,
        "sessions" | "s" => Command::Sessions,
        "open" | "o" => with_arg(arg, Command::Open),
        "delete" | "del" => with_arg(arg, Command::Delete),
        "attach" | "a" => with_arg(arg, Command::Attach),
        "detach" => with_arg(arg, Command::Detach),
        "preview" => Command::Preview,
        "hide" => Command::Hide,
        "dismiss" => Command::Dismiss,
        "help" | "h" => Command::Help,
        other => Command::Unknown(other.to_string()),
    }
}

/// Render help text for the TUI
pub fn render_help() -> String {
    r#"odinchat: terminal chat client

INPUT:
    Type anything to chat (no "/" prefix needed)
    Sending with no session open starts a new one

KEYBOARD SHORTCUTS:
    Up/Down             Scroll transcript 1 line
    PageUp/PageDown     Scroll transcript 10 lines
    End                 Jump to latest
    Esc                 Clear input / close help
    Ctrl+C              Exit immediately

COMMANDS (start with "/"):
    /new                Start a new session
    /sessions           Refresh and show the session list
    /open <n|id>        Open session by list number or id
    /delete <n|id>      Delete a session
    /attach <path>      Upload a file for the next message
    /detach <n|id>      Remove a staged file
    /preview            Show the HTML preview again
    /hide               Hide the HTML preview
    /dismiss            Clear notices
    /help               Show this help
    /quit, /q, /exit    Quit
"#
    .to_string()
}
