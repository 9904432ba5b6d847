//! Built-in REPL commands

/// REPL command types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    History { limit: Option<usize> },
    Sources,
    Clear,
    Save,
    Exit,
    Unknown { input: String },
}

/// Check if input is a command (starts with /)
pub fn is_command(input: &str) -> bool {
    input.trim_start().starts_with('/')
}

/// Parse input string into a command
pub fn parse(input: &str) -> Command {
    let trimmed = input.trim();
    let unknown = || Command::Unknown {
        input: trimmed.to_string(),
    };

    let Some(body) = trimmed.strip_prefix('/') else {
        return unknown();
    };
    let parts: Vec<&str> = body.split_whitespace().collect();
    let Some(name) = parts.first() else {
        return unknown();
    };

    match name.to_lowercase().as_str() {
        "help" | "h" => Command::Help,
        "history" => Command::History {
            limit: parts.get(1).and_then(|s| s.parse().ok()),
        },
        "sources" | "src" => Command::Sources,
        "clear" | "reset" => Command::Clear,
        "save" => Command::Save,
        "exit" | "quit" | "q" => Command::Exit,
        _ => unknown(),
    }
}

/// Help text listing every command
pub fn help_text() -> &'static str {
    "Commands:
  /help            Show this help
  /history [n]     Show the last n turns (default 10)
  /sources         Show sources cited by the last answer
  /clear           Forget the conversation so far
  /save            Save the session to disk
  /exit            Save and quit

Anything else is answered as a question."
}
