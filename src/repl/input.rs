//! Line input for the chat REPL
//!
//! A line ending in `\` continues on the next prompt, so long questions
//! can be pasted over several lines.

use anyhow::{Context, Result};
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::History;
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// What the user did at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    /// Ctrl-C: abandon the current line
    Interrupted,
    /// Ctrl-D: leave the REPL
    Eof,
}

const PROMPT: &str = "longevity> ";
const CONTINUATION_PROMPT: &str = "       ... ";
const MAX_HISTORY: usize = 500;

pub struct InputHandler {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
}

impl InputHandler {
    pub fn new() -> Result<Self> {
        let mut editor = DefaultEditor::new()?;
        editor.set_max_history_size(MAX_HISTORY)?;
        editor.set_auto_add_history(false);

        Ok(InputHandler {
            editor,
            history_path: None,
        })
    }

    /// Input handler that restores and later saves history at `history_file`
    pub fn with_history(history_file: PathBuf) -> Result<Self> {
        let mut handler = Self::new()?;
        if history_file.exists() {
            // A corrupt history file should not block the REPL
            let _ = handler.editor.load_history(&history_file);
        }
        handler.history_path = Some(history_file);
        Ok(handler)
    }

    /// Read one question, joining `\`-continued lines with spaces
    pub fn read_line(&mut self) -> Result<InputEvent> {
        let mut parts: Vec<String> = Vec::new();

        loop {
            let prompt = if parts.is_empty() { PROMPT } else { CONTINUATION_PROMPT };
            match self.editor.readline(prompt) {
                Ok(line) => match line.trim_end().strip_suffix('\\') {
                    Some(head) => parts.push(head.trim().to_string()),
                    None => {
                        parts.push(line.trim().to_string());
                        break;
                    }
                },
                Err(ReadlineError::Interrupted) => return Ok(InputEvent::Interrupted),
                Err(ReadlineError::Eof) if parts.is_empty() => return Ok(InputEvent::Eof),
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(anyhow::anyhow!("Readline error: {}", err)),
            }
        }

        let input = join_parts(&parts);
        if !input.is_empty() {
            let _ = self.editor.add_history_entry(input.as_str());
        }
        Ok(InputEvent::Line(input))
    }

    /// Write history, creating its directory if needed
    pub fn save_history(&mut self) -> Result<()> {
        let Some(path) = &self.history_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        self.editor.save_history(path)?;
        Ok(())
    }

    pub fn history_len(&self) -> usize {
        self.editor.history().len()
    }
}

fn join_parts(parts: &[String]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_join_continued_lines() {
        let parts = vec![
            "Does rapamycin".to_string(),
            String::new(),
            "extend lifespan?".to_string(),
        ];
        assert_eq!(join_parts(&parts), "Does rapamycin extend lifespan?");
        assert_eq!(join_parts(&[]), "");
    }

    #[test]
    fn test_history_saved_into_new_directory() {
        let temp_dir = TempDir::new().unwrap();
        let history_path = temp_dir.path().join("nested").join("history");

        {
            let mut handler = InputHandler::with_history(history_path.clone()).unwrap();
            let _ = handler.editor.add_history_entry("What is zone 2 training?");
            let _ = handler.editor.add_history_entry("/sources");
            handler.save_history().unwrap();
        }
        assert!(history_path.exists());

        let handler = InputHandler::with_history(history_path).unwrap();
        assert_eq!(handler.history_len(), 2);
    }

    #[test]
    fn test_without_history_file() {
        let mut handler = InputHandler::new().unwrap();
        assert!(handler.history_path.is_none());
        assert!(handler.save_history().is_ok());
        assert_eq!(handler.history_len(), 0);
    }
}
