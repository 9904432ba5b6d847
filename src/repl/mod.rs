//! Interactive chat loop
//!
//! Reads questions with rustyline, answers them through the orchestrator
//! and keeps the conversation in a `ConversationSession` that is saved on
//! `/save` and on exit.

pub mod commands;
pub mod display;
pub mod input;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::rag::RagOrchestrator;
use crate::repl::commands::{is_command, Command};
pub use crate::repl::display::DisplayManager;
use crate::repl::input::{InputEvent, InputHandler};
use crate::session::{ConversationSession, SessionStore};
use crate::types::GeneratedAnswer;

/// REPL session coordinator
pub struct ReplSession {
    input_handler: InputHandler,
    display_manager: DisplayManager,
    orchestrator: Arc<RagOrchestrator>,
    session: ConversationSession,
    store: Option<SessionStore>,
    last_answer: Option<GeneratedAnswer>,
}

impl ReplSession {
    pub fn new(
        orchestrator: Arc<RagOrchestrator>,
        session: ConversationSession,
        store: Option<SessionStore>,
        display_manager: DisplayManager,
        history_file: Option<PathBuf>,
    ) -> Result<Self> {
        let input_handler = match history_file {
            Some(path) => InputHandler::with_history(path)?,
            None => InputHandler::new()?,
        };

        Ok(ReplSession {
            input_handler,
            display_manager,
            orchestrator,
            session,
            store,
            last_answer: None,
        })
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// Run until `/exit` or Ctrl-D
    pub async fn run(&mut self, version: &str, model: &str) -> Result<()> {
        self.display_manager
            .show_banner(version, model, &self.session.id.to_string(), self.session.len());

        loop {
            match self.input_handler.read_line()? {
                InputEvent::Line(line) => {
                    if !self.handle_input(&line).await? {
                        break;
                    }
                }
                InputEvent::Interrupted => {
                    self.display_manager.show_info("(Ctrl-D or /exit to quit)");
                }
                InputEvent::Eof => break,
            }
        }

        self.shutdown()
    }

    /// Handle one line; returns false when the loop should stop
    pub async fn handle_input(&mut self, input: &str) -> Result<bool> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(true);
        }

        if is_command(input) {
            return self.execute(commands::parse(input));
        }

        self.ask(input).await;
        Ok(true)
    }

    async fn ask(&mut self, question: &str) {
        let spinner = self.display_manager.start_spinner("Searching the research...");
        let result = self.orchestrator.answer(question, Some(&mut self.session)).await;
        spinner.finish_and_clear();

        match result {
            Ok(answer) => {
                self.display_manager.show_answer(&answer);
                self.last_answer = Some(answer);
            }
            Err(e) => self.display_manager.show_error(&e),
        }
    }

    fn execute(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Help => println!("{}", commands::help_text()),
            Command::History { limit } => {
                let turns: Vec<_> = self.session.turns().cloned().collect();
                println!("{}", display::format_history(&turns, limit.unwrap_or(10)));
            }
            Command::Sources => match &self.last_answer {
                Some(answer) => self.display_manager.show_sources(&answer.sources),
                None => self.display_manager.show_info("No answer yet."),
            },
            Command::Clear => {
                self.session.clear();
                self.last_answer = None;
                self.display_manager.show_info("Conversation cleared.");
            }
            Command::Save => match self.save()? {
                Some(path) => self
                    .display_manager
                    .show_info(&format!("Session saved to {}", path.display())),
                None => self.display_manager.show_warning("Session storage is not available"),
            },
            Command::Exit => return Ok(false),
            Command::Unknown { input } => {
                self.display_manager
                    .show_warning(&format!("Unknown command: {} (try /help)", input));
            }
        }
        Ok(true)
    }

    fn save(&self) -> Result<Option<PathBuf>> {
        match &self.store {
            Some(store) => {
                let path = store.save(&self.session).context("Failed to save session")?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    /// Persist session and input history
    fn shutdown(&mut self) -> Result<()> {
        if !self.session.is_empty() {
            if let Err(e) = self.save() {
                warn!(error = %e, "could not save session on exit");
            }
        }
        self.input_handler.save_history()?;
        println!("Goodbye! Resume with --session {}", self.session.id);
        Ok(())
    }
}
