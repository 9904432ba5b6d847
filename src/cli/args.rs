//! Command-line argument parsing
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Longevity RAG - evidence-grounded answers from a longevity research corpus
#[derive(Parser, Debug)]
#[command(name = "longevity-rag")]
#[command(version)]
#[command(about = "Ask questions about longevity research and get cited answers", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a single question
    Ask {
        /// The question to answer
        #[arg(value_name = "QUESTION", required = true, num_args = 1..)]
        question: Vec<String>,

        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive conversation
    Chat {
        /// Resume a saved session
        #[arg(long, value_name = "ID")]
        session: Option<Uuid>,
    },

    /// Load, chunk, embed and index a corpus file or directory
    Ingest {
        /// Corpus path (defaults to [corpus].path in the config)
        path: Option<PathBuf>,
    },

    /// Run health checks against the configured services
    Doctor,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Commands {
    /// Question text for `ask`, words joined with spaces
    pub fn question(&self) -> Option<String> {
        match self {
            Commands::Ask { question, .. } => Some(question.join(" ")),
            _ => None,
        }
    }
}

impl Verbosity {
    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show per-answer details such as latency
    pub fn show_details(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
