//! Longevity RAG - CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use longevity_rag::{
    bootstrap::Components,
    cli::{config::IndexBackend, Args, Commands, Config},
    corpus,
    doctor::Doctor,
    repl::{display, DisplayManager, ReplSession},
    session::{ConversationSession, PersistenceConfig, SessionStore},
    telemetry,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    telemetry::init_logging(&config.logging, args.verbose, args.quiet)?;
    debug!(command = ?args.command, "starting");

    match &args.command {
        Commands::Ask { json, .. } => {
            let question = args.command.question().unwrap_or_default();
            run_ask(&args, &config, &question, *json).await?;
        }
        Commands::Chat { session } => {
            run_chat(&args, &config, *session).await?;
        }
        Commands::Ingest { path } => {
            let path = path.clone().or_else(|| config.corpus_path());
            run_ingest(&args, &config, path).await?;
        }
        Commands::Doctor => {
            run_doctor(&config).await?;
        }
        Commands::Config => {
            show_config(&args, &config)?;
        }
    }

    Ok(())
}

/// Connect services and fill the memory index if needed
async fn prepare(args: &Args, config: &Config) -> Result<Components> {
    let components = Components::from_config(config).await?;

    let spinner = DisplayManager::new(args.verbosity().show_progress(), false)
        .start_spinner("Loading corpus...");
    let preloaded = components.preload(config).await;
    spinner.finish_and_clear();

    match preloaded? {
        Some(report) => debug!(
            documents = report.documents,
            chunks = report.chunks,
            "memory index loaded"
        ),
        None if components.backend == IndexBackend::Memory => {
            warn!("memory index is empty; set [corpus].path or use the qdrant backend");
        }
        None => {}
    }

    Ok(components)
}

async fn run_ask(args: &Args, config: &Config, question: &str, json: bool) -> Result<()> {
    let verbosity = args.verbosity();
    let components = prepare(args, config).await?;
    let orchestrator = components.orchestrator(config);
    let display = DisplayManager::new(verbosity.show_progress() && !json, verbosity.show_details());

    let spinner = display.start_spinner("Searching the research...");
    let result = orchestrator.answer(question, None).await;
    spinner.finish_and_clear();

    match result {
        Ok(answer) if json => {
            println!("{}", serde_json::to_string_pretty(&answer)?);
            Ok(())
        }
        Ok(answer) => {
            println!("{}", display::format_answer(&answer, verbosity.show_details()));
            Ok(())
        }
        Err(e) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&e.to_json())?);
            } else {
                display.show_error(&e);
            }
            std::process::exit(1);
        }
    }
}

async fn run_chat(args: &Args, config: &Config, resume: Option<Uuid>) -> Result<()> {
    let verbosity = args.verbosity();
    let components = prepare(args, config).await?;
    let orchestrator = Arc::new(components.orchestrator(config));
    let max_turns = config.session.max_turns;

    let store = match SessionStore::new(PersistenceConfig {
        storage_dir: config.session_dir(),
        max_turns,
        ..PersistenceConfig::default()
    }) {
        Ok(store) => Some(store),
        Err(e) => {
            eprintln!("{}: sessions will not be saved ({})", "Warning".yellow(), e);
            None
        }
    };

    let session = match (resume, &store) {
        (Some(id), Some(store)) => store.load_or_create(&id)?,
        (Some(id), None) => ConversationSession::with_id(id, max_turns),
        (None, _) => ConversationSession::new(max_turns),
    };

    let history_file = dirs::home_dir().map(|home| home.join(".longevity-rag").join("history"));
    let display = DisplayManager::new(verbosity.show_progress(), verbosity.show_details());
    let mut repl = ReplSession::new(orchestrator, session, store, display, history_file)?;

    repl.run(VERSION, components.llm.model_name()).await
}

async fn run_ingest(args: &Args, config: &Config, path: Option<std::path::PathBuf>) -> Result<()> {
    let Some(path) = path else {
        anyhow::bail!("No corpus path given; pass one or set [corpus].path in the config");
    };

    let components = Components::from_config(config).await?;
    if components.backend == IndexBackend::Memory {
        eprintln!(
            "{}: the memory backend is not persisted; chat and ask reload [corpus].path on start",
            "Note".yellow()
        );
    }

    let documents = corpus::load_path(&path)?;
    let ingestor = components.ingestor(config)?;

    let pb = if args.verbosity().show_progress() {
        let pb = ProgressBar::new(documents.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} documents")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let report = ingestor
        .ingest_with_progress(&documents, |done, _total| pb.set_position(done as u64))
        .await;
    pb.finish_and_clear();
    let report = report?;

    println!(
        "{} Ingested {} documents into {} passages",
        "OK".green().bold(),
        report.documents,
        report.chunks
    );
    if report.failed > 0 {
        println!(
            "{} {} chunks could not be embedded",
            "Warning:".yellow().bold(),
            report.failed
        );
    }

    Ok(())
}

async fn run_doctor(config: &Config) -> Result<()> {
    let components = Components::from_config(config).await?;
    let doctor = Doctor::new(
        components.embedder.clone(),
        components.index.clone(),
        components.llm.clone(),
        config.session_dir(),
    );

    let checks = doctor.run_diagnostics().await;
    Doctor::display_results(&checks);

    std::process::exit(if Doctor::overall_status(&checks) { 0 } else { 1 });
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    println!("\n{}\n", "Longevity RAG Configuration".bold());
    match args.config.clone().or_else(Config::default_path) {
        Some(path) if path.exists() => println!("# Loaded from {}\n", path.display()),
        _ => println!("# Built-in defaults\n"),
    }
    println!("{}", config.to_toml()?);
    Ok(())
}
