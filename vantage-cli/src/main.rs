//! Vantage CLI — runs the competitive intelligence pipeline from the
//! terminal and manages its research cache and sessions.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use vantage_core::pipeline::{ResearchStep, SynthesisStep, WorkflowController};
use vantage_core::providers::{MockProvider, OpenAiProvider, ResearchProvider, SynthesisProvider};
use vantage_core::session_store::InMemorySessionStore;
use vantage_core::{HeuristicParser, ResearchCache, export, load_config};

/// Vantage: AI competitive intelligence pipeline
#[derive(Parser, Debug)]
#[command(name = "vantage", version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the research and synthesis pipeline
    Run {
        /// Subjects to research (defaults to the configured list)
        #[arg(short, long)]
        subject: Vec<String>,

        /// Research focus applied across all subjects
        #[arg(short, long)]
        topic: Option<String>,

        /// Maximum cache entry age in days (1-365)
        #[arg(long)]
        max_age_days: Option<u32>,

        /// Source-count threshold below which an artifact is flagged
        #[arg(long)]
        min_sources: Option<usize>,

        /// Output format: markdown or json
        #[arg(long, default_value = "markdown")]
        format: String,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use the scripted mock provider instead of the live API
        #[arg(long)]
        mock: bool,
    },
    /// Inspect or clear the research cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum CacheAction {
    /// Show cached entries and their age
    Info,
    /// Remove cache entries, optionally for one subject
    Clear {
        /// Only remove entries for this subject
        #[arg(short, long)]
        subject: Option<String>,
    },
    /// Remove only expired entries
    Sweep,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let cache = Arc::new(ResearchCache::new(
        &config.research.cache_dir,
        config.research.max_age_days,
    ));

    match cli.command {
        Commands::Run {
            subject,
            topic,
            max_age_days,
            min_sources,
            format,
            output,
            mock,
        } => {
            let subjects = if subject.is_empty() {
                config.research.default_subjects.clone()
            } else {
                subject
            };
            let topic = topic.unwrap_or_else(|| config.research.research_focus.clone());
            let max_age_days = max_age_days.unwrap_or(config.research.max_age_days);
            let min_sources = min_sources.unwrap_or(config.research.min_sources);

            let (research_provider, synthesis_provider): (
                Arc<dyn ResearchProvider>,
                Arc<dyn SynthesisProvider>,
            ) = if mock {
                let provider = Arc::new(MockProvider::new());
                (provider.clone(), provider)
            } else {
                let provider = Arc::new(
                    OpenAiProvider::from_config(&config.llm)
                        .context("failed to initialize the model provider")?,
                );
                (provider.clone(), provider)
            };

            let parser = Arc::new(HeuristicParser);
            let controller = WorkflowController::new(
                ResearchStep::new(research_provider, parser.clone(), cache.clone()),
                SynthesisStep::new(synthesis_provider, parser),
                Arc::new(InMemorySessionStore::new()),
                cache,
            );

            let session_id = Uuid::new_v4().to_string();
            let handle = controller
                .start(&session_id, subjects, topic, max_age_days, min_sources)
                .context("invalid run parameters")?;
            eprintln!("{}", handle.message);

            let state = controller.run(&session_id).await?;
            if !state.error_messages.is_empty() {
                for error in &state.error_messages {
                    eprintln!("warning: {error}");
                }
            }

            let report = controller
                .report(&session_id)
                .context("the run did not produce a report")?;
            let rendered = match format.as_str() {
                "markdown" | "md" => export::to_markdown(&report),
                "json" => export::to_json(&report)?,
                other => anyhow::bail!("unknown format: {other} (expected markdown or json)"),
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Report written to {}", path.display());
                }
                None => println!("{rendered}"),
            }
        }
        Commands::Cache { action } => match action {
            CacheAction::Info => {
                let stats = cache.stats();
                println!(
                    "{} cached entries ({} expired)",
                    stats.total_cached, stats.expired_count
                );
                for entry in &stats.cache_entries {
                    println!(
                        "  {} / {} - cached {}, {} sources{}",
                        entry.competitor,
                        entry.research_focus,
                        entry.cached_at.format("%Y-%m-%d %H:%M UTC"),
                        entry.sources_count,
                        if entry.is_expired { " (expired)" } else { "" }
                    );
                }
            }
            CacheAction::Clear { subject } => {
                let removed = cache.evict(subject.as_deref());
                println!("Removed {removed} cache entries");
            }
            CacheAction::Sweep => {
                let removed = cache.sweep_expired();
                println!("Removed {removed} expired cache entries");
            }
        },
    }

    Ok(())
}
