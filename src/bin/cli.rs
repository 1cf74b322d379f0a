//! Cosmic Birthday CLI
//!
//! Looks up the astronomy picture published on a birth date.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use clap::{Parser, Subcommand};
use cosmic_birthday::{
    error::{AppError, Result},
    models::Config,
    pipeline::{ReadingSlot, SearchOrchestrator, SearchPhase, SearchSnapshot, SearchTicket},
    services::{DateResolver, format_date, parse_date},
    storage::{HistoryStore, LocalStorage, MemoryStorage},
};

/// Cosmic Birthday - the universe on the day you were born
#[derive(Parser, Debug)]
#[command(
    name = "cosmic-birthday",
    version,
    about = "Find the NASA astronomy picture published on your birthday"
)]
struct Cli {
    /// Path to storage directory containing config.toml and history
    #[arg(short, long, default_value = "storage", global = true)]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Keep history in memory only for this run
    #[arg(long, global = true)]
    no_persist: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up the picture for a birth date (YYYY-MM-DD)
    Search {
        date: String,

        /// Skip the cosmic reading
        #[arg(long)]
        no_reading: bool,
    },

    /// Show recent searches
    History {
        /// Re-run the N-th entry (1 = most recent)
        #[arg(long)]
        replay: Option<usize>,
    },

    /// Show which archive date a birth date maps to
    Resolve { date: String },

    /// Validate configuration files
    Validate,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Load config.toml from the storage directory, then apply env overrides.
fn load_config(storage_dir: &Path, verbose: bool) -> Config {
    let config_path = storage_dir.join("config.toml");
    let loaded = if config_path.exists() {
        Some(Config::load(&config_path))
    } else {
        None
    };

    let mut config = match &loaded {
        Some(Ok(config)) => config.clone(),
        _ => Config::default(),
    };
    init_logging(verbose, &config.logging.level);

    match loaded {
        Some(Ok(_)) => log::debug!("Loaded configuration from {}", config_path.display()),
        Some(Err(e)) => log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            config_path.display(),
            e
        ),
        None => log::debug!("No config at {}, using defaults", config_path.display()),
    }

    config.apply_env();
    config
}

async fn open_session(config: &Config, cli: &Cli) -> Result<SearchOrchestrator> {
    let store: Arc<dyn HistoryStore> = if cli.no_persist {
        Arc::new(MemoryStorage::new())
    } else {
        Arc::new(LocalStorage::new(&cli.storage_dir))
    };
    SearchOrchestrator::from_config(config, store).await
}

fn print_record(snapshot: &SearchSnapshot) {
    let Some(record) = &snapshot.record else {
        return;
    };

    println!();
    println!("  {}", record.title);
    println!("  {}", "─".repeat(record.title.chars().count().max(20)));
    if let (Some(birth), Some(resolved)) = (&snapshot.birth_date, &snapshot.resolved_date) {
        if birth == resolved {
            println!("  Date:        {}", record.date);
        } else {
            println!("  Date:        {} (stand-in for {})", record.date, birth);
        }
    }
    println!("  Media:       {:?}", record.media_type);
    println!("  View:        {}", record.display_url());
    if record.preferred_url() != record.display_url() {
        println!("  Full size:   {}", record.preferred_url());
    }
    if let Some(copyright) = &record.copyright {
        println!("  Credit:      {}", copyright.trim());
    }
    println!();
    println!("  {}", record.explanation.trim());
}

fn print_reading(slot: &ReadingSlot) {
    if let Some(reading) = slot.reading() {
        println!();
        println!("  ✦ Star sign:           {}", reading.star_sign);
        println!("  ✦ Lucky constellation: {}", reading.lucky_feature);
        println!();
        println!("  {}", reading.message);
    }
}

/// Print the outcome of a search and wait for its reading.
async fn report(orchestrator: &SearchOrchestrator, ticket: Option<SearchTicket>) -> Result<()> {
    let Some(ticket) = ticket else {
        log::warn!("No date given");
        return Ok(());
    };

    let snapshot = orchestrator.snapshot();
    if ticket.phase == SearchPhase::Failed {
        let message = snapshot.error.unwrap_or_default();
        log::error!("Search failed: {}", message);
        return Err(ticket
            .into_error()
            .unwrap_or_else(|| AppError::provider(message)));
    }

    print_record(&snapshot);
    ticket.reading_settled().await;
    print_reading(&orchestrator.snapshot().reading);
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.storage_dir, cli.verbose);

    match &cli.command {
        Command::Search { date, no_reading } => {
            if *no_reading {
                config.reading.enabled = false;
            }
            let orchestrator = open_session(&config, &cli).await?;
            let ticket = orchestrator.search(date).await;
            report(&orchestrator, ticket).await?;
        }

        Command::History { replay } => {
            let orchestrator = open_session(&config, &cli).await?;
            let history = orchestrator.history();

            match replay {
                Some(position) => {
                    let entry = position
                        .checked_sub(1)
                        .and_then(|i| history.get(i))
                        .ok_or_else(|| {
                            AppError::validation(format!(
                                "No history entry #{} ({} stored)",
                                position,
                                history.len()
                            ))
                        })?;
                    log::info!("Replaying search for {}", entry.date);
                    let ticket = orchestrator.search_history_entry(&entry.id).await;
                    report(&orchestrator, ticket).await?;
                }
                None if history.is_empty() => println!("No searches yet."),
                None => {
                    for (i, entry) in history.iter().enumerate() {
                        println!("{:>2}. {}  {}", i + 1, entry.date, entry.title);
                    }
                }
            }
        }

        Command::Resolve { date } => {
            let birth = parse_date(date)?;
            let resolver = DateResolver::from_config(&config.resolver);
            let today = Local::now().date_naive();
            let resolved = resolver.resolve_on(birth, today);

            if DateResolver::is_covered(birth, today) {
                println!("{} is inside the archive", format_date(birth));
            } else {
                println!(
                    "{} is outside the archive, using {}",
                    format_date(birth),
                    format_date(resolved)
                );
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            if config.archive.credential().is_some() {
                log::info!("✓ NASA API key present");
            } else {
                log::warn!("✗ NASA API key missing: searches will fail");
            }
            if config.reading.credential().is_some() {
                log::info!("✓ Generative API key present");
            } else {
                log::warn!("✗ Generative API key missing: readings use the fallback");
            }
        }
    }

    Ok(())
}
