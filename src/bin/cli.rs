//! slotwatch CLI
//!
//! Local execution entry point. Meant to be invoked by an external scheduler
//! (cron, systemd timer, CI schedule); every invocation is one run.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand};
use slotwatch::{
    error::Result,
    models::{Config, LoggingConfig, Snapshot, any_free},
    pipeline::{self, Decision},
    services::{
        FilePageSource, HttpPageSource, NotificationFormatter, Notifier, PageSource,
        RecordExtractor, TelegramNotifier,
    },
    storage::{LocalStateStore, MemoryStateStore, StateStore},
};

/// slotwatch - appointment slot watcher
#[derive(Parser, Debug)]
#[command(
    name = "slotwatch",
    version,
    about = "Watches a booking page and alerts on new free slots"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "slotwatch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Write the log stream to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one check: fetch, detect changes, alert, persist
    Run {
        /// Read markup from a saved page instead of fetching it
        #[arg(long)]
        from_file: Option<PathBuf>,

        /// Do not send alerts or write state
        #[arg(long)]
        dry_run: bool,
    },

    /// Extract records from a saved page and print them
    Parse {
        /// Saved HTML page
        file: PathBuf,
    },

    /// Validate configuration
    Validate,

    /// Show the stored snapshot
    Info,
}

/// Initialize logging based on verbosity flag and configuration.
fn init_logging(verbose: bool, logging: &LoggingConfig, log_file: Option<&Path>) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_secs();

    let file_path = log_file
        .map(Path::to_path_buf)
        .or_else(|| logging.file.as_ref().map(PathBuf::from));
    if let Some(path) = file_path {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {}: {}", path.display(), e),
        }
    }

    builder.init();
}

/// Load the config file if present, then overlay the environment.
fn load_config(path: &Path) -> Result<(Config, bool)> {
    let from_file = path.exists();
    let mut config = if from_file {
        Config::load(path)?
    } else {
        Config::default()
    };
    config.apply_env()?;
    Ok((config, from_file))
}

#[cfg(feature = "s3")]
async fn open_store(config: &Config) -> Box<dyn StateStore> {
    match &config.state.s3 {
        Some(s3) => Box::new(slotwatch::storage::S3StateStore::from_config(s3).await),
        None => Box::new(LocalStateStore::new(&config.state.path)),
    }
}

#[cfg(not(feature = "s3"))]
async fn open_store(config: &Config) -> Box<dyn StateStore> {
    if config.state.s3.is_some() {
        log::warn!("state.s3 is set but the s3 feature is not enabled; using the local file");
    }
    Box::new(LocalStateStore::new(&config.state.path))
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, from_file) = load_config(&cli.config)?;
    init_logging(cli.verbose, &config.logging, cli.log_file.as_deref());

    if from_file {
        log::info!("Loaded configuration from {}", cli.config.display());
    } else {
        log::info!(
            "No config file at {}, using defaults and environment",
            cli.config.display()
        );
    }

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    match cli.command {
        Command::Run { from_file, dry_run } => {
            let source: Box<dyn PageSource> = match from_file {
                Some(path) => {
                    log::info!("Replaying saved page {}", path.display());
                    Box::new(FilePageSource::new(path))
                }
                None => Box::new(HttpPageSource::new(&config)?),
            };
            let store = open_store(&config).await;

            let outcome = if dry_run {
                log::info!("Dry run: no alerts, state is not written");
                let preview = MemoryStateStore::seeded(store.load().await?);
                pipeline::run_monitor(&config, source.as_ref(), &preview, None).await?
            } else {
                let telegram = TelegramNotifier::from_config(&config.telegram)?;
                if telegram.is_none() {
                    log::warn!("TELEGRAM_TOKEN or TELEGRAM_CHAT_ID not set; alerts are disabled");
                }
                let notifier = telegram.as_ref().map(|t| t as &dyn Notifier);
                pipeline::run_monitor(&config, source.as_ref(), store.as_ref(), notifier).await?
            };

            if let Some(report) = outcome {
                if dry_run && report.decision == Decision::Notify {
                    let formatter = NotificationFormatter::new(config.alert.clone());
                    println!(
                        "{}",
                        formatter.compose(&report.records, &config.target.url, Utc::now())
                    );
                }
            }
        }

        Command::Parse { file } => {
            let markup = std::fs::read_to_string(&file)?;
            let extractor = RecordExtractor::new(&config.extraction)?;
            let records = extractor.extract(&markup);

            for record in &records {
                println!("{:<12} {}", record.status, record.display_label());
            }
            println!("records: {}", records.len());
            println!("any free: {}", any_free(&records));

            let snapshot = Snapshot::encode(&records);
            println!("snapshot {}: {}", snapshot.fingerprint(), snapshot);
            println!();
            println!(
                "{}",
                NotificationFormatter::new(config.alert.clone()).format_lines(&records)
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            log::info!("✓ Target: {}", config.target.url);
            log::info!("✓ Extraction: {} card selector(s)", config.extraction.card_selectors.len());
            log::info!(
                "✓ Telegram: {}",
                if config.telegram.has_credentials() {
                    "configured"
                } else {
                    "not configured (alerts disabled)"
                }
            );
            log::info!(
                "✓ Policy: only_notify_when_free={}, fail_on_error={}",
                config.policy.only_notify_when_free,
                config.policy.fail_on_error
            );
            log::info!("All validations passed!");
        }

        Command::Info => {
            let store = open_store(&config).await;
            log::info!("State store: {}", store.location());

            match store.load().await? {
                Some(snapshot) => {
                    log::info!("Stored snapshot: {}", snapshot.fingerprint());
                    match snapshot.decode() {
                        Ok(records) => {
                            for record in &records {
                                log::info!("    {} {}", record.status, record.display_label());
                            }
                            log::info!("{} record(s)", records.len());
                        }
                        Err(e) => log::warn!("Stored state is not a record list: {}", e),
                    }
                }
                None => log::info!("No snapshot found yet."),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
