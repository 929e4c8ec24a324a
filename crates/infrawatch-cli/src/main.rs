use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use infrawatch_core::{
    CachedNotificationEngine, Config, Exporter, FeedFormat, FeedResponse, NotificationEngine,
    NotificationFeed, ResourceSource, SnapshotSource, StoreSource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "infrawatch")]
#[command(version, about = "Renewal and expiry notifications for domains, certificates and servers", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "INFRAWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the notification feed
    Notifications {
        /// Output format [default: json, or the --output extension]
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        run: RunArgs,

        /// Skip the feed cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Print only the tier counts
    Summary {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Read rows from a JSON snapshot instead of the record store
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Pretend it is this instant (RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    now: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print where the config file lives
    Path,
    /// Write a default config file if there isn't one yet
    Init,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Markdown,
}

impl From<OutputFormat> for FeedFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => FeedFormat::Json,
            OutputFormat::Csv => FeedFormat::Csv,
            OutputFormat::Markdown => FeedFormat::Markdown,
        }
    }
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr, stdout is reserved for the payload
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "infrawatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };

    match cli.command {
        Commands::Notifications {
            format,
            output,
            run,
            no_cache,
        } => {
            let config = Config::load_from(&config_path)?;
            let feed = match fetch_feed(&config, &run, !no_cache).await? {
                Some(feed) => feed,
                None => return Ok(ExitCode::FAILURE),
            };

            match (output, format) {
                (Some(path), Some(format)) => {
                    Exporter::export_to_file_with_format(&feed, &path, format.into())?;
                    tracing::info!("Wrote {} notifications to {}", feed.summary.total, path.display());
                }
                (Some(path), None) => {
                    Exporter::export_to_file(&feed, &path)?;
                    tracing::info!("Wrote {} notifications to {}", feed.summary.total, path.display());
                }
                (None, format) => {
                    let format = format.unwrap_or(OutputFormat::Json);
                    println!("{}", Exporter::render(&feed, format.into())?);
                }
            }
        }
        Commands::Summary { run } => {
            let config = Config::load_from(&config_path)?;
            let feed = match fetch_feed(&config, &run, false).await? {
                Some(feed) => feed,
                None => return Ok(ExitCode::FAILURE),
            };
            println!("{}", serde_json::to_string_pretty(&feed.summary)?);
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = Config::load_from(&config_path)?;
                let rendered = toml::to_string_pretty(&redacted(config))
                    .context("Failed to render config")?;
                print!("{}", rendered);
            }
            ConfigAction::Path => println!("{}", config_path.display()),
            ConfigAction::Init => init_config(&config_path)?,
        },
    }

    Ok(ExitCode::SUCCESS)
}

/// Run the engine and hand back the feed.
///
/// A collection failure prints the error envelope and yields `None`; anything
/// that goes wrong before the engine runs (bad config, unreadable snapshot)
/// is a plain error.
async fn fetch_feed(
    config: &Config,
    run: &RunArgs,
    allow_cache: bool,
) -> anyhow::Result<Option<NotificationFeed>> {
    let result = match &run.snapshot {
        Some(path) => {
            tracing::info!("Reading snapshot {}", path.display());
            let source: Arc<dyn ResourceSource> = Arc::new(
                SnapshotSource::from_path(path)
                    .with_context(|| format!("Failed to load snapshot {}", path.display()))?,
            );
            run_engine(NotificationEngine::new(source), run.now).await
        }
        None => {
            let source: Arc<dyn ResourceSource> = Arc::new(StoreSource::from_config(&config.store)?);
            let engine = NotificationEngine::new(source);

            // A pinned clock is a what-if run, the cache only holds live feeds
            if allow_cache && run.now.is_none() {
                CachedNotificationEngine::from_config(engine, &config.cache)
                    .run()
                    .await
            } else {
                run_engine(engine, run.now).await
            }
        }
    };

    match FeedResponse::from(result) {
        FeedResponse::Feed(feed) => Ok(Some(feed)),
        failure => {
            println!("{}", failure.to_json_pretty()?);
            Ok(None)
        }
    }
}

async fn run_engine(
    engine: NotificationEngine,
    now: Option<DateTime<Utc>>,
) -> infrawatch_core::Result<NotificationFeed> {
    match now {
        Some(now) => engine.run_at(now).await,
        None => engine.run().await,
    }
}

fn init_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    Config::default().save_to(path)?;
    println!("Wrote default config to {}", path.display());
    println!("Set store.url (or INFRAWATCH_STORE__URL) before fetching notifications.");
    Ok(())
}

fn redacted(mut config: Config) -> Config {
    if config.store.api_key.is_some() {
        config.store.api_key = Some("********".to_string());
    }
    config
}
