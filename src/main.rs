use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use feedmill::config::Config;
use feedmill::feed::HttpFeedClient;
use feedmill::ingest::{Scheduler, SchedulerConfig};
use feedmill::storage::{Database, GatewayError};
use feedmill::util::validate_feed_url;

/// Get the default config file path (~/.config/feedmill/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("feedmill")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(name = "feedmill", about = "Polls RSS feeds on a schedule and stores new items")]
struct Args {
    /// Config file (default: ~/.config/feedmill/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database file, overrides the config file
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Maximum feeds fetched concurrently per cycle
    #[arg(long)]
    concurrency: Option<usize>,

    /// Seconds between cycle starts
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Register a feed URL and exit
    #[arg(long, value_name = "URL", requires = "name")]
    add_feed: Option<String>,

    /// Display name for --add-feed
    #[arg(long)]
    name: Option<String>,

    /// Print registered feeds and exit
    #[arg(long)]
    list_feeds: bool,

    /// Run a single ingestion cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    if let Some(database) = args.database.clone() {
        config.database_path = database;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(interval) = args.interval {
        config.interval_secs = interval;
    }
    config.validate().context("Invalid configuration")?;

    let db_path = config
        .database_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = Database::open(db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    if let Some(url) = &args.add_feed {
        let url = validate_feed_url(url, config.allow_private_hosts)?;
        let name = args.name.as_deref().unwrap_or(url.as_str());
        match db.insert_feed(url.as_str(), name).await {
            Ok(feed) => println!("Added feed {} ({}) as #{}", feed.name, feed.url, feed.id),
            Err(GatewayError::Conflict) => {
                eprintln!("Feed already registered: {}", url);
                std::process::exit(1);
            }
            Err(e) => return Err(e).context("Failed to add feed"),
        }
        return Ok(());
    }

    if args.list_feeds {
        let feeds = db.list_feeds().await.context("Failed to list feeds")?;
        if feeds.is_empty() {
            println!("No feeds registered. Add one with --add-feed URL --name NAME");
        }
        for feed in feeds {
            let last = feed
                .last_fetched_at
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            println!("#{:<5} {:<30} {} (last fetched: {})", feed.id, feed.name, feed.url, last);
        }
        return Ok(());
    }

    let source = HttpFeedClient::with_user_agent(&config.user_agent)
        .context("Failed to build HTTP client")?
        .timeout(config.fetch_timeout())
        .max_size(config.max_feed_size_bytes);
    let scheduler = Scheduler::new(
        Arc::new(db),
        Arc::new(source),
        SchedulerConfig::from_config(&config)?,
    );

    if args.once {
        let report = scheduler
            .run_cycle()
            .await
            .context("Failed to select due feeds")?;
        println!(
            "Fetched {} feeds ({} failed): {} new items, {} already stored, {} skipped",
            report.feeds, report.failed_feeds, report.inserted, report.duplicates, report.skipped
        );
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl-C, shutting down");
                shutdown.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    tracing::info!(
        database = %db_path,
        timeout_secs = config.fetch_timeout().as_secs(),
        "Starting ingestion"
    );
    scheduler.run(cancel).await;
    Ok(())
}
