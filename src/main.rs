//! `sephora-scraper` command-line driver
//!
//! Wires configuration, logging and the proxy transport into the library and
//! prints every report as pretty JSON on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sephora_scraper::crawling::{BatchCoordinator, PageFetcher, scrape_variants_with};
use sephora_scraper::infrastructure::{
    AppConfig, ProductExtractor, ProxyFetcher, clamp_concurrency, init_logging_with_config,
};

#[derive(Parser, Debug)]
#[command(name = "sephora-scraper", version, about = "Scrape Sephora product pages through a rendering proxy")]
struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape a single product page
    Scrape { url: String },

    /// Scrape many product pages concurrently
    Batch {
        /// Concurrent fetches, clamped into 1..=10 (defaults to the configured value)
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// File with one URL per line; blank lines and `#` comments are ignored
        #[arg(long)]
        input: Option<PathBuf>,

        /// Stop starting new fetches after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,

        urls: Vec<String>,
    },

    /// List the color/size variants of a product page
    Variants { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.json_logs {
        config.logging.json_format = true;
    }
    init_logging_with_config(&config.logging)?;

    let extractor = Arc::new(
        ProductExtractor::with_selectors(&config.selectors).context("Invalid extraction selectors")?,
    );
    let fetcher: Arc<dyn PageFetcher> = Arc::new(ProxyFetcher::new(&config.proxy)?);

    match cli.command {
        Command::Scrape { url } => {
            let coordinator = BatchCoordinator::with_extractor(fetcher, extractor);
            let record = coordinator.scrape_one(&url).await?;
            print_json(&record)
        }
        Command::Batch {
            concurrency,
            input,
            deadline_secs,
            urls,
        } => {
            let mut urls = urls;
            if let Some(path) = input {
                urls.extend(read_url_file(&path).await?);
            }
            if urls.is_empty() {
                bail!("No URLs given; pass them as arguments or with --input");
            }

            let concurrency = concurrency.map_or_else(|| config.batch.effective_concurrency(), clamp_concurrency);
            let cancel = CancellationToken::new();
            spawn_cancel_watcher(cancel.clone(), deadline_secs.or(config.batch.deadline_seconds));

            let coordinator = BatchCoordinator::with_extractor(fetcher, extractor);
            let report = coordinator
                .run_batch_with_cancellation(&urls, concurrency, cancel)
                .await?;
            print_json(&report)
        }
        Command::Variants { url } => {
            let report = scrape_variants_with(fetcher.as_ref(), &extractor, &url)
                .await
                .with_context(|| format!("Failed to fetch {url}"))?;
            print_json(&report)
        }
    }
}

/// Cancel on Ctrl-C, or when the optional deadline passes
fn spawn_cancel_watcher(cancel: CancellationToken, deadline_secs: Option<u64>) {
    tokio::spawn(async move {
        let deadline = async {
            match deadline_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                    return;
                }
                info!("Ctrl-C received, cancelling remaining batch items");
            }
            () = deadline => {
                info!("Batch deadline reached, cancelling remaining batch items");
            }
            () = cancel.cancelled() => return,
        }
        cancel.cancel();
    });
}

async fn read_url_file(path: &std::path::Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}
